use nuq_algebra::GeneralizedVector;
use nuq_core::OscParams;

#[test]
fn projectors_are_orthonormal() {
    for dim in 1..=4 {
        for k in 0..dim {
            let pk = GeneralizedVector::projector(dim, k).unwrap();
            assert_eq!(pk.trace(), 1.0);
            for l in 0..dim {
                let pl = GeneralizedVector::projector(dim, l).unwrap();
                let expected = if k == l { 1.0 } else { 0.0 };
                assert_eq!(pk.dot(&pl).unwrap(), expected);
            }
        }
    }
}

#[test]
fn rotated_projectors_resolve_identity() {
    let params = OscParams::standard(3);
    let mut sum = GeneralizedVector::zero(3).unwrap();
    for flv in 0..3 {
        let proj = GeneralizedVector::rotated_projector(3, flv, &params).unwrap();
        assert!((proj.trace() - 1.0).abs() < 1e-12);
        sum.add_scaled(1.0, &proj).unwrap();
    }
    // sum of flavor projectors is the identity
    for k in 0..3 {
        let pk = GeneralizedVector::projector(3, k).unwrap();
        assert!((sum.dot(&pk).unwrap() - 1.0).abs() < 1e-12);
    }
    assert!((sum.trace() - 3.0).abs() < 1e-12);
}

#[test]
fn two_flavor_survival_matches_analytic_formula() {
    let mut params = OscParams::zeroed(2);
    let theta = 0.55;
    let dm2 = 2.4e-3;
    params.set_angle(0, 1, theta).unwrap();
    params.set_splitting(1, dm2).unwrap();

    let energy = 1.0e9; // 1 GeV in eV
    let mut h0 = GeneralizedVector::zero(2).unwrap();
    let p1 = GeneralizedVector::projector(2, 1).unwrap();
    h0.add_scaled(dm2 * 0.5 / energy, &p1).unwrap();

    let pe = GeneralizedVector::rotated_projector(2, 0, &params).unwrap();
    let rho = pe.clone();

    let baseline = 2.0e12; // path length in 1/eV
    let evolved = pe.evolve(&h0, baseline).unwrap();
    let survival = evolved.dot(&rho).unwrap();

    let phase = dm2 * baseline / (4.0 * energy);
    let expected = 1.0 - (2.0 * theta).sin().powi(2) * phase.sin().powi(2);
    assert!(
        (survival - expected).abs() < 1e-10,
        "survival {survival} vs analytic {expected}"
    );
}

#[test]
fn evolution_rejects_non_diagonal_hamiltonian() {
    let params = OscParams::standard(3);
    let off_diagonal = GeneralizedVector::rotated_projector(3, 0, &params).unwrap();
    let rho = GeneralizedVector::projector(3, 0).unwrap();
    assert!(rho.evolve(&off_diagonal, 1.0).is_err());
}

#[test]
fn commutator_is_traceless_and_hermitian() {
    let params = OscParams::standard(3);
    let h = GeneralizedVector::rotated_projector(3, 0, &params).unwrap();
    let rho = GeneralizedVector::rotated_projector(3, 1, &params).unwrap();
    let comm = GeneralizedVector::commutator_i(&h, &rho).unwrap();
    assert!(comm.trace().abs() < 1e-14);
    // Hermiticity survives the component round trip exactly
    let rebuilt = GeneralizedVector::from_components(3, &comm.components()).unwrap();
    assert_eq!(comm, rebuilt);
}

#[test]
fn anticommutator_of_projector_with_itself_doubles_it() {
    let p = GeneralizedVector::projector(3, 1).unwrap();
    let anti = GeneralizedVector::anticommutator(&p, &p).unwrap();
    assert!((anti.dot(&p).unwrap() - 2.0).abs() < 1e-14);
    assert!((anti.trace() - 2.0).abs() < 1e-14);
}

#[test]
fn dimension_mismatch_is_reported() {
    let a = GeneralizedVector::projector(2, 0).unwrap();
    let b = GeneralizedVector::projector(3, 0).unwrap();
    assert!(a.dot(&b).is_err());
    assert!(GeneralizedVector::anticommutator(&a, &b).is_err());
    assert!(GeneralizedVector::projector(5, 0).is_err());
    assert!(GeneralizedVector::projector(3, 3).is_err());
}

mod component_codec {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn roundtrip_is_exact(values in proptest::collection::vec(-1.0e3_f64..1.0e3, 9)) {
            let v = GeneralizedVector::from_components(3, &values).unwrap();
            let encoded = v.components();
            prop_assert_eq!(encoded, values);
        }

        #[test]
        fn trace_equals_diagonal_sum(values in proptest::collection::vec(-10.0_f64..10.0, 4)) {
            let v = GeneralizedVector::from_components(2, &values).unwrap();
            prop_assert!((v.trace() - (values[0] + values[1])).abs() < 1e-12);
        }
    }
}
