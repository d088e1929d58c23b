use nuq_core::consts::{CM, KM, NA};
use nuq_core::errors::NuqError;
use nuq_core::params::OscParams;
use nuq_core::types::{Channel, ParticleMode, StateBasis};
use nuq_media::{ConstantDensity, Track};
use nuq_prop::interactions::nucleon_number;
use nuq_prop::{EnergyGrid, InteractionTensors, Propagator, RenormalizePolicy};
use nuq_xs::{DisCrossSections, TauDecaySpectra};

const NODES: usize = 25;

fn tensors(renormalize: bool) -> (EnergyGrid, InteractionTensors) {
    let grid = EnergyGrid::log_spaced(1.0e3, 1.0e5, NODES).unwrap();
    let tensors = InteractionTensors::build(
        3,
        ParticleMode::Neutrino,
        &grid,
        &DisCrossSections::default(),
        &TauDecaySpectra,
        RenormalizePolicy { enabled: renormalize },
    )
    .unwrap();
    (grid, tensors)
}

#[test]
fn renormalization_closes_the_downscattering_integral() {
    let (grid, t) = tensors(true);
    for e1 in 1..NODES {
        let cc_integral: f64 = (0..e1).map(|e2| t.dnde_cc[0][0][e1][e2] * grid.width(e2)).sum();
        let nc_integral: f64 = (0..e1).map(|e2| t.dnde_nc[0][0][e1][e2] * grid.width(e2)).sum();
        let cc_expected = (t.sigma_cc[0][0][e1] - t.sigma_cc[0][0][0]) / t.sigma_cc[0][0][e1];
        let nc_expected = (t.sigma_nc[0][0][e1] - t.sigma_nc[0][0][0]) / t.sigma_nc[0][0][e1];
        assert!(
            (cc_integral - cc_expected).abs() < 1.0e-9,
            "cc row {e1}: {cc_integral} vs {cc_expected}"
        );
        assert!(
            (nc_integral - nc_expected).abs() < 1.0e-9,
            "nc row {e1}: {nc_integral} vs {nc_expected}"
        );
    }
}

#[test]
fn tau_decay_kernel_closes_where_the_guard_admits_it() {
    // the rescale multiplies whole rows, anchor entry included, so the
    // closure target is fixed by the raw anchor before the rescale
    let (grid, raw) = tensors(false);
    let (_, t) = tensors(true);
    let e0 = grid.energy(0);
    for e1 in 1..NODES {
        let anchor = raw.dnde_tau_all[e1][0] * e0;
        if anchor >= 0.25 {
            continue;
        }
        let all: f64 = (0..e1).map(|e2| t.dnde_tau_all[e1][e2] * grid.width(e2)).sum();
        let expected = 1.0 - anchor;
        assert!((all - expected).abs() < 1.0e-9, "row {e1}: {all} vs {expected}");
    }
}

#[test]
fn unrenormalized_spectra_keep_the_raw_normalization() {
    let (grid, t) = tensors(false);
    // the flat DIS spectrum integrates to sigma * (covered fraction); the
    // raw normalized kernel must not be rescaled toward closure
    let e1 = NODES - 1;
    let raw: f64 = (0..e1).map(|e2| t.dnde_cc[0][0][e1][e2] * grid.width(e2)).sum();
    let covered = (grid.energy(e1) - grid.energy(0)) / grid.energy(e1);
    assert!((raw - covered).abs() < 1.0e-9, "raw integral {raw} vs covered {covered}");
}

#[test]
fn inverse_lengths_follow_the_medium_density() {
    let (_grid, mut t) = tensors(true);
    t.refresh_inverse_lengths(10.0);
    let n = nucleon_number(10.0);
    for e in 0..NODES {
        let expected = (t.sigma_cc[0][0][e] + t.sigma_nc[0][0][e]) * n;
        assert!((t.invlen_total[0][0][e] - expected).abs() <= 1.0e-12 * expected);
        assert!(t.invlen_cc[0][0][e] > 0.0);
    }
}

#[test]
fn nucleon_number_is_floored_in_vacuum() {
    let floor = NA / (CM * CM * CM) * 1.0e-10;
    assert_eq!(nucleon_number(0.0), floor);
    assert!(nucleon_number(1.0) > floor);
}

#[test]
fn interactions_require_a_multi_node_grid_and_three_states() {
    let grid = EnergyGrid::single(10.0).unwrap();
    let err = InteractionTensors::build(
        3,
        ParticleMode::Neutrino,
        &grid,
        &DisCrossSections::default(),
        &TauDecaySpectra,
        RenormalizePolicy::default(),
    )
    .unwrap_err();
    assert!(matches!(err, NuqError::Interaction(_)));

    let grid = EnergyGrid::log_spaced(1.0, 100.0, 10).unwrap();
    let err = Propagator::with_interactions(
        2,
        ParticleMode::Neutrino,
        grid,
        OscParams::standard(2),
        &DisCrossSections::default(),
        &TauDecaySpectra,
        RenormalizePolicy::default(),
    )
    .unwrap_err();
    assert!(matches!(err, NuqError::Config(_)));
}

#[test]
fn absorption_attenuates_the_high_energy_flux() {
    let grid = EnergyGrid::log_spaced(1.0e4, 1.0e6, NODES).unwrap();
    let mut prop = Propagator::with_interactions(
        3,
        ParticleMode::Neutrino,
        grid,
        OscParams::standard(3),
        &DisCrossSections::default(),
        &TauDecaySpectra,
        RenormalizePolicy::default(),
    )
    .unwrap();
    prop.set_body(Box::new(ConstantDensity::new(10.0, 0.5).unwrap()));
    prop.set_track(Track::new(0.0, 5000.0 * KM).unwrap());
    let rows = vec![vec![1.0, 1.0, 1.0]; NODES];
    prop.set_initial_state(&rows, StateBasis::Flavor).unwrap();
    prop.evolve_path().unwrap();

    let node_total = |prop: &Propagator, node: usize| -> f64 {
        (0..3)
            .map(|f| prop.eval_flavor_at_node(f, node, Channel::Neutrino).unwrap())
            .sum()
    };

    let top = node_total(&prop, NODES - 1);
    assert!(top < 2.95, "no attenuation at the top node: {top}");
    assert!(top > -1.0e-6);

    // the cascade only moves flux downward, so the total cannot grow
    let total: f64 = (0..NODES).map(|node| node_total(&prop, node)).sum();
    assert!(total <= 3.0 * NODES as f64 + 1.0e-6, "total grew: {total}");

    let low = node_total(&prop, 0);
    assert!(low > 0.0);
}
