use nuq_core::consts::KM;
use nuq_core::errors::NuqError;
use nuq_core::params::OscParams;
use nuq_core::types::{BasisMode, Channel, ParticleMode, StateBasis};
use nuq_media::{ConstantDensity, Track, Vacuum};
use nuq_prop::{EnergyGrid, Propagator};

const NODES: usize = 20;

fn matter_setup(density: f64) -> Propagator {
    let grid = EnergyGrid::log_spaced(1.0, 100.0, NODES).unwrap();
    let mut prop = Propagator::new(3, ParticleMode::Neutrino, grid, OscParams::standard(3))
        .unwrap();
    prop.set_body(Box::new(ConstantDensity::new(density, 0.5).unwrap()));
    prop.set_track(Track::new(0.0, 2000.0 * KM).unwrap());
    let rows = vec![vec![0.0, 1.0, 0.0]; NODES];
    prop.set_initial_state(&rows, StateBasis::Flavor).unwrap();
    prop
}

#[test]
fn matter_propagation_conserves_probability() {
    let mut prop = matter_setup(10.0);
    prop.evolve_path().unwrap();
    for node in 0..NODES {
        let flavor_sum: f64 = (0..3)
            .map(|f| prop.eval_flavor_at_node(f, node, Channel::Neutrino).unwrap())
            .sum();
        let mass_sum: f64 = (0..3)
            .map(|k| prop.eval_mass_at_node(k, node, Channel::Neutrino).unwrap())
            .sum();
        assert!(
            (flavor_sum - 1.0).abs() < 1.0e-6,
            "node {node} flavor sum {flavor_sum}"
        );
        assert!((flavor_sum - mass_sum).abs() < 1.0e-7);
    }
}

#[test]
fn matter_changes_the_oscillation_pattern() {
    let mut vacuum = matter_setup(10.0);
    vacuum.set_body(Box::new(Vacuum));
    let rows = vec![vec![0.0, 1.0, 0.0]; NODES];
    vacuum.set_initial_state(&rows, StateBasis::Flavor).unwrap();
    vacuum.evolve_path().unwrap();

    let mut matter = matter_setup(10.0);
    matter.evolve_path().unwrap();

    let mut max_diff = 0.0_f64;
    for node in 0..NODES {
        let a = vacuum.eval_flavor_at_node(1, node, Channel::Neutrino).unwrap();
        let b = matter.eval_flavor_at_node(1, node, Channel::Neutrino).unwrap();
        max_diff = max_diff.max((a - b).abs());
    }
    assert!(max_diff > 1.0e-3, "matter had no visible effect: {max_diff}");
}

#[test]
fn positivity_correction_keeps_flavor_content_non_negative() {
    let mut prop = matter_setup(10.0);
    prop.set_positivity(true);
    prop.set_positivity_scale(500.0 * KM).unwrap();
    prop.evolve_path().unwrap();
    for node in 0..NODES {
        for f in 0..3 {
            let value = prop.eval_flavor_at_node(f, node, Channel::Neutrino).unwrap();
            assert!(value >= -1.0e-9, "node {node} flavor {f}: {value}");
        }
    }
}

#[test]
fn interpolation_is_rejected_in_the_mass_working_basis() {
    let grid = EnergyGrid::log_spaced(1.0, 100.0, NODES).unwrap();
    let mut prop = Propagator::new(3, ParticleMode::Neutrino, grid, OscParams::standard(3))
        .unwrap();
    prop.set_basis(BasisMode::Mass);
    prop.set_body(Box::new(Vacuum));
    prop.set_track(Track::new(0.0, 100.0 * KM).unwrap());
    let rows = vec![vec![1.0, 0.0, 0.0]; NODES];
    prop.set_initial_state(&rows, StateBasis::Flavor).unwrap();
    let err = prop.eval_flavor(0, 5.0, Channel::Neutrino).unwrap_err();
    assert!(matches!(err, NuqError::Config(_)));
    // node evaluation stays available
    prop.eval_flavor_at_node(0, 0, Channel::Neutrino).unwrap();
}

#[test]
fn setup_guards_reject_incomplete_configuration() {
    let grid = EnergyGrid::log_spaced(1.0, 100.0, NODES).unwrap();
    let mut prop = Propagator::new(3, ParticleMode::Neutrino, grid, OscParams::standard(3))
        .unwrap();

    // no medium yet
    let rows = vec![vec![1.0, 0.0, 0.0]; NODES];
    assert!(matches!(
        prop.set_initial_state(&rows, StateBasis::Flavor),
        Err(NuqError::Config(_))
    ));

    prop.set_body(Box::new(Vacuum));
    prop.set_track(Track::new(0.0, 100.0 * KM).unwrap());

    // no state yet
    assert!(matches!(prop.evolve_path(), Err(NuqError::Config(_))));

    // wrong row count and wrong row width
    assert!(matches!(
        prop.set_initial_state(&rows[..5].to_vec(), StateBasis::Flavor),
        Err(NuqError::Argument(_))
    ));
    let bad_rows = vec![vec![1.0, 0.0]; NODES];
    assert!(matches!(
        prop.set_initial_state(&bad_rows, StateBasis::Flavor),
        Err(NuqError::Argument(_))
    ));

    // wrong channel for the configured mode
    prop.set_initial_state(&rows, StateBasis::Flavor).unwrap();
    assert!(matches!(
        prop.eval_flavor_at_node(0, 0, Channel::Antineutrino),
        Err(NuqError::Config(_))
    ));

    // mixing change invalidates the state until it is set again
    prop.set_mixing_angle(0, 1, 0.6).unwrap();
    assert!(matches!(prop.evolve_path(), Err(NuqError::Config(_))));
    prop.set_initial_state(&rows, StateBasis::Flavor).unwrap();
    prop.evolve_path().unwrap();
}
