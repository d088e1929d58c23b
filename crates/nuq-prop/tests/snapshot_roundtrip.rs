use nuq_core::consts::KM;
use nuq_core::errors::NuqError;
use nuq_core::params::OscParams;
use nuq_core::types::{Channel, ParticleMode, StateBasis};
use nuq_media::{ConstantDensity, Track};
use nuq_prop::{from_json, restore, snapshot, to_json, EnergyGrid, Propagator, RenormalizePolicy};
use nuq_xs::{DisCrossSections, TauDecaySpectra};

const NODES: usize = 12;

fn interacting_setup() -> Propagator {
    let grid = EnergyGrid::log_spaced(1.0e4, 1.0e6, NODES).unwrap();
    let mut prop = Propagator::with_interactions(
        3,
        ParticleMode::Both,
        grid,
        OscParams::standard(3),
        &DisCrossSections::default(),
        &TauDecaySpectra,
        RenormalizePolicy::default(),
    )
    .unwrap();
    prop.set_body(Box::new(ConstantDensity::new(6.0, 0.5).unwrap()));
    prop.set_track(Track::new(0.0, 2000.0 * KM).unwrap());
    prop.set_tau_regeneration(true).unwrap();
    let nu = vec![vec![1.0, 1.0, 1.0]; NODES];
    let nubar = vec![vec![0.5, 0.5, 0.5]; NODES];
    prop.set_initial_state_dual(&nu, &nubar, StateBasis::Flavor)
        .unwrap();
    prop
}

fn compare(a: &Propagator, b: &Propagator, tolerance: f64) {
    assert_eq!(a.dim(), b.dim());
    assert_eq!(a.mode(), b.mode());
    assert_eq!(a.grid().energies(), b.grid().energies());
    assert!((a.position() - b.position()).abs() <= 1.0e-6 * (1.0 + a.position().abs()));
    for node in 0..a.grid().len() {
        for channel in [Channel::Neutrino, Channel::Antineutrino] {
            for f in 0..a.dim() {
                let x = a.eval_flavor_at_node(f, node, channel).unwrap();
                let y = b.eval_flavor_at_node(f, node, channel).unwrap();
                assert!(
                    (x - y).abs() < tolerance,
                    "node {node} flavor {f} {channel:?}: {x} vs {y}"
                );
            }
            let x = a.tau_flux(node, channel).unwrap();
            let y = b.tau_flux(node, channel).unwrap();
            assert!((x - y).abs() < tolerance);
        }
    }
}

#[test]
fn snapshot_round_trips_a_partial_run() {
    let mut prop = interacting_setup();
    prop.evolve(800.0 * KM).unwrap();

    let json = to_json(&prop).unwrap();
    let restored = from_json(&json).unwrap();
    compare(&prop, &restored, 1.0e-9);
}

#[test]
fn json_encoding_is_stable_across_a_round_trip() {
    let mut prop = interacting_setup();
    prop.evolve(800.0 * KM).unwrap();
    // every f64 must survive the text form exactly, so re-encoding the
    // restored propagator reproduces the byte-identical document
    let json = to_json(&prop).unwrap();
    let restored = from_json(&json).unwrap();
    assert_eq!(to_json(&restored).unwrap(), json);
}

#[test]
fn restored_run_continues_like_the_original() {
    let mut prop = interacting_setup();
    prop.evolve(800.0 * KM).unwrap();

    let json = to_json(&prop).unwrap();
    let mut restored = from_json(&json).unwrap();

    prop.evolve(400.0 * KM).unwrap();
    restored.evolve(400.0 * KM).unwrap();
    compare(&prop, &restored, 1.0e-5);
}

#[test]
fn snapshot_round_trips_before_any_evolution() {
    let prop = interacting_setup();
    let restored = restore(&snapshot(&prop).unwrap()).unwrap();
    compare(&prop, &restored, 1.0e-12);
    for node in 0..NODES {
        let value = restored
            .eval_flavor_at_node(0, node, Channel::Neutrino)
            .unwrap();
        assert!((value - 1.0).abs() < 1.0e-12);
    }
}

#[test]
fn newer_snapshot_formats_are_rejected() {
    let prop = interacting_setup();
    let mut snap = snapshot(&prop).unwrap();
    snap.format_version += 1;
    let err = restore(&snap).unwrap_err();
    assert!(matches!(err, NuqError::Serde(_)));
}

#[test]
fn snapshots_without_the_required_channel_are_rejected() {
    let prop = interacting_setup();
    let mut snap = snapshot(&prop).unwrap();
    snap.antineutrino_state = None;
    let err = restore(&snap).unwrap_err();
    assert!(matches!(err, NuqError::Serde(_)));
}

#[test]
fn snapshot_carries_derived_compositions() {
    let mut prop = interacting_setup();
    prop.evolve(500.0 * KM).unwrap();
    let snap = snapshot(&prop).unwrap();
    assert_eq!(snap.flavor_composition.len(), 2);
    assert_eq!(snap.flavor_composition[0].len(), NODES);
    for node in 0..NODES {
        for f in 0..3 {
            let stored = snap.flavor_composition[0][node][f];
            let live = prop.eval_flavor_at_node(f, node, Channel::Neutrino).unwrap();
            assert!((stored - live).abs() < 1.0e-12);
        }
    }
    assert!(snap.tensors.is_some());
}

#[test]
fn snapshot_requires_an_initialized_state() {
    let grid = EnergyGrid::log_spaced(1.0, 100.0, 8).unwrap();
    let prop = Propagator::new(3, ParticleMode::Neutrino, grid, OscParams::standard(3)).unwrap();
    assert!(matches!(snapshot(&prop), Err(NuqError::Serde(_))));
}
