use criterion::{criterion_group, criterion_main, Criterion};

use nuq_core::consts::KM;
use nuq_core::params::OscParams;
use nuq_core::types::{ParticleMode, StateBasis};
use nuq_media::{ConstantDensity, Track};
use nuq_prop::{EnergyGrid, Propagator, RenormalizePolicy};
use nuq_xs::{DisCrossSections, TauDecaySpectra};

fn coherent_propagator(nodes: usize) -> (Propagator, Vec<Vec<f64>>) {
    let grid = EnergyGrid::log_spaced(1.0, 100.0, nodes).unwrap();
    let mut prop =
        Propagator::new(3, ParticleMode::Neutrino, grid, OscParams::standard(3)).unwrap();
    prop.set_body(Box::new(ConstantDensity::new(5.0, 0.5).unwrap()));
    prop.set_track(Track::new(0.0, 1000.0 * KM).unwrap());
    let rows = vec![vec![0.0, 1.0, 0.0]; nodes];
    (prop, rows)
}

fn bench_coherent(c: &mut Criterion) {
    let mut group = c.benchmark_group("evolve_coherent");
    for nodes in [10usize, 40] {
        let (mut prop, rows) = coherent_propagator(nodes);
        group.bench_function(format!("matter_{nodes}_nodes"), |b| {
            b.iter(|| {
                prop.set_initial_state(&rows, StateBasis::Flavor).unwrap();
                prop.evolve_path().unwrap();
            })
        });
    }
    group.finish();
}

fn bench_interacting(c: &mut Criterion) {
    let nodes = 20;
    let grid = EnergyGrid::log_spaced(1.0e4, 1.0e6, nodes).unwrap();
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
    prop.set_body(Box::new(ConstantDensity::new(10.0, 0.5).unwrap()));
    prop.set_track(Track::new(0.0, 1000.0 * KM).unwrap());
    prop.set_tau_regeneration(true).unwrap();
    let rows = vec![vec![1.0, 1.0, 1.0]; nodes];

    let mut group = c.benchmark_group("evolve_interacting");
    group.sample_size(10);
    group.bench_function("dual_channel_tau_regen", |b| {
        b.iter(|| {
            prop.set_initial_state_dual(&rows, &rows, StateBasis::Flavor)
                .unwrap();
            prop.evolve_path().unwrap();
        })
    });
    group.finish();
}

criterion_group!(benches, bench_coherent, bench_interacting);
criterion_main!(benches);
