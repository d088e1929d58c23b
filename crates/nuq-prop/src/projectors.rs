//! Mass and flavor projector bookkeeping.
//!
//! Static projectors are built once per mixing configuration; evolved copies
//! are rebuilt during propagation by applying the free Hamiltonian phase at
//! the current trajectory position.

use nuq_algebra::GeneralizedVector;
use nuq_core::errors::NuqError;
use nuq_core::params::OscParams;
use nuq_core::types::{Channel, ParticleMode};

/// The full projector family for one propagation setup.
///
/// Flavor projectors are stored per channel slot because the antineutrino
/// rotation uses conjugated CP phases.
#[derive(Debug, Clone)]
pub struct ProjectorSet {
    dim: usize,
    /// Mass-basis projectors, shared between channels.
    mass: Vec<GeneralizedVector>,
    /// Static flavor projectors, indexed `[slot][flavor]`.
    flavor: Vec<Vec<GeneralizedVector>>,
    /// Interaction-picture flavor projectors, indexed `[slot][flavor][node]`.
    evolved: Vec<Vec<Vec<GeneralizedVector>>>,
}

impl ProjectorSet {
    /// Builds the projector family for `dim` states, `mode` channels and
    /// `n_nodes` energy nodes from the given mixing parameters.
    pub fn new(
        dim: usize,
        mode: ParticleMode,
        n_nodes: usize,
        params: &OscParams,
    ) -> Result<Self, NuqError> {
        let mut set = Self {
            dim,
            mass: Vec::new(),
            flavor: Vec::new(),
            evolved: Vec::new(),
        };
        set.reset(mode, n_nodes, params)?;
        Ok(set)
    }

    /// Rebuilds all static projectors from `params` and resets the evolved
    /// copies to the static ones (elapsed time zero).
    pub fn reset(
        &mut self,
        mode: ParticleMode,
        n_nodes: usize,
        params: &OscParams,
    ) -> Result<(), NuqError> {
        let dim = self.dim;
        self.mass = (0..dim)
            .map(|k| GeneralizedVector::projector(dim, k))
            .collect::<Result<Vec<_>, _>>()?;

        let anti = params.flipped_cp();
        let mut flavor = Vec::with_capacity(mode.channel_count());
        for slot in 0..mode.channel_count() {
            let p = match mode.channel_at(slot) {
                Some(Channel::Antineutrino) => &anti,
                _ => params,
            };
            let per_flavor = (0..dim)
                .map(|f| GeneralizedVector::rotated_projector(dim, f, p))
                .collect::<Result<Vec<_>, _>>()?;
            flavor.push(per_flavor);
        }
        self.flavor = flavor;

        self.evolved = self
            .flavor
            .iter()
            .map(|per_flavor| {
                per_flavor
                    .iter()
                    .map(|p| vec![p.clone(); n_nodes])
                    .collect()
            })
            .collect();
        Ok(())
    }

    /// Number of states per node.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Mass projector `k`.
    pub fn mass(&self, k: usize) -> &GeneralizedVector {
        &self.mass[k]
    }

    /// Static flavor projector for channel slot `slot` and flavor `f`.
    pub fn flavor(&self, slot: usize, f: usize) -> &GeneralizedVector {
        &self.flavor[slot][f]
    }

    /// Cached evolved flavor projector for channel slot `slot`, flavor `f`
    /// and energy node `e`.
    pub fn evolved(&self, slot: usize, f: usize, e: usize) -> &GeneralizedVector {
        &self.evolved[slot][f][e]
    }

    /// Evolves a static flavor projector to elapsed time `elapsed` under the
    /// free Hamiltonian `h0` of one node, without touching the cache.
    pub fn evolved_at(
        &self,
        slot: usize,
        f: usize,
        h0: &GeneralizedVector,
        elapsed: f64,
    ) -> Result<GeneralizedVector, NuqError> {
        self.flavor[slot][f].evolve(h0, elapsed)
    }

    /// Refreshes the evolved-projector cache for every slot, flavor and node
    /// at elapsed time `elapsed`, given one free Hamiltonian per node.
    pub fn evolve_to(&mut self, elapsed: f64, h0: &[GeneralizedVector]) -> Result<(), NuqError> {
        for (slot, per_flavor) in self.flavor.iter().enumerate() {
            for (f, stat) in per_flavor.iter().enumerate() {
                for (e, h) in h0.iter().enumerate() {
                    self.evolved[slot][f][e] = stat.evolve(h, elapsed)?;
                }
            }
        }
        Ok(())
    }
}
