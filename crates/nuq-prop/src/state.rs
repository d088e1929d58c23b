//! The evolved state tensor handed to the stepper.

use nuq_algebra::GeneralizedVector;
use nuq_core::errors::NuqError;
use nuq_ode::StateVector;

/// Density matrices for every `(node, channel)` pair plus the scalar tau
/// fluxes that mediate regeneration.
///
/// Densities are laid out node-major: the matrix for node `e` and channel
/// slot `slot` sits at `e * channels + slot`. Scalars share the layout.
#[derive(Debug, Clone, PartialEq)]
pub struct PropState {
    dim: usize,
    channels: usize,
    rho: Vec<GeneralizedVector>,
    scalars: Vec<f64>,
}

impl PropState {
    /// Zeroed state for `nodes` energy nodes, `channels` channel slots and
    /// `dim` states per matrix.
    pub fn zeroed(dim: usize, nodes: usize, channels: usize) -> Result<Self, NuqError> {
        let rho = vec![GeneralizedVector::zero(dim)?; nodes * channels];
        Ok(Self {
            dim,
            channels,
            rho,
            scalars: vec![0.0; nodes * channels],
        })
    }

    /// States per density matrix.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Channel slots per node.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of energy nodes.
    pub fn nodes(&self) -> usize {
        self.rho.len() / self.channels
    }

    fn index(&self, e: usize, slot: usize) -> usize {
        e * self.channels + slot
    }

    /// Density matrix at node `e`, channel slot `slot`.
    pub fn rho(&self, e: usize, slot: usize) -> &GeneralizedVector {
        &self.rho[self.index(e, slot)]
    }

    /// Mutable density matrix at node `e`, channel slot `slot`.
    pub fn rho_mut(&mut self, e: usize, slot: usize) -> &mut GeneralizedVector {
        let i = self.index(e, slot);
        &mut self.rho[i]
    }

    /// Scalar tau flux at node `e`, channel slot `slot`.
    pub fn scalar(&self, e: usize, slot: usize) -> f64 {
        self.scalars[self.index(e, slot)]
    }

    /// Mutable scalar tau flux at node `e`, channel slot `slot`.
    pub fn scalar_mut(&mut self, e: usize, slot: usize) -> &mut f64 {
        let i = self.index(e, slot);
        &mut self.scalars[i]
    }

    /// Zeroes every scalar entry.
    pub fn clear_scalars(&mut self) {
        self.scalars.iter_mut().for_each(|s| *s = 0.0);
    }
}

impl StateVector for PropState {
    fn zeros_like(&self) -> Self {
        let mut out = self.clone();
        for m in &mut out.rho {
            m.scale(0.0);
        }
        out.scalars.iter_mut().for_each(|s| *s = 0.0);
        out
    }

    fn assign(&mut self, other: &Self) {
        self.rho.clone_from_slice(&other.rho);
        self.scalars.copy_from_slice(&other.scalars);
    }

    fn scaled_add(&mut self, a: f64, other: &Self) {
        for (lhs, rhs) in self.rho.iter_mut().zip(&other.rho) {
            lhs.axpy(a, rhs);
        }
        for (lhs, rhs) in self.scalars.iter_mut().zip(&other.scalars) {
            *lhs += a * rhs;
        }
    }

    fn error_ratio(&self, err: &Self, abs_tol: f64, rel_tol: f64) -> f64 {
        let mut worst = 0.0_f64;
        for (value, e) in self.rho.iter().zip(&err.rho) {
            let scale = abs_tol + rel_tol * value.max_abs();
            if scale > 0.0 {
                worst = worst.max(e.max_abs() / scale);
            }
        }
        for (value, e) in self.scalars.iter().zip(&err.scalars) {
            let scale = abs_tol + rel_tol * value.abs();
            if scale > 0.0 {
                worst = worst.max(e.abs() / scale);
            }
        }
        worst
    }
}
