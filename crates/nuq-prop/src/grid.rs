//! Discretized energy grid over which the state tensor is defined.

use serde::{Deserialize, Serialize};

use nuq_core::consts::GEV;
use nuq_core::errors::{ErrorInfo, NuqError};

fn grid_error(code: &str, message: impl Into<String>) -> NuqError {
    NuqError::Argument(ErrorInfo::new(code, message))
}

/// Ordered energy nodes in natural units (eV), with per-interval widths.
///
/// Immutable once built; the propagator owns one for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyGrid {
    energies: Vec<f64>,
    widths: Vec<f64>,
    log_scale: bool,
}

impl EnergyGrid {
    /// Builds `n >= 2` logarithmically spaced nodes between `emin_gev` and
    /// `emax_gev`.
    pub fn log_spaced(emin_gev: f64, emax_gev: f64, n: usize) -> Result<Self, NuqError> {
        let energies = Self::spaced(emin_gev, emax_gev, n, true)?;
        Self::from_raw(energies, true)
    }

    /// Builds `n >= 2` linearly spaced nodes between `emin_gev` and
    /// `emax_gev`.
    pub fn linear_spaced(emin_gev: f64, emax_gev: f64, n: usize) -> Result<Self, NuqError> {
        let energies = Self::spaced(emin_gev, emax_gev, n, false)?;
        Self::from_raw(energies, false)
    }

    /// Single-energy grid; interaction physics is unavailable in this mode.
    pub fn single(energy_gev: f64) -> Result<Self, NuqError> {
        if !(energy_gev.is_finite() && energy_gev > 0.0) {
            return Err(grid_error(
                "bad-energy",
                format!("single energy must be positive, got {energy_gev} GeV"),
            ));
        }
        Ok(Self {
            energies: vec![energy_gev * GEV],
            widths: Vec::new(),
            log_scale: false,
        })
    }

    fn spaced(emin_gev: f64, emax_gev: f64, n: usize, log: bool) -> Result<Vec<f64>, NuqError> {
        if n == 0 {
            return Err(grid_error("empty-grid", "node count must be nonzero"));
        }
        if n < 2 {
            return Err(grid_error(
                "too-few-nodes",
                "spaced grids need at least two nodes; use EnergyGrid::single",
            ));
        }
        if !(emin_gev.is_finite() && emax_gev.is_finite()) || emin_gev <= 0.0 {
            return Err(grid_error(
                "bad-bounds",
                format!("invalid energy bounds [{emin_gev}, {emax_gev}] GeV"),
            ));
        }
        if emax_gev < emin_gev {
            return Err(grid_error(
                "inverted-bounds",
                format!("emax {emax_gev} GeV below emin {emin_gev} GeV"),
            ));
        }
        let lo = emin_gev * GEV;
        let hi = emax_gev * GEV;
        let steps = (n - 1) as f64;
        let energies = (0..n)
            .map(|i| {
                let t = i as f64 / steps;
                if log {
                    (lo.ln() * (1.0 - t) + hi.ln() * t).exp()
                } else {
                    lo * (1.0 - t) + hi * t
                }
            })
            .collect();
        Ok(energies)
    }

    /// Builds a grid from raw node energies in eV; nodes must be strictly
    /// increasing. Used by snapshot restoration.
    pub fn from_raw(energies: Vec<f64>, log_scale: bool) -> Result<Self, NuqError> {
        if energies.is_empty() {
            return Err(grid_error("empty-grid", "node count must be nonzero"));
        }
        if energies.iter().any(|e| !e.is_finite() || *e <= 0.0) {
            return Err(grid_error("bad-node", "grid nodes must be positive and finite"));
        }
        if energies.windows(2).any(|w| w[1] <= w[0]) {
            return Err(grid_error(
                "not-increasing",
                "grid nodes must be strictly increasing",
            ));
        }
        let widths = energies.windows(2).map(|w| w[1] - w[0]).collect();
        Ok(Self {
            energies,
            widths,
            log_scale,
        })
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.energies.len()
    }

    /// True when the grid has no nodes; never holds for a constructed grid.
    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// True for the relaxed single-energy mode.
    pub fn is_single(&self) -> bool {
        self.energies.len() == 1
    }

    /// Whether the nodes were laid out logarithmically.
    pub fn log_scale(&self) -> bool {
        self.log_scale
    }

    /// Node energy in eV.
    pub fn energy(&self, index: usize) -> f64 {
        self.energies[index]
    }

    /// All node energies in eV.
    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// Interval width `E[i+1] - E[i]` in eV.
    pub fn width(&self, index: usize) -> f64 {
        self.widths[index]
    }

    /// Quadrature weight for node `index` in eV. Interior nodes use the
    /// interval to their right; the last node reuses the final interval,
    /// keeping spectral sums defined over the whole grid.
    pub fn node_weight(&self, index: usize) -> f64 {
        self.widths[index.min(self.widths.len() - 1)]
    }

    /// Returns the interval index `i` with `E[i] <= energy <= E[i+1]`, or
    /// `None` when the energy lies outside the grid (or the grid is
    /// single-energy).
    pub fn interval_of(&self, energy: f64) -> Option<usize> {
        let n = self.energies.len();
        if n < 2 || energy < self.energies[0] || energy > self.energies[n - 1] {
            return None;
        }
        match self.energies.binary_search_by(|e| e.total_cmp(&energy)) {
            Ok(i) => Some(i.min(n - 2)),
            Err(i) => Some(i - 1),
        }
    }
}
