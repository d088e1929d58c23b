//! Oscillation parameter set: mixing angles, CP phases and mass splittings.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, NuqError};

fn params_error(code: &str, message: impl Into<String>) -> NuqError {
    NuqError::Argument(ErrorInfo::new(code, message))
}

/// Mixing angles, CP phases and squared-mass splittings for `dim` states.
///
/// Angles and phases are indexed by the unordered pair `(i, j)` with
/// `i < j < dim`; splittings are relative to the lightest state, so
/// `dm2[i]` holds the splitting of state `i >= 1` against state 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscParams {
    dim: usize,
    /// Row-major upper-triangle storage, entry for pair (i, j) at
    /// `pair_index(i, j)`.
    angles: Vec<f64>,
    phases: Vec<f64>,
    /// `dm2[i]` is the squared-mass splitting of state i+1 against state 0,
    /// in eV^2.
    dm2: Vec<f64>,
}

impl OscParams {
    /// Creates a zeroed parameter set for `dim` states.
    pub fn zeroed(dim: usize) -> Self {
        let pairs = dim * (dim - 1) / 2;
        Self {
            dim,
            angles: vec![0.0; pairs],
            phases: vec![0.0; pairs],
            dm2: vec![0.0; dim.saturating_sub(1)],
        }
    }

    /// Creates the standard three-flavor parameter set
    /// (normal ordering, delta_CP = 0).
    pub fn standard(dim: usize) -> Self {
        let mut params = Self::zeroed(dim);
        if dim >= 2 {
            params.set_angle(0, 1, 0.583996).expect("valid pair");
            params.set_splitting(1, 7.5e-5).expect("valid state");
        }
        if dim >= 3 {
            params.set_angle(0, 2, 0.148190).expect("valid pair");
            params.set_angle(1, 2, 0.737324).expect("valid pair");
            params.set_splitting(2, 2.57e-3).expect("valid state");
            params.set_phase(0, 2, 0.0).expect("valid pair");
        }
        params
    }

    /// Number of states described by this parameter set.
    pub fn dim(&self) -> usize {
        self.dim
    }

    fn pair_index(&self, i: usize, j: usize) -> Result<usize, NuqError> {
        if i >= j || j >= self.dim {
            return Err(params_error(
                "bad-pair",
                format!("pair ({i}, {j}) out of range for {} states", self.dim),
            ));
        }
        // offset of row i in the packed upper triangle
        let row = i * self.dim - i * (i + 1) / 2;
        Ok(row + (j - i - 1))
    }

    /// Sets the mixing angle for the pair `(i, j)` in radians.
    pub fn set_angle(&mut self, i: usize, j: usize, value: f64) -> Result<(), NuqError> {
        let idx = self.pair_index(i, j)?;
        self.angles[idx] = value;
        Ok(())
    }

    /// Returns the mixing angle for the pair `(i, j)`.
    pub fn angle(&self, i: usize, j: usize) -> Result<f64, NuqError> {
        Ok(self.angles[self.pair_index(i, j)?])
    }

    /// Sets the CP phase for the pair `(i, j)` in radians.
    pub fn set_phase(&mut self, i: usize, j: usize, value: f64) -> Result<(), NuqError> {
        let idx = self.pair_index(i, j)?;
        self.phases[idx] = value;
        Ok(())
    }

    /// Returns the CP phase for the pair `(i, j)`.
    pub fn phase(&self, i: usize, j: usize) -> Result<f64, NuqError> {
        Ok(self.phases[self.pair_index(i, j)?])
    }

    /// Sets the squared-mass splitting of state `i >= 1` against the lightest
    /// state, in eV^2.
    pub fn set_splitting(&mut self, i: usize, value: f64) -> Result<(), NuqError> {
        if i == 0 || i >= self.dim {
            return Err(params_error(
                "bad-state",
                format!("splitting index {i} out of range for {} states", self.dim),
            ));
        }
        self.dm2[i - 1] = value;
        Ok(())
    }

    /// Returns the squared-mass splitting of state `i >= 1` in eV^2.
    pub fn splitting(&self, i: usize) -> Result<f64, NuqError> {
        if i == 0 || i >= self.dim {
            return Err(params_error(
                "bad-state",
                format!("splitting index {i} out of range for {} states", self.dim),
            ));
        }
        Ok(self.dm2[i - 1])
    }

    /// Returns a copy with every CP phase negated.
    ///
    /// The antineutrino flavor projectors are built by rotating with the
    /// sign-flipped phases; returning a copy keeps the stored parameters
    /// untouched, so the flip is symmetric by construction.
    pub fn flipped_cp(&self) -> Self {
        let mut copy = self.clone();
        for phase in &mut copy.phases {
            *phase = -*phase;
        }
        copy
    }

    /// Iterates over all parameter pairs `(i, j)` with `i < j`.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let dim = self.dim;
        (0..dim).flat_map(move |i| (i + 1..dim).map(move |j| (i, j)))
    }
}
