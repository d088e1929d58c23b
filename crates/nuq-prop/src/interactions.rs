//! Precomputed interaction tensors and their per-position refresh.
//!
//! Total cross sections, normalized secondary spectra and tau decay kernels
//! are sampled once onto the energy grid during setup; only the inverse
//! interaction lengths depend on the medium and are refreshed as the
//! trajectory advances.

use serde::{Deserialize, Serialize};

use nuq_core::consts::{
    CM, GEV, GRAM, NA, NEUTRON_MASS, PROTON_MASS, TAU_BR_LEPTON, TAU_LIFETIME, TAU_MASS,
};
use nuq_core::errors::{ErrorInfo, NuqError};
use nuq_core::types::{Current, Flavor, ParticleMode};
use nuq_xs::{CrossSectionSource, TauDecaySource};

use crate::grid::EnergyGrid;

fn interaction_error(code: &str, message: impl Into<String>) -> NuqError {
    NuqError::Interaction(ErrorInfo::new(code, message))
}

/// Whether the sampled differential spectra are renormalized so that the
/// discrete downscattering integrals close against the totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenormalizePolicy {
    /// Apply the closure pass after sampling.
    pub enabled: bool,
}

impl Default for RenormalizePolicy {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Sampled cross sections, normalized spectra, decay kernels and the
/// medium-dependent inverse interaction lengths.
///
/// Per-flavor arrays are indexed `[slot][flavor][node]`, downscattering
/// kernels `[slot][flavor][e_in][e_out]` with the `e_out < e_in` triangle
/// populated. Everything is stored in natural units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionTensors {
    /// Total charged-current cross section per node, in eV^-2.
    pub sigma_cc: Vec<Vec<Vec<f64>>>,
    /// Total neutral-current cross section per node, in eV^-2.
    pub sigma_nc: Vec<Vec<Vec<f64>>>,
    /// Normalized CC secondary spectrum, in eV^-1.
    pub dnde_cc: Vec<Vec<Vec<Vec<f64>>>>,
    /// Normalized NC secondary spectrum, in eV^-1.
    pub dnde_nc: Vec<Vec<Vec<Vec<f64>>>>,
    /// Inverse CC interaction length per node, in eV.
    pub invlen_cc: Vec<Vec<Vec<f64>>>,
    /// Inverse NC interaction length per node, in eV.
    pub invlen_nc: Vec<Vec<Vec<f64>>>,
    /// Total inverse interaction length per node, in eV.
    pub invlen_total: Vec<Vec<Vec<f64>>>,
    /// Inverse tau decay length per node, in eV.
    pub invlen_tau: Vec<f64>,
    /// Tau decay kernel, all channels, in eV^-1.
    pub dnde_tau_all: Vec<Vec<f64>>,
    /// Tau decay kernel, leptonic channels only, in eV^-1.
    pub dnde_tau_lep: Vec<Vec<f64>>,
}

impl InteractionTensors {
    /// Samples all tensors onto `grid` for the channels of `mode` and `dim`
    /// flavors. Requires a multi-node grid.
    pub fn build(
        dim: usize,
        mode: ParticleMode,
        grid: &EnergyGrid,
        xs: &dyn CrossSectionSource,
        tau: &dyn TauDecaySource,
        renormalize: RenormalizePolicy,
    ) -> Result<Self, NuqError> {
        if grid.is_single() {
            return Err(interaction_error(
                "single-energy",
                "interaction tensors need a multi-node energy grid",
            ));
        }
        let ne = grid.len();
        let nch = mode.channel_count();
        let cm2 = CM * CM;
        let cm2_per_gev = cm2 / GEV;
        let per_gev = 1.0 / GEV;

        let zeros1 = vec![vec![vec![0.0; ne]; dim]; nch];
        let zeros2 = vec![vec![vec![vec![0.0; ne]; ne]; dim]; nch];
        let mut tensors = Self {
            sigma_cc: zeros1.clone(),
            sigma_nc: zeros1.clone(),
            dnde_cc: zeros2.clone(),
            dnde_nc: zeros2,
            invlen_cc: zeros1.clone(),
            invlen_nc: zeros1.clone(),
            invlen_total: zeros1,
            invlen_tau: vec![0.0; ne],
            dnde_tau_all: vec![vec![0.0; ne]; ne],
            dnde_tau_lep: vec![vec![0.0; ne]; ne],
        };

        // raw differential cross sections, before normalization
        let mut dsig_cc = vec![vec![vec![vec![0.0; ne]; ne]; dim]; nch];
        let mut dsig_nc = vec![vec![vec![vec![0.0; ne]; ne]; dim]; nch];

        for slot in 0..nch {
            let channel = mode.channel_at(slot).ok_or_else(|| {
                interaction_error("bad-slot", format!("channel slot {slot} out of range"))
            })?;
            for f in 0..dim {
                let flavor = Flavor::from_index(f);
                for e1 in 0..ne {
                    let ein_gev = grid.energy(e1) / GEV;
                    tensors.sigma_cc[slot][f][e1] =
                        xs.total(ein_gev, flavor, channel, Current::Cc) * cm2;
                    tensors.sigma_nc[slot][f][e1] =
                        xs.total(ein_gev, flavor, channel, Current::Nc) * cm2;
                    for e2 in 0..e1 {
                        let eout_gev = grid.energy(e2) / GEV;
                        dsig_cc[slot][f][e1][e2] =
                            xs.differential(ein_gev, eout_gev, flavor, channel, Current::Cc)
                                * cm2_per_gev;
                        dsig_nc[slot][f][e1][e2] =
                            xs.differential(ein_gev, eout_gev, flavor, channel, Current::Nc)
                                * cm2_per_gev;
                    }
                }
            }
        }

        if renormalize.enabled {
            // closure pass: rescale the triangle so the discrete integral
            // reproduces the total above the lowest node
            for slot in 0..nch {
                for f in 0..dim {
                    let cc_floor = tensors.sigma_cc[slot][f][0];
                    let nc_floor = tensors.sigma_nc[slot][f][0];
                    for e1 in 1..ne {
                        let mut cc_int = 0.0;
                        let mut nc_int = 0.0;
                        for e2 in 0..e1 {
                            cc_int += dsig_cc[slot][f][e1][e2] * grid.width(e2);
                            nc_int += dsig_nc[slot][f][e1][e2] * grid.width(e2);
                        }
                        if cc_int > 0.0 {
                            let rescale = (tensors.sigma_cc[slot][f][e1] - cc_floor) / cc_int;
                            for e2 in 0..e1 {
                                dsig_cc[slot][f][e1][e2] *= rescale;
                            }
                        }
                        if nc_int > 0.0 {
                            let rescale = (tensors.sigma_nc[slot][f][e1] - nc_floor) / nc_int;
                            for e2 in 0..e1 {
                                dsig_nc[slot][f][e1][e2] *= rescale;
                            }
                        }
                    }
                }
            }
        }

        // normalized spectra, dropping underflow and non-finite samples
        for slot in 0..nch {
            for f in 0..dim {
                for e1 in 0..ne {
                    for e2 in 0..e1 {
                        tensors.dnde_cc[slot][f][e1][e2] =
                            normalized(dsig_cc[slot][f][e1][e2], tensors.sigma_cc[slot][f][e1]);
                        tensors.dnde_nc[slot][f][e1][e2] =
                            normalized(dsig_nc[slot][f][e1][e2], tensors.sigma_nc[slot][f][e1]);
                    }
                }
            }
        }

        for e1 in 0..ne {
            tensors.invlen_tau[e1] = 1.0 / (TAU_LIFETIME * grid.energy(e1) * TAU_MASS);
        }

        for e1 in 0..ne {
            let etau_gev = grid.energy(e1) / GEV;
            for e2 in 0..e1 {
                let enu_gev = grid.energy(e2) / GEV;
                tensors.dnde_tau_all[e1][e2] = tau.dnde_all(etau_gev, enu_gev) * per_gev;
                tensors.dnde_tau_lep[e1][e2] = tau.dnde_leptonic(etau_gev, enu_gev) * per_gev;
            }
        }

        if renormalize.enabled {
            // decay kernels integrate to one (all) and to the leptonic
            // branching ratio (lep); skip rows already dominated by the
            // lowest node
            for e1 in 1..ne {
                let mut all_int = 0.0;
                let mut lep_int = 0.0;
                for e2 in 0..e1 {
                    all_int += tensors.dnde_tau_all[e1][e2] * grid.width(e2);
                    lep_int += tensors.dnde_tau_lep[e1][e2] * grid.width(e2);
                }
                if tensors.dnde_tau_all[e1][0] * grid.energy(0) < 0.25 && all_int > 0.0 {
                    let all_rescale =
                        (1.0 - tensors.dnde_tau_all[e1][0] * grid.energy(0)) / all_int;
                    let lep_rescale = if lep_int > 0.0 {
                        (TAU_BR_LEPTON - tensors.dnde_tau_lep[e1][0] * grid.energy(0)) / lep_int
                    } else {
                        1.0
                    };
                    for e2 in 0..e1 {
                        tensors.dnde_tau_all[e1][e2] *= all_rescale;
                        tensors.dnde_tau_lep[e1][e2] *= lep_rescale;
                    }
                }
            }
        }

        Ok(tensors)
    }

    /// Refreshes the inverse interaction lengths for a medium of `density`
    /// g/cm^3, flooring the nucleon number for near-vacuum media.
    pub fn refresh_inverse_lengths(&mut self, density: f64) {
        let num_nuc = nucleon_number(density);
        for (slot, per_flavor) in self.invlen_total.iter_mut().enumerate() {
            for (f, per_node) in per_flavor.iter_mut().enumerate() {
                for (e, total) in per_node.iter_mut().enumerate() {
                    let cc = self.sigma_cc[slot][f][e] * num_nuc;
                    let nc = self.sigma_nc[slot][f][e] * num_nuc;
                    self.invlen_cc[slot][f][e] = cc;
                    self.invlen_nc[slot][f][e] = nc;
                    *total = cc + nc;
                }
            }
        }
    }
}

fn normalized(differential: f64, total: f64) -> f64 {
    if differential < 1.0e-50 || !differential.is_finite() {
        0.0
    } else {
        differential / total
    }
}

/// Nucleon number density in natural units for a medium of `density` g/cm^3,
/// with an isoscalar target and a floor that keeps the interaction lengths
/// finite in vacuum.
pub fn nucleon_number(density: f64) -> f64 {
    let num_nuc = GRAM / (CM * CM * CM) * density * 2.0 / (PROTON_MASS + NEUTRON_MASS);
    if num_nuc < 1.0e-10 {
        NA / (CM * CM * CM) * 1.0e-10
    } else {
        num_nuc
    }
}
