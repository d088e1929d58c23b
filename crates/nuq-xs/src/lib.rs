#![deny(missing_docs)]
#![doc = "Cross-section and tau-decay-spectrum providers for the NUQ engine."]

//! Interaction data enters the propagation core through two narrow traits:
//! [`CrossSectionSource`] for charged/neutral-current deep-inelastic cross
//! sections and [`TauDecaySource`] for the neutrino spectra of tau decay.
//! The bundled implementations are analytic parameterizations; table-driven
//! providers plug in behind the same traits.

use serde::{Deserialize, Serialize};

use nuq_core::{Channel, Current, Flavor};

/// Total and differential neutrino-nucleon cross sections.
///
/// Energies are in GeV; totals are per-nucleon in cm^2, differentials in
/// cm^2/GeV of outgoing neutrino energy.
pub trait CrossSectionSource {
    /// Total cross section at `energy` GeV.
    fn total(&self, energy: f64, flavor: Flavor, channel: Channel, current: Current) -> f64;

    /// Differential cross section `d sigma / d E_out` for an incoming
    /// neutrino of `e_in` GeV producing a secondary at `e_out` GeV.
    fn differential(
        &self,
        e_in: f64,
        e_out: f64,
        flavor: Flavor,
        channel: Channel,
        current: Current,
    ) -> f64;
}

/// Neutrino spectra from tau-lepton decay, per decaying tau.
///
/// Energies are in GeV; spectra are in 1/GeV of neutrino energy.
pub trait TauDecaySource {
    /// Spectrum of tau neutrinos from all decay channels; integrates to one
    /// per decay.
    fn dnde_all(&self, e_tau: f64, e_nu: f64) -> f64;

    /// Spectrum of electron/muon neutrinos from the leptonic channels;
    /// integrates to the per-flavor leptonic branching ratio.
    fn dnde_leptonic(&self, e_tau: f64, e_nu: f64) -> f64;
}

/// Analytic deep-inelastic-scattering parameterization.
///
/// The total cross section grows linearly with energy (the DIS scaling
/// regime) with the usual factor-of-two antineutrino suppression, and the
/// outgoing-energy distribution is flat, so the differential integrates to
/// the total exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisCrossSections {
    /// CC slope for neutrinos, cm^2 per GeV.
    pub cc_slope_nu: f64,
    /// CC slope for antineutrinos, cm^2 per GeV.
    pub cc_slope_nubar: f64,
    /// NC-to-CC ratio.
    pub nc_fraction: f64,
}

impl Default for DisCrossSections {
    fn default() -> Self {
        Self {
            cc_slope_nu: 6.7e-39,
            cc_slope_nubar: 3.4e-39,
            nc_fraction: 0.42,
        }
    }
}

impl CrossSectionSource for DisCrossSections {
    fn total(&self, energy: f64, _flavor: Flavor, channel: Channel, current: Current) -> f64 {
        if energy <= 0.0 {
            return 0.0;
        }
        let slope = match channel {
            Channel::Neutrino => self.cc_slope_nu,
            Channel::Antineutrino => self.cc_slope_nubar,
        };
        let cc = slope * energy;
        match current {
            Current::Cc => cc,
            Current::Nc => self.nc_fraction * cc,
        }
    }

    fn differential(
        &self,
        e_in: f64,
        e_out: f64,
        flavor: Flavor,
        channel: Channel,
        current: Current,
    ) -> f64 {
        if e_in <= 0.0 || e_out < 0.0 || e_out >= e_in {
            return 0.0;
        }
        self.total(e_in, flavor, channel, current) / e_in
    }
}

/// Kinematic fraction carried away below which a two-body channel vanishes.
fn box_spectrum(z: f64, z_max: f64) -> f64 {
    if z >= 0.0 && z < z_max {
        1.0 / z_max
    } else {
        0.0
    }
}

/// Analytic tau-decay neutrino spectra.
///
/// The tau-neutrino spectrum combines the leptonic three-body distribution
/// with flat two-body boxes for the pi, rho and a1 channels plus a quark
/// continuum; the branching ratios sum to one, so the "all" spectrum
/// integrates to one neutrino per decay. The secondary-lepton spectrum uses
/// the standard three-body shape weighted by the per-flavor leptonic
/// branching ratio.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TauDecaySpectra;

impl TauDecaySpectra {
    // branching ratios; leptonic counts both the electron and muon channels
    const BR_LEPTONIC: f64 = 2.0 * nuq_core::consts::TAU_BR_LEPTON;
    const BR_PION: f64 = 0.12;
    const BR_RHO: f64 = 0.26;
    const BR_A1: f64 = 0.15;
    const BR_HADRON: f64 = 1.0 - Self::BR_LEPTONIC - Self::BR_PION - Self::BR_RHO - Self::BR_A1;

    // squared mass ratios m_X^2 / m_tau^2 fixing the two-body endpoints
    const R_PION: f64 = 0.0061;
    const R_RHO: f64 = 0.1906;
    const R_A1: f64 = 0.4793;
    /// Flat endpoint used for the multi-hadron continuum.
    const Z_HADRON: f64 = 0.3;

    /// Tau-neutrino energy-fraction distribution from the leptonic channels;
    /// integrates to one over z in [0, 1].
    fn lepton_primary(z: f64) -> f64 {
        if !(0.0..=1.0).contains(&z) {
            return 0.0;
        }
        5.0 / 3.0 - 3.0 * z * z + 4.0 / 3.0 * z * z * z
    }

    /// Secondary electron/muon neutrino distribution; integrates to one.
    fn lepton_secondary(z: f64) -> f64 {
        if !(0.0..=1.0).contains(&z) {
            return 0.0;
        }
        12.0 * z * z * (1.0 - z)
    }
}

impl TauDecaySource for TauDecaySpectra {
    fn dnde_all(&self, e_tau: f64, e_nu: f64) -> f64 {
        if e_tau <= 0.0 || e_nu < 0.0 || e_nu >= e_tau {
            return 0.0;
        }
        let z = e_nu / e_tau;
        let shape = Self::BR_LEPTONIC * Self::lepton_primary(z)
            + Self::BR_PION * box_spectrum(z, 1.0 - Self::R_PION)
            + Self::BR_RHO * box_spectrum(z, 1.0 - Self::R_RHO)
            + Self::BR_A1 * box_spectrum(z, 1.0 - Self::R_A1)
            + Self::BR_HADRON * box_spectrum(z, Self::Z_HADRON);
        shape / e_tau
    }

    fn dnde_leptonic(&self, e_tau: f64, e_nu: f64) -> f64 {
        if e_tau <= 0.0 || e_nu < 0.0 || e_nu >= e_tau {
            return 0.0;
        }
        let z = e_nu / e_tau;
        nuq_core::consts::TAU_BR_LEPTON * Self::lepton_secondary(z) / e_tau
    }
}
