//! Natural-unit system and physical constants.
//!
//! All internal quantities are expressed in natural units with eV = 1.
//! Lengths and times carry units of 1/eV; densities supplied by media are in
//! g/cm^3 and converted at the point of use.

/// Electron-volt, the base energy unit.
pub const EV: f64 = 1.0;
/// Mega-electron-volt.
pub const MEV: f64 = 1.0e6;
/// Giga-electron-volt.
pub const GEV: f64 = 1.0e9;

/// One meter in 1/eV.
pub const METER: f64 = 5.06773093741e6;
/// One centimeter in 1/eV.
pub const CM: f64 = 1.0e-2 * METER;
/// One kilometer in 1/eV.
pub const KM: f64 = 1.0e3 * METER;

/// One second in 1/eV.
pub const SEC: f64 = 1.523e15;

/// One gram in eV.
pub const GRAM: f64 = 5.62e32;

/// Fermi constant in 1/eV^2.
pub const GF: f64 = 1.16639e-23;
/// Avogadro number.
pub const NA: f64 = 6.0221415e23;
/// Square root of two.
pub const SQRT2: f64 = std::f64::consts::SQRT_2;

/// Proton mass in eV.
pub const PROTON_MASS: f64 = 938.272e6;
/// Neutron mass in eV.
pub const NEUTRON_MASS: f64 = 939.565e6;
/// Tau lepton mass in eV.
pub const TAU_MASS: f64 = 1776.82e6;
/// Tau rest-frame lifetime in 1/eV.
pub const TAU_LIFETIME: f64 = 2.906e-13 * SEC;
/// Branching ratio of the tau into a single charged-lepton channel.
pub const TAU_BR_LEPTON: f64 = 0.14;

/// Default path-length scale for discrete tau-regeneration checkpoints.
pub const DEFAULT_TAU_REG_SCALE: f64 = 300.0 * KM;
/// Default path-length scale for positivity-correction checkpoints.
pub const DEFAULT_POSITIVITY_SCALE: f64 = 300.0 * KM;
