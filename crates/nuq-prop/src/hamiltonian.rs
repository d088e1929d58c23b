//! Free Hamiltonian per energy node and the matter potential assembly.

use nuq_algebra::GeneralizedVector;
use nuq_core::consts::{CM, GF, NA, SQRT2};
use nuq_core::errors::NuqError;
use nuq_core::params::OscParams;
use nuq_core::types::{BasisMode, Channel};

use crate::grid::EnergyGrid;
use crate::projectors::ProjectorSet;

/// Vacuum Hamiltonian family: one diagonal operator per energy node.
///
/// `H0(E) = sum_i P_i * dm2_i1 / (2 E)` in the mass basis, so every node
/// Hamiltonian is diagonal and the interaction-picture rotation stays exact.
#[derive(Debug, Clone)]
pub struct Hamiltonian {
    dm2: GeneralizedVector,
    h0: Vec<GeneralizedVector>,
}

impl Hamiltonian {
    /// Builds the per-node vacuum Hamiltonians from the mass splittings and
    /// the energy grid.
    pub fn new(params: &OscParams, grid: &EnergyGrid) -> Result<Self, NuqError> {
        let dim = params.dim();
        let mut dm2 = GeneralizedVector::zero(dim)?;
        for i in 1..dim {
            let p = GeneralizedVector::projector(dim, i)?;
            dm2.add_scaled(params.splitting(i)?, &p)?;
        }
        let h0 = grid
            .energies()
            .iter()
            .map(|&e| {
                let mut h = dm2.clone();
                h.scale(0.5 / e);
                h
            })
            .collect();
        Ok(Self { dm2, h0 })
    }

    /// Mass-splitting operator `sum_i P_i * dm2_i1`.
    pub fn dm2(&self) -> &GeneralizedVector {
        &self.dm2
    }

    /// Vacuum Hamiltonians, one per energy node.
    pub fn h0(&self) -> &[GeneralizedVector] {
        &self.h0
    }

    /// Vacuum Hamiltonian of node `e`.
    pub fn h0_at(&self, e: usize) -> &GeneralizedVector {
        &self.h0[e]
    }
}

/// Charged- and neutral-current matter potentials in natural units (eV) for
/// a medium of density `density` (g/cm^3) and electron fraction `ye`.
///
/// An effectively electron-free medium takes the all-neutron limit for the
/// neutral-current term.
pub fn matter_potentials(density: f64, ye: f64) -> (f64, f64) {
    let prefactor = SQRT2 * GF * NA / (CM * CM * CM) * density;
    let cc = prefactor * ye;
    let nc = if ye < 1.0e-10 {
        prefactor
    } else {
        cc * (-0.5 * (1.0 - ye) / ye)
    };
    (cc, nc)
}

/// Assembles the full interaction Hamiltonian for channel slot `slot` at
/// energy node `e`, using the current evolved flavor projectors.
///
/// In the mass working basis the vacuum term is added explicitly; the whole
/// potential flips sign for the antineutrino channel.
pub fn interaction_hamiltonian(
    projectors: &ProjectorSet,
    h0: &Hamiltonian,
    basis: BasisMode,
    slot: usize,
    channel: Channel,
    e: usize,
    density: f64,
    ye: f64,
) -> Result<GeneralizedVector, NuqError> {
    let (cc, nc) = matter_potentials(density, ye);
    let dim = projectors.dim();
    let mut potential = GeneralizedVector::zero(dim)?;
    potential.add_scaled(cc + nc, projectors.evolved(slot, 0, e))?;
    if dim > 1 {
        potential.add_scaled(nc, projectors.evolved(slot, 1, e))?;
    }
    if dim > 2 {
        potential.add_scaled(nc, projectors.evolved(slot, 2, e))?;
    }
    if basis == BasisMode::Mass {
        potential.add_scaled(1.0, h0.h0_at(e))?;
    }
    if channel == Channel::Antineutrino {
        potential.scale(-1.0);
    }
    Ok(potential)
}
