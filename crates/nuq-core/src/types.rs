//! Index and mode enumerations shared across the NUQ crates.

use serde::{Deserialize, Serialize};

/// Neutrino flavor index. The first three map onto the active flavors;
/// higher indices label sterile extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Flavor {
    /// Electron-type.
    Electron,
    /// Muon-type.
    Muon,
    /// Tau-type.
    Tau,
    /// Sterile flavor with explicit index (3-based).
    Sterile(u8),
}

impl Flavor {
    /// Returns the zero-based flavor index.
    pub fn index(&self) -> usize {
        match self {
            Flavor::Electron => 0,
            Flavor::Muon => 1,
            Flavor::Tau => 2,
            Flavor::Sterile(n) => *n as usize,
        }
    }

    /// Builds a flavor from a zero-based index.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Flavor::Electron,
            1 => Flavor::Muon,
            2 => Flavor::Tau,
            n => Flavor::Sterile(n as u8),
        }
    }

    /// Stable label used in diagnostics and snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::Electron => "electron",
            Flavor::Muon => "muon",
            Flavor::Tau => "tau",
            Flavor::Sterile(_) => "sterile",
        }
    }
}

/// Particle/antiparticle channel index within the evolved state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Neutrino channel.
    Neutrino,
    /// Antineutrino channel.
    Antineutrino,
}

impl Channel {
    /// Returns the zero-based channel index within a dual-channel state.
    pub fn index(&self) -> usize {
        match self {
            Channel::Neutrino => 0,
            Channel::Antineutrino => 1,
        }
    }

    /// Returns the opposite-sign channel.
    pub fn conjugate(&self) -> Self {
        match self {
            Channel::Neutrino => Channel::Antineutrino,
            Channel::Antineutrino => Channel::Neutrino,
        }
    }
}

/// Which particle-type channels the propagator tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleMode {
    /// Only the neutrino channel is evolved.
    Neutrino,
    /// Only the antineutrino channel is evolved.
    Antineutrino,
    /// Both channels are evolved in parallel (required for tau regeneration).
    Both,
}

impl ParticleMode {
    /// Number of parallel density-matrix channels in this mode.
    pub fn channel_count(&self) -> usize {
        match self {
            ParticleMode::Neutrino | ParticleMode::Antineutrino => 1,
            ParticleMode::Both => 2,
        }
    }

    /// Maps a channel slot index onto the physical channel it carries.
    pub fn channel_at(&self, slot: usize) -> Option<Channel> {
        match (self, slot) {
            (ParticleMode::Neutrino, 0) => Some(Channel::Neutrino),
            (ParticleMode::Antineutrino, 0) => Some(Channel::Antineutrino),
            (ParticleMode::Both, 0) => Some(Channel::Neutrino),
            (ParticleMode::Both, 1) => Some(Channel::Antineutrino),
            _ => None,
        }
    }
}

/// Working basis in which the state is propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasisMode {
    /// Mass (free-Hamiltonian) basis; the vacuum term is carried explicitly.
    Mass,
    /// Interaction picture; the vacuum term is folded into evolving projectors.
    Interaction,
}

/// Basis in which initial states are supplied and observables evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateBasis {
    /// Weak-interaction eigenstates.
    Flavor,
    /// Free-Hamiltonian eigenstates.
    Mass,
}

/// Weak-interaction current type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Current {
    /// Charged current.
    Cc,
    /// Neutral current.
    Nc,
}
