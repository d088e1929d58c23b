#![deny(missing_docs)]
#![doc = "Neutrino state propagation engine for the NUQ toolkit."]

//! Ties the NUQ crates together: density matrices over an energy grid are
//! pushed through a medium by an adaptive stepper, with coherent oscillation,
//! non-coherent interactions, tau regeneration and a periodic positivity
//! correction. Finished or intermediate runs can be persisted as snapshots
//! and resumed.

pub mod driver;
pub mod grid;
pub mod hamiltonian;
pub mod interactions;
pub mod projectors;
pub mod snapshot;
pub mod state;

pub use driver::Propagator;
pub use grid::EnergyGrid;
pub use interactions::{InteractionTensors, RenormalizePolicy};
pub use snapshot::{from_json, restore, snapshot, to_json, StateSnapshot, FORMAT_VERSION};
pub use state::PropState;
