#![deny(missing_docs)]
#![doc = "Core error types, physical constants and index types for the NUQ engine."]

pub mod consts;
pub mod errors;
pub mod params;
pub mod types;

pub use errors::{ErrorInfo, NuqError};
pub use params::OscParams;
pub use types::{BasisMode, Channel, Current, Flavor, ParticleMode, StateBasis};
