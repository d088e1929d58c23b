#![deny(missing_docs)]
#![doc = "Medium (body) and trajectory (track) models for the NUQ engine."]

//! A [`Body`] answers density and electron-fraction queries as a function of
//! the position carried by a [`Track`]; the propagation core owns one of each
//! for the duration of a run. Bodies expose a numeric tag and an opaque
//! parameter vector so snapshots can rebuild them.

use serde::{Deserialize, Serialize};

use nuq_core::errors::{ErrorInfo, NuqError};

fn media_error(code: &str, message: impl Into<String>) -> NuqError {
    NuqError::Media(ErrorInfo::new(code, message))
}

/// Path-coordinate handle: where a trajectory starts and ends, and where the
/// propagation currently sits. Positions are in natural units (1/eV).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    x_initial: f64,
    x_final: f64,
    x_current: f64,
}

impl Track {
    /// Creates a track spanning `[x_initial, x_final]`, positioned at its
    /// start.
    pub fn new(x_initial: f64, x_final: f64) -> Result<Self, NuqError> {
        if !(x_initial.is_finite() && x_final.is_finite()) || x_final < x_initial {
            return Err(media_error(
                "bad-span",
                format!("invalid track span [{x_initial}, {x_final}]"),
            ));
        }
        Ok(Self {
            x_initial,
            x_final,
            x_current: x_initial,
        })
    }

    /// Start of the trajectory.
    pub fn initial_position(&self) -> f64 {
        self.x_initial
    }

    /// End of the trajectory.
    pub fn final_position(&self) -> f64 {
        self.x_final
    }

    /// Current position along the trajectory.
    pub fn position(&self) -> f64 {
        self.x_current
    }

    /// Total trajectory length.
    pub fn length(&self) -> f64 {
        self.x_final - self.x_initial
    }

    /// Moves the current position; clamps into the span rather than failing,
    /// since adaptive steppers probe marginally past interval ends.
    pub fn set_position(&mut self, x: f64) {
        self.x_current = x.clamp(self.x_initial, self.x_final);
    }

    /// Rewinds the current position to the trajectory start.
    pub fn rewind(&mut self) {
        self.x_current = self.x_initial;
    }

    /// Parameter vector persisted in snapshots.
    pub fn params(&self) -> Vec<f64> {
        vec![self.x_initial, self.x_final]
    }
}

/// A medium description: density and electron fraction along a track.
pub trait Body {
    /// Matter density in g/cm^3 at the track's current position.
    fn density(&self, track: &Track) -> f64;

    /// Electron fraction (electrons per nucleon) at the track's current
    /// position.
    fn electron_fraction(&self, track: &Track) -> f64;

    /// Human readable body name.
    fn name(&self) -> &'static str;

    /// Numeric tag identifying the body type in snapshots.
    fn tag(&self) -> u32;

    /// Opaque parameter vector persisted in snapshots.
    fn params(&self) -> Vec<f64>;
}

/// Empty space: zero density, unit electron fraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vacuum;

impl Body for Vacuum {
    fn density(&self, _track: &Track) -> f64 {
        0.0
    }

    fn electron_fraction(&self, _track: &Track) -> f64 {
        1.0
    }

    fn name(&self) -> &'static str {
        "vacuum"
    }

    fn tag(&self) -> u32 {
        1
    }

    fn params(&self) -> Vec<f64> {
        Vec::new()
    }
}

/// Homogeneous slab of matter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantDensity {
    /// Density in g/cm^3.
    pub density: f64,
    /// Electron fraction.
    pub ye: f64,
}

impl ConstantDensity {
    /// Creates a homogeneous medium.
    pub fn new(density: f64, ye: f64) -> Result<Self, NuqError> {
        if density < 0.0 || !(0.0..=1.0).contains(&ye) {
            return Err(media_error(
                "bad-medium",
                format!("invalid constant medium: density {density}, ye {ye}"),
            ));
        }
        Ok(Self { density, ye })
    }
}

impl Body for ConstantDensity {
    fn density(&self, _track: &Track) -> f64 {
        self.density
    }

    fn electron_fraction(&self, _track: &Track) -> f64 {
        self.ye
    }

    fn name(&self) -> &'static str {
        "constant-density"
    }

    fn tag(&self) -> u32 {
        2
    }

    fn params(&self) -> Vec<f64> {
        vec![self.density, self.ye]
    }
}

/// Piecewise-linear density and electron-fraction profile along the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDensity {
    positions: Vec<f64>,
    densities: Vec<f64>,
    fractions: Vec<f64>,
}

impl VariableDensity {
    /// Creates a profile from matching position/density/fraction samples.
    /// Positions must be strictly increasing.
    pub fn new(
        positions: Vec<f64>,
        densities: Vec<f64>,
        fractions: Vec<f64>,
    ) -> Result<Self, NuqError> {
        if positions.len() < 2 {
            return Err(media_error(
                "too-few-samples",
                "variable density profile needs at least two samples",
            ));
        }
        if positions.len() != densities.len() || positions.len() != fractions.len() {
            return Err(media_error(
                "shape-mismatch",
                format!(
                    "sample arrays disagree: {} positions, {} densities, {} fractions",
                    positions.len(),
                    densities.len(),
                    fractions.len()
                ),
            ));
        }
        if positions.windows(2).any(|w| w[1] <= w[0]) {
            return Err(media_error(
                "not-increasing",
                "profile positions must be strictly increasing",
            ));
        }
        Ok(Self {
            positions,
            densities,
            fractions,
        })
    }

    fn interpolate(&self, samples: &[f64], x: f64) -> f64 {
        let n = self.positions.len();
        if x <= self.positions[0] {
            return samples[0];
        }
        if x >= self.positions[n - 1] {
            return samples[n - 1];
        }
        let idx = match self
            .positions
            .binary_search_by(|p| p.total_cmp(&x))
        {
            Ok(i) => return samples[i],
            Err(i) => i - 1,
        };
        let x0 = self.positions[idx];
        let x1 = self.positions[idx + 1];
        let t = (x - x0) / (x1 - x0);
        samples[idx] * (1.0 - t) + samples[idx + 1] * t
    }
}

impl Body for VariableDensity {
    fn density(&self, track: &Track) -> f64 {
        self.interpolate(&self.densities, track.position())
    }

    fn electron_fraction(&self, track: &Track) -> f64 {
        self.interpolate(&self.fractions, track.position())
    }

    fn name(&self) -> &'static str {
        "variable-density"
    }

    fn tag(&self) -> u32 {
        3
    }

    fn params(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(3 * self.positions.len());
        out.extend_from_slice(&self.positions);
        out.extend_from_slice(&self.densities);
        out.extend_from_slice(&self.fractions);
        out
    }
}

/// Rebuilds a body and track pair from the snapshot tag and parameter
/// vectors.
pub fn rebuild_body_track(
    tag: u32,
    body_params: &[f64],
    track_params: &[f64],
) -> Result<(Box<dyn Body>, Track), NuqError> {
    if track_params.len() != 2 {
        return Err(media_error(
            "bad-track-params",
            format!("expected 2 track parameters, got {}", track_params.len()),
        ));
    }
    let track = Track::new(track_params[0], track_params[1])?;
    let body: Box<dyn Body> = match tag {
        1 => Box::new(Vacuum),
        2 => {
            if body_params.len() != 2 {
                return Err(media_error(
                    "bad-body-params",
                    format!(
                        "constant-density body expects 2 parameters, got {}",
                        body_params.len()
                    ),
                ));
            }
            Box::new(ConstantDensity::new(body_params[0], body_params[1])?)
        }
        3 => {
            if body_params.len() % 3 != 0 || body_params.is_empty() {
                return Err(media_error(
                    "bad-body-params",
                    format!(
                        "variable-density body expects 3n parameters, got {}",
                        body_params.len()
                    ),
                ));
            }
            let n = body_params.len() / 3;
            Box::new(VariableDensity::new(
                body_params[..n].to_vec(),
                body_params[n..2 * n].to_vec(),
                body_params[2 * n..].to_vec(),
            )?)
        }
        other => {
            return Err(media_error(
                "unknown-body",
                format!("unknown body tag {other}"),
            ))
        }
    };
    Ok((body, track))
}
