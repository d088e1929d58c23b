#![deny(missing_docs)]
#![doc = "Adaptive embedded Runge-Kutta stepper driving the NUQ propagation callbacks."]

//! The stepper owns the path coordinate and the step-size control loop; the
//! physics lives entirely behind the [`System`] trait, which supplies a
//! pre-derive hook (medium position and rate refresh) and the right-hand
//! side. States are opaque vector-space values behind [`StateVector`].
//!
//! The scheme is the classic Runge-Kutta-Fehlberg 4(5) embedded pair with
//! proportional step control.

use serde::{Deserialize, Serialize};

use nuq_core::errors::{ErrorInfo, NuqError};

fn ode_error(code: &str, message: impl Into<String>) -> NuqError {
    NuqError::Ode(ErrorInfo::new(code, message))
}

/// Vector-space operations the stepper needs from a state buffer.
pub trait StateVector: Clone {
    /// Returns a zero state with the same shape as `self`.
    fn zeros_like(&self) -> Self;

    /// Copies `other` into `self` (shapes must match).
    fn assign(&mut self, other: &Self);

    /// In-place `self += a * other`.
    fn scaled_add(&mut self, a: f64, other: &Self);

    /// Largest componentwise ratio `|err| / (abs_tol + rel_tol * |self|)`.
    /// A value of at most one means the step satisfied the tolerances.
    fn error_ratio(&self, err: &Self, abs_tol: f64, rel_tol: f64) -> f64;
}

/// A differential system advanced along the path coordinate.
pub trait System {
    /// State buffer type owned by the caller and advanced by the stepper.
    type State: StateVector;

    /// Invoked once before each right-hand-side evaluation at position `x`;
    /// the system refreshes position-dependent quantities here.
    fn pre_derive(&mut self, x: f64) -> Result<(), NuqError>;

    /// Writes the derivative of `state` at position `x` into `deriv`.
    fn derivative(&self, x: f64, state: &Self::State, deriv: &mut Self::State)
        -> Result<(), NuqError>;
}

/// Tolerances and step-size limits for the adaptive stepper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepperOpts {
    /// Relative error tolerance per step.
    pub rel_tol: f64,
    /// Absolute error tolerance per step, in state-component units.
    pub abs_tol: f64,
    /// Initial step size; also used after a position reset.
    pub h_initial: f64,
    /// Smallest step size before the integration is abandoned.
    pub h_min: f64,
    /// Largest step size the controller may grow to.
    pub h_max: f64,
}

impl Default for StepperOpts {
    fn default() -> Self {
        Self {
            rel_tol: 1.0e-7,
            abs_tol: 1.0e-17,
            h_initial: 1.0e10,
            h_min: 1.0e-2,
            h_max: f64::MAX,
        }
    }
}

/// Counters describing an `advance` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    /// Accepted steps.
    pub accepted: usize,
    /// Rejected (re-tried) steps.
    pub rejected: usize,
    /// Right-hand-side evaluations.
    pub evaluations: usize,
}

// Fehlberg 4(5) tableau.
const C: [f64; 6] = [0.0, 1.0 / 4.0, 3.0 / 8.0, 12.0 / 13.0, 1.0, 1.0 / 2.0];
const A: [[f64; 5]; 5] = [
    [1.0 / 4.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 32.0, 9.0 / 32.0, 0.0, 0.0, 0.0],
    [1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0, 0.0, 0.0],
    [439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0, 0.0],
    [
        -8.0 / 27.0,
        2.0,
        -3544.0 / 2565.0,
        1859.0 / 4104.0,
        -11.0 / 40.0,
    ],
];
const B5: [f64; 6] = [
    16.0 / 135.0,
    0.0,
    6656.0 / 12825.0,
    28561.0 / 56430.0,
    -9.0 / 50.0,
    2.0 / 55.0,
];
const B4: [f64; 6] = [
    25.0 / 216.0,
    0.0,
    1408.0 / 2565.0,
    2197.0 / 4104.0,
    -1.0 / 5.0,
    0.0,
];

/// Adaptive Runge-Kutta-Fehlberg 4(5) stepper.
#[derive(Debug, Clone)]
pub struct Rkf45 {
    opts: StepperOpts,
    x: f64,
    h: f64,
}

impl Rkf45 {
    /// Creates a stepper at position zero.
    pub fn new(opts: StepperOpts) -> Self {
        let h = opts.h_initial;
        Self { opts, x: 0.0, h }
    }

    /// Current path position.
    pub fn position(&self) -> f64 {
        self.x
    }

    /// Resets the path position and the step size.
    pub fn reset_position(&mut self, x: f64) {
        self.x = x;
        self.h = self.opts.h_initial;
    }

    /// Stepper options.
    pub fn opts(&self) -> &StepperOpts {
        &self.opts
    }

    /// Replaces the stepper options, keeping the current position.
    pub fn set_opts(&mut self, opts: StepperOpts) {
        self.h = opts.h_initial.min(self.h.max(opts.h_min));
        self.opts = opts;
    }

    /// Advances `state` from the current position to `target`, invoking the
    /// system's pre-derive hook before every right-hand-side evaluation.
    pub fn advance<S: System>(
        &mut self,
        sys: &mut S,
        state: &mut S::State,
        target: f64,
    ) -> Result<StepStats, NuqError> {
        if !target.is_finite() {
            return Err(ode_error("bad-target", "target position must be finite"));
        }
        if target < self.x {
            return Err(ode_error(
                "backwards",
                format!("target {target} lies behind current position {}", self.x),
            ));
        }
        let mut stats = StepStats::default();
        let mut k: Vec<S::State> = (0..6).map(|_| state.zeros_like()).collect();
        let mut stage = state.zeros_like();
        let mut err = state.zeros_like();

        while self.x < target {
            let mut h = self.h.min(self.opts.h_max).min(target - self.x);
            if h <= 0.0 {
                break;
            }
            loop {
                // six RKF stages
                for s in 0..6 {
                    stage.assign(state);
                    if s > 0 {
                        for (j, kj) in k.iter().enumerate().take(s) {
                            let a = A[s - 1][j];
                            if a != 0.0 {
                                stage.scaled_add(h * a, kj);
                            }
                        }
                    }
                    let xs = self.x + C[s] * h;
                    sys.pre_derive(xs)?;
                    sys.derivative(xs, &stage, &mut k[s])?;
                    stats.evaluations += 1;
                }

                // fifth-order solution and embedded error estimate
                stage.assign(state);
                err = err.zeros_like();
                for (s, ks) in k.iter().enumerate() {
                    if B5[s] != 0.0 {
                        stage.scaled_add(h * B5[s], ks);
                    }
                    let diff = B5[s] - B4[s];
                    if diff != 0.0 {
                        err.scaled_add(h * diff, ks);
                    }
                }

                let ratio = stage.error_ratio(&err, self.opts.abs_tol, self.opts.rel_tol);
                if ratio <= 1.0 {
                    state.assign(&stage);
                    self.x += h;
                    stats.accepted += 1;
                    let grow = if ratio > 0.0 {
                        (0.9 * ratio.powf(-0.2)).clamp(0.2, 5.0)
                    } else {
                        5.0
                    };
                    self.h = (h * grow).clamp(self.opts.h_min, self.opts.h_max);
                    break;
                }

                stats.rejected += 1;
                h *= (0.9 * ratio.powf(-0.25)).clamp(0.1, 0.9);
                if h < self.opts.h_min {
                    return Err(ode_error(
                        "step-underflow",
                        format!("step size fell below h_min at x = {}", self.x),
                    ));
                }
            }
        }
        Ok(stats)
    }
}

impl StateVector for Vec<f64> {
    fn zeros_like(&self) -> Self {
        vec![0.0; self.len()]
    }

    fn assign(&mut self, other: &Self) {
        self.copy_from_slice(other);
    }

    fn scaled_add(&mut self, a: f64, other: &Self) {
        for (lhs, rhs) in self.iter_mut().zip(other) {
            *lhs += a * rhs;
        }
    }

    fn error_ratio(&self, err: &Self, abs_tol: f64, rel_tol: f64) -> f64 {
        let mut worst = 0.0_f64;
        for (value, e) in self.iter().zip(err) {
            let scale = abs_tol + rel_tol * value.abs();
            if scale > 0.0 {
                worst = worst.max(e.abs() / scale);
            }
        }
        worst
    }
}
