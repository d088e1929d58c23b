#![deny(missing_docs)]
#![doc = "Generalized density-matrix and projector algebra for the NUQ engine."]

//! The [`GeneralizedVector`] is the algebraic primitive the propagation core
//! consumes: a Hermitian operator of small fixed dimension, stored as a dense
//! complex matrix in the mass basis. It represents either a projector or a
//! density matrix and supports the four capability operations the evolution
//! equations need: unitary evolution under a diagonal Hamiltonian, inner
//! product, commutator/anticommutator, and linear combination.

use num_complex::Complex64;

use nuq_core::errors::{ErrorInfo, NuqError};
use nuq_core::OscParams;

/// Maximum supported operator dimension (number of neutrino states).
pub const MAX_DIM: usize = 4;

fn algebra_error(code: &str, message: impl Into<String>) -> NuqError {
    NuqError::Algebra(ErrorInfo::new(code, message))
}

fn check_dim(dim: usize) -> Result<(), NuqError> {
    if dim == 0 || dim > MAX_DIM {
        return Err(NuqError::Argument(
            ErrorInfo::new("bad-dim", format!("dimension {dim} outside 1..={MAX_DIM}"))
                .with_hint("NUQ supports at most four neutrino states"),
        ));
    }
    Ok(())
}

type Matrix = [[Complex64; MAX_DIM]; MAX_DIM];

const ZERO_MATRIX: Matrix = [[Complex64::new(0.0, 0.0); MAX_DIM]; MAX_DIM];

fn matmul(dim: usize, a: &Matrix, b: &Matrix) -> Matrix {
    let mut out = ZERO_MATRIX;
    for i in 0..dim {
        for k in 0..dim {
            let aik = a[i][k];
            if aik.norm_sqr() == 0.0 {
                continue;
            }
            for j in 0..dim {
                out[i][j] += aik * b[k][j];
            }
        }
    }
    out
}

fn dagger(dim: usize, a: &Matrix) -> Matrix {
    let mut out = ZERO_MATRIX;
    for i in 0..dim {
        for j in 0..dim {
            out[i][j] = a[j][i].conj();
        }
    }
    out
}

/// Builds the mixing matrix for the supplied parameters as the product of
/// plane rotations taken in reversed pair order, so three states yield the
/// standard R(2,3) * R(1,3; delta) * R(1,2) ordering.
fn mixing_matrix(params: &OscParams) -> Result<Matrix, NuqError> {
    let dim = params.dim();
    check_dim(dim)?;
    let mut u = ZERO_MATRIX;
    for i in 0..dim {
        u[i][i] = Complex64::new(1.0, 0.0);
    }
    let pairs: Vec<(usize, usize)> = params.pairs().collect();
    for &(i, j) in pairs.iter().rev() {
        let theta = params.angle(i, j)?;
        let delta = params.phase(i, j)?;
        let (sin_t, cos_t) = theta.sin_cos();
        let phase = Complex64::from_polar(1.0, -delta);
        let mut rot = ZERO_MATRIX;
        for k in 0..dim {
            rot[k][k] = Complex64::new(1.0, 0.0);
        }
        rot[i][i] = Complex64::new(cos_t, 0.0);
        rot[j][j] = Complex64::new(cos_t, 0.0);
        rot[i][j] = sin_t * phase;
        rot[j][i] = -sin_t * phase.conj();
        u = matmul(dim, &u, &rot);
    }
    Ok(u)
}

/// Hermitian operator of dimension `dim` expressed in the mass basis.
///
/// Values are cheap to clone and all mutating operations preserve
/// Hermiticity by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralizedVector {
    dim: usize,
    data: Matrix,
}

impl GeneralizedVector {
    /// Zero operator of the given dimension.
    pub fn zero(dim: usize) -> Result<Self, NuqError> {
        check_dim(dim)?;
        Ok(Self {
            dim,
            data: ZERO_MATRIX,
        })
    }

    /// Mass-basis projector onto state `k`.
    pub fn projector(dim: usize, k: usize) -> Result<Self, NuqError> {
        check_dim(dim)?;
        if k >= dim {
            return Err(NuqError::Argument(ErrorInfo::new(
                "bad-state",
                format!("projector index {k} out of range for dimension {dim}"),
            )));
        }
        let mut v = Self::zero(dim)?;
        v.data[k][k] = Complex64::new(1.0, 0.0);
        Ok(v)
    }

    /// Mass-basis projector onto state `k` rotated into the flavor basis
    /// defined by `params`.
    pub fn rotated_projector(dim: usize, k: usize, params: &OscParams) -> Result<Self, NuqError> {
        if params.dim() != dim {
            return Err(algebra_error(
                "dim-mismatch",
                format!(
                    "parameter set covers {} states, projector dimension is {dim}",
                    params.dim()
                ),
            ));
        }
        let base = Self::projector(dim, k)?;
        let u = mixing_matrix(params)?;
        let udag = dagger(dim, &u);
        let rotated = matmul(dim, &u, &matmul(dim, &base.data, &udag));
        Ok(Self { dim, data: rotated })
    }

    /// Operator dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    fn check_same_dim(&self, other: &Self) -> Result<(), NuqError> {
        if self.dim != other.dim {
            return Err(algebra_error(
                "dim-mismatch",
                format!("operand dimensions differ: {} vs {}", self.dim, other.dim),
            ));
        }
        Ok(())
    }

    /// Unitarily evolves the operator over a path interval `x` under the
    /// Hamiltonian `h`, which must be diagonal in the storage (mass) basis:
    /// `A -> U A U^dag` with `U = exp(i h x)`.
    ///
    /// This is the interaction-picture rotation used to re-express flavor
    /// projectors at the current path position.
    pub fn evolve(&self, h: &Self, x: f64) -> Result<Self, NuqError> {
        self.check_same_dim(h)?;
        let mut scale = 0.0_f64;
        for k in 0..self.dim {
            scale = scale.max(h.data[k][k].norm());
        }
        for i in 0..self.dim {
            for j in 0..self.dim {
                if i != j && h.data[i][j].norm() > 1e-12 * (1.0 + scale) {
                    return Err(algebra_error(
                        "non-diagonal",
                        "evolution Hamiltonian must be diagonal in the mass basis",
                    ));
                }
            }
        }
        let mut phases = [Complex64::new(1.0, 0.0); MAX_DIM];
        for (k, phase) in phases.iter_mut().enumerate().take(self.dim) {
            *phase = Complex64::from_polar(1.0, h.data[k][k].re * x);
        }
        let mut out = Self::zero(self.dim)?;
        for i in 0..self.dim {
            for j in 0..self.dim {
                out.data[i][j] = phases[i] * self.data[i][j] * phases[j].conj();
            }
        }
        Ok(out)
    }

    /// Real inner product `Tr(A B)` between Hermitian operators; this is the
    /// expectation value of `self` in the state `other`.
    pub fn dot(&self, other: &Self) -> Result<f64, NuqError> {
        self.check_same_dim(other)?;
        let mut acc = Complex64::new(0.0, 0.0);
        for i in 0..self.dim {
            for j in 0..self.dim {
                acc += self.data[i][j] * other.data[j][i];
            }
        }
        Ok(acc.re)
    }

    /// The Hermitian operator `-i [h, rho]`, the coherent-evolution
    /// right-hand-side contribution.
    pub fn commutator_i(h: &Self, rho: &Self) -> Result<Self, NuqError> {
        h.check_same_dim(rho)?;
        let dim = h.dim;
        let hr = matmul(dim, &h.data, &rho.data);
        let rh = matmul(dim, &rho.data, &h.data);
        let mut out = Self::zero(dim)?;
        let minus_i = Complex64::new(0.0, -1.0);
        for i in 0..dim {
            for j in 0..dim {
                out.data[i][j] = minus_i * (hr[i][j] - rh[i][j]);
            }
        }
        Ok(out)
    }

    /// Anticommutator `{a, b}`.
    pub fn anticommutator(a: &Self, b: &Self) -> Result<Self, NuqError> {
        a.check_same_dim(b)?;
        let dim = a.dim;
        let ab = matmul(dim, &a.data, &b.data);
        let ba = matmul(dim, &b.data, &a.data);
        let mut out = Self::zero(dim)?;
        for i in 0..dim {
            for j in 0..dim {
                out.data[i][j] = ab[i][j] + ba[i][j];
            }
        }
        Ok(out)
    }

    /// In-place linear combination `self += a * other`.
    pub fn add_scaled(&mut self, a: f64, other: &Self) -> Result<(), NuqError> {
        self.check_same_dim(other)?;
        for i in 0..self.dim {
            for j in 0..self.dim {
                self.data[i][j] += a * other.data[i][j];
            }
        }
        Ok(())
    }

    /// Infallible `self += a * other` over the full storage block; both
    /// operands must come from the same setup. Unused rows past `dim` stay
    /// zero, so mixing dimensions cannot corrupt the active block.
    pub fn axpy(&mut self, a: f64, other: &Self) {
        for (row, other_row) in self.data.iter_mut().zip(other.data.iter()) {
            for (value, rhs) in row.iter_mut().zip(other_row.iter()) {
                *value += a * rhs;
            }
        }
    }

    /// In-place scalar multiplication.
    pub fn scale(&mut self, a: f64) {
        for row in self.data.iter_mut().take(self.dim) {
            for value in row.iter_mut().take(self.dim) {
                *value *= a;
            }
        }
    }

    /// Trace of the operator (total probability content of a state).
    pub fn trace(&self) -> f64 {
        let mut acc = 0.0;
        for k in 0..self.dim {
            acc += self.data[k][k].re;
        }
        acc
    }

    /// Largest absolute component, used for error-norm scaling.
    pub fn max_abs(&self) -> f64 {
        let mut acc = 0.0_f64;
        for i in 0..self.dim {
            for j in 0..self.dim {
                acc = acc.max(self.data[i][j].re.abs());
                acc = acc.max(self.data[i][j].im.abs());
            }
        }
        acc
    }

    /// Canonical real-component encoding: the `dim` diagonal entries followed
    /// by `(re, im)` of each upper-triangle entry in row-major pair order.
    /// Always `dim * dim` values; round trips exactly through
    /// [`GeneralizedVector::from_components`].
    pub fn components(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.dim * self.dim);
        for k in 0..self.dim {
            out.push(self.data[k][k].re);
        }
        for i in 0..self.dim {
            for j in i + 1..self.dim {
                out.push(self.data[i][j].re);
                out.push(self.data[i][j].im);
            }
        }
        out
    }

    /// Rebuilds an operator from its canonical component encoding.
    pub fn from_components(dim: usize, components: &[f64]) -> Result<Self, NuqError> {
        check_dim(dim)?;
        if components.len() != dim * dim {
            return Err(NuqError::Argument(ErrorInfo::new(
                "bad-shape",
                format!(
                    "expected {} components for dimension {dim}, got {}",
                    dim * dim,
                    components.len()
                ),
            )));
        }
        let mut v = Self::zero(dim)?;
        for k in 0..dim {
            v.data[k][k] = Complex64::new(components[k], 0.0);
        }
        let mut cursor = dim;
        for i in 0..dim {
            for j in i + 1..dim {
                let re = components[cursor];
                let im = components[cursor + 1];
                cursor += 2;
                v.data[i][j] = Complex64::new(re, im);
                v.data[j][i] = Complex64::new(re, -im);
            }
        }
        Ok(v)
    }

    /// Applies a componentwise visitor; used by the stepper error norm.
    pub fn for_each_component(&self, mut f: impl FnMut(f64)) {
        for i in 0..self.dim {
            for j in 0..self.dim {
                f(self.data[i][j].re);
                f(self.data[i][j].im);
            }
        }
    }
}
