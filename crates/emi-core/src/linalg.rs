//! Dense matrices for multi-conductor line calculations.
//!
//! Conductor systems are small (a double-circuit tower with two earth wires
//! and a pipeline is nine conductors), so both matrix types are plain
//! row-major `Vec` storage. Element (i, j) is at index `i * cols + j`.
//!
//! - [`ComplexMatrix`] holds series impedances (Ω/km) and Kron-reduced forms.
//! - [`RealMatrix`] holds potential coefficients (km/μF) and capacitances.
//!
//! Both invert through `faer`'s partial-pivot LU. An inverse whose 1-norm
//! condition number exceeds [`SINGULAR_CONDITION`] is rejected as singular.
//!
//! Matrices are never mutated once a builder returns them; reduction and
//! inversion produce new values.

use faer::complex_native::c64;
use faer::{prelude::*, Mat};
use num_complex::Complex64;
use serde::Serialize;

use crate::error::{EmiError, EmiResult};

/// 1-norm condition number above which an inverse is treated as singular.
pub const SINGULAR_CONDITION: f64 = 1e15;

fn not_square(rows: usize, cols: usize) -> EmiError {
    EmiError::Other(format!("cannot invert a {rows}x{cols} matrix"))
}

/// Rejects an inverse that is non-finite or too badly conditioned to trust.
fn check_inverse(n: usize, norm: f64, inverse_norm: f64) -> EmiResult<()> {
    let condition = norm * inverse_norm;
    if norm == 0.0 || !condition.is_finite() {
        return Err(EmiError::singular(format!("{n}x{n} matrix has no inverse")));
    }
    if condition > SINGULAR_CONDITION {
        return Err(EmiError::singular(format!(
            "{n}x{n} matrix is numerically singular (condition number {condition:.3e})"
        )));
    }
    Ok(())
}

// =============================================================================
// Complex matrices
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Complex64>,
}

impl ComplexMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Complex64::new(0.0, 0.0); rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| {
            if i == j {
                Complex64::new(1.0, 0.0)
            } else {
                Complex64::new(0.0, 0.0)
            }
        })
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> Complex64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// Build from nested rows; every row must have the same length.
    pub fn from_rows(rows: &[Vec<Complex64>]) -> EmiResult<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(EmiError::Other("ragged matrix rows".into()));
        }
        Ok(Self::from_fn(rows.len(), cols, |i, j| rows[i][j]))
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn get_mut(&mut self, row: usize, col: usize) -> &mut Complex64 {
        &mut self.data[row * self.cols + col]
    }

    /// (rows, cols)
    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn row(&self, row: usize) -> &[Complex64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn to_rows(&self) -> Vec<Vec<Complex64>> {
        (0..self.rows).map(|i| self.row(i).to_vec()).collect()
    }

    /// Submatrix picking the given rows and columns, in the given order.
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Self {
        Self::from_fn(rows.len(), cols.len(), |i, j| self.get(rows[i], cols[j]))
    }

    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self.get(j, i))
    }

    pub fn scale(&self, factor: Complex64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    pub fn mul(&self, rhs: &ComplexMatrix) -> EmiResult<Self> {
        if self.cols != rhs.rows {
            return Err(EmiError::Other(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )));
        }
        Ok(Self::from_fn(self.rows, rhs.cols, |i, j| {
            (0..self.cols).map(|k| self.get(i, k) * rhs.get(k, j)).sum()
        }))
    }

    pub fn sub(&self, rhs: &ComplexMatrix) -> EmiResult<Self> {
        if self.dim() != rhs.dim() {
            return Err(EmiError::Other(format!(
                "cannot subtract {}x{} and {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )));
        }
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&rhs.data).map(|(a, b)| a - b).collect(),
        })
    }

    /// Maximum absolute column sum.
    pub fn norm_one(&self) -> f64 {
        (0..self.cols)
            .map(|j| (0..self.rows).map(|i| self.get(i, j).norm()).sum::<f64>())
            .fold(0.0, f64::max)
    }

    pub fn is_symmetric(&self, tol: f64) -> bool {
        self.is_square()
            && (0..self.rows).all(|i| {
                (i + 1..self.cols).all(|j| (self.get(i, j) - self.get(j, i)).norm() <= tol)
            })
    }

    /// Inverse by partial-pivot LU (`A X = I`).
    pub fn inverse(&self) -> EmiResult<Self> {
        if !self.is_square() {
            return Err(not_square(self.rows, self.cols));
        }
        let n = self.rows;
        if n == 0 {
            return Ok(self.clone());
        }

        let a = Mat::from_fn(n, n, |i, j| {
            let v = self.get(i, j);
            c64::new(v.re, v.im)
        });
        let identity = Mat::from_fn(n, n, |i, j| {
            if i == j {
                c64::new(1.0, 0.0)
            } else {
                c64::new(0.0, 0.0)
            }
        });
        let x = a.partial_piv_lu().solve(identity.as_ref());

        let inv = Self::from_fn(n, n, |i, j| {
            let v = x.read(i, j);
            Complex64::new(v.re, v.im)
        });
        check_inverse(n, self.norm_one(), inv.norm_one())?;
        Ok(inv)
    }

    /// 1-norm condition number ‖A‖₁·‖A⁻¹‖₁.
    pub fn condition_number(&self) -> EmiResult<f64> {
        Ok(self.norm_one() * self.inverse()?.norm_one())
    }
}

// =============================================================================
// Real matrices
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl RealMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows)
            .map(|i| self.data[i * self.cols..(i + 1) * self.cols].to_vec())
            .collect()
    }

    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Self {
        Self::from_fn(rows.len(), cols.len(), |i, j| self.get(rows[i], cols[j]))
    }

    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self.get(j, i))
    }

    pub fn mul(&self, rhs: &RealMatrix) -> EmiResult<Self> {
        if self.cols != rhs.rows {
            return Err(EmiError::Other(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )));
        }
        Ok(Self::from_fn(self.rows, rhs.cols, |i, j| {
            (0..self.cols).map(|k| self.get(i, k) * rhs.get(k, j)).sum()
        }))
    }

    pub fn sub(&self, rhs: &RealMatrix) -> EmiResult<Self> {
        if self.dim() != rhs.dim() {
            return Err(EmiError::Other(format!(
                "cannot subtract {}x{} and {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )));
        }
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&rhs.data).map(|(a, b)| a - b).collect(),
        })
    }

    pub fn norm_one(&self) -> f64 {
        (0..self.cols)
            .map(|j| (0..self.rows).map(|i| self.get(i, j).abs()).sum::<f64>())
            .fold(0.0, f64::max)
    }

    pub fn is_symmetric(&self, tol: f64) -> bool {
        self.is_square()
            && (0..self.rows)
                .all(|i| (i + 1..self.cols).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tol))
    }

    /// Inverse by partial-pivot LU (`P C = I`).
    pub fn inverse(&self) -> EmiResult<Self> {
        if !self.is_square() {
            return Err(not_square(self.rows, self.cols));
        }
        let n = self.rows;
        if n == 0 {
            return Ok(self.clone());
        }

        let a = Mat::<f64>::from_fn(n, n, |i, j| self.get(i, j));
        let identity = Mat::<f64>::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 });
        let x = a.partial_piv_lu().solve(identity.as_ref());

        let inv = Self::from_fn(n, n, |i, j| x.read(i, j));
        check_inverse(n, self.norm_one(), inv.norm_one())?;
        Ok(inv)
    }

    pub fn condition_number(&self) -> EmiResult<f64> {
        Ok(self.norm_one() * self.inverse()?.norm_one())
    }
}
