//! Kron reduction of earth wires.
//!
//! Earth wires are grounded at every tower, so their voltage per unit length
//! is zero. Partitioning the conductors into kept (p) and eliminated (e) sets:
//!
//! ```text
//! ┌ V_p ┐   ┌ Z_pp  Z_pe ┐ ┌ I_p ┐            V_e = 0
//! │     │ = │            │ │     │     ⇒
//! └ 0   ┘   └ Z_ep  Z_ee ┘ └ I_e ┘     Z_red = Z_pp − Z_pe · Z_ee⁻¹ · Z_ep
//! ```
//!
//! The induced earth-wire currents are thereby folded into the reduced
//! matrix and never appear explicitly.

use emi_core::{ComplexMatrix, Diagnostics, EmiResult, IssueCategory, RealMatrix};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Condition number of `Z_ee` above which a reduction is flagged.
pub const DEFAULT_CONDITION_THRESHOLD: f64 = 1e12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReductionOptions {
    pub condition_threshold: f64,
}

impl Default for ReductionOptions {
    fn default() -> Self {
        Self {
            condition_threshold: DEFAULT_CONDITION_THRESHOLD,
        }
    }
}

/// Result of eliminating a set of conductors.
#[derive(Debug, Clone, Serialize)]
pub struct ReducedSystem {
    pub matrix: ComplexMatrix,
    /// Original conductor index of each reduced row/column
    pub kept: Vec<usize>,
    /// 1-norm condition number of the eliminated block, if any was inverted
    pub condition_number: Option<f64>,
    pub diagnostics: Diagnostics,
}

impl ReducedSystem {
    /// Row of `original` in the reduced matrix.
    pub fn position(&self, original: usize) -> Option<usize> {
        self.kept.iter().position(|&k| k == original)
    }
}

/// `Z_pp − Z_pe · Z_ee⁻¹ · Z_ep` over the given index sets.
///
/// An empty `eliminate` set returns `Z_pp` untouched. A singular `Z_ee` is a
/// [`SingularMatrix`](emi_core::EmiError::SingularMatrix) error; an
/// ill-conditioned one is reported through the returned diagnostics.
pub fn kron_reduce(
    z: &ComplexMatrix,
    keep: &[usize],
    eliminate: &[usize],
    options: &ReductionOptions,
) -> EmiResult<ReducedSystem> {
    let z_pp = z.select(keep, keep);
    let mut diagnostics = Diagnostics::new();

    if eliminate.is_empty() {
        return Ok(ReducedSystem {
            matrix: z_pp,
            kept: keep.to_vec(),
            condition_number: None,
            diagnostics,
        });
    }

    let z_ee = z.select(eliminate, eliminate);
    let z_ee_inv = z_ee.inverse()?;
    let condition = z_ee.norm_one() * z_ee_inv.norm_one();
    check_condition(condition, options, "earth-wire impedance block", &mut diagnostics);

    let z_pe = z.select(keep, eliminate);
    let z_ep = z.select(eliminate, keep);
    let correction = z_pe.mul(&z_ee_inv)?.mul(&z_ep)?;
    let matrix = z_pp.sub(&correction)?;

    debug!(
        kept = keep.len(),
        eliminated = eliminate.len(),
        condition,
        "kron reduction"
    );

    Ok(ReducedSystem {
        matrix,
        kept: keep.to_vec(),
        condition_number: Some(condition),
        diagnostics,
    })
}

/// Same elimination on a real matrix (potential coefficients).
pub fn kron_reduce_real(
    p: &RealMatrix,
    keep: &[usize],
    eliminate: &[usize],
) -> EmiResult<RealMatrix> {
    let p_pp = p.select(keep, keep);
    if eliminate.is_empty() {
        return Ok(p_pp);
    }
    let p_ee_inv = p.select(eliminate, eliminate).inverse()?;
    let correction = p
        .select(keep, eliminate)
        .mul(&p_ee_inv)?
        .mul(&p.select(eliminate, keep))?;
    p_pp.sub(&correction)
}

pub(crate) fn check_condition(
    condition: f64,
    options: &ReductionOptions,
    what: &str,
    diagnostics: &mut Diagnostics,
) {
    if condition > options.condition_threshold {
        let message = format!(
            "{what} is ill-conditioned (condition number {condition:.3e} > {:.1e})",
            options.condition_threshold
        );
        warn!("{}", message);
        diagnostics.warn(IssueCategory::Numerical, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn sample() -> ComplexMatrix {
        ComplexMatrix::from_rows(&[
            vec![c(0.20, 0.80), c(0.05, 0.40), c(0.05, 0.30)],
            vec![c(0.05, 0.40), c(0.25, 0.85), c(0.05, 0.35)],
            vec![c(0.05, 0.30), c(0.05, 0.35), c(0.30, 0.95)],
        ])
        .unwrap()
    }

    #[test]
    fn empty_elimination_is_identity() {
        let z = sample();
        let reduced = kron_reduce(&z, &[0, 1, 2], &[], &ReductionOptions::default()).unwrap();
        assert_eq!(reduced.matrix, z);
        assert!(reduced.condition_number.is_none());
    }

    #[test]
    fn single_elimination_matches_closed_form() {
        let z = sample();
        let reduced = kron_reduce(&z, &[0, 1], &[2], &ReductionOptions::default()).unwrap();
        let expected = z.get(0, 1) - z.get(0, 2) * z.get(2, 1) / z.get(2, 2);
        assert!((reduced.matrix.get(0, 1) - expected).norm() < 1e-14);
        assert_eq!(reduced.position(1), Some(1));
        assert_eq!(reduced.position(2), None);
        assert!(reduced.matrix.is_symmetric(1e-14));
    }

    #[test]
    fn singular_block_fails() {
        let mut rows = sample().to_rows();
        rows[2][2] = c(0.0, 0.0);
        rows[1] = vec![c(0.05, 0.30), c(0.0, 0.0), c(0.0, 0.0)];
        rows[2] = vec![c(0.05, 0.30), c(0.0, 0.0), c(0.0, 0.0)];
        let z = ComplexMatrix::from_rows(&rows).unwrap();
        let err = kron_reduce(&z, &[0], &[1, 2], &ReductionOptions::default());
        assert!(matches!(err, Err(emi_core::EmiError::SingularMatrix(_))));
    }

    #[test]
    fn coincident_earth_wires_fail() {
        // rows 1 and 2 differ only by round-off in the self term
        let mut rows = sample().to_rows();
        rows[1] = vec![c(0.05, 0.40), c(0.25, 0.85), c(0.25, 0.85)];
        rows[2] = vec![c(0.05, 0.40), c(0.25, 0.85), c(0.25, 0.85 + 1e-16)];
        let z = ComplexMatrix::from_rows(&rows).unwrap();
        let err = kron_reduce(&z, &[0], &[1, 2], &ReductionOptions::default());
        assert!(matches!(err, Err(emi_core::EmiError::SingularMatrix(_))));
    }

    #[test]
    fn low_threshold_produces_warning() {
        let options = ReductionOptions {
            condition_threshold: 1.0,
        };
        let reduced = kron_reduce(&sample(), &[0], &[1, 2], &options).unwrap();
        assert_eq!(reduced.diagnostics.warning_count(), 1);
        assert_eq!(reduced.diagnostics.in_category(IssueCategory::Numerical).count(), 1);
    }
}
