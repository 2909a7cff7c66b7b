//! Maxwell potential coefficients by the method of images.
//!
//! ```text
//! P_ii = K·ln(2|h_i| / r_i)
//! P_ij = K·ln(D_ij / d_ij),   D_ij = √(Δx² + (h_i + h_j)²)
//!                              d_ij = √(Δx² + (h_i − h_j)²)
//! K = 1/(2π ε₀) · 10⁻⁹  (km/μF)
//! ```
//!
//! Heights are signed. A buried conductor paired with an overhead one gives
//! `D_ij < d_ij` and therefore a negative mutual coefficient.

use emi_core::{EmiError, EmiResult, RealMatrix, EPSILON_0};

/// `1/(2π ε₀)` converted to km/μF.
pub fn potential_constant() -> f64 {
    1.0 / (2.0 * std::f64::consts::PI * EPSILON_0) * 1e-9
}

#[derive(Debug, Clone, Copy)]
pub struct PotentialGeometry {
    pub x: f64,
    pub h: f64,
    pub radius: f64,
}

pub fn potential_matrix(conductors: &[PotentialGeometry]) -> EmiResult<RealMatrix> {
    let k = potential_constant();
    for (i, c) in conductors.iter().enumerate() {
        if 2.0 * c.h.abs() <= c.radius {
            return Err(EmiError::physical_range(format!(
                "conductor {i} at height {:.3} m touches its own image (radius {:.4} m)",
                c.h, c.radius
            )));
        }
    }

    Ok(RealMatrix::from_fn(conductors.len(), conductors.len(), |i, j| {
        let a = &conductors[i];
        if i == j {
            return k * (2.0 * a.h.abs() / a.radius).ln();
        }
        let b = &conductors[j];
        let dx = a.x - b.x;
        let image = dx.hypot(a.h + b.h);
        let direct = dx.hypot(a.h - b.h);
        k * (image / direct).ln()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_coefficient_for_top_phase() {
        let p = potential_matrix(&[PotentialGeometry {
            x: -1.0,
            h: 32.2645,
            radius: 0.2243,
        }])
        .unwrap();
        assert!((p.get(0, 0) - 101.773).abs() < 1e-3);
    }

    #[test]
    fn buried_mutual_is_negative() {
        let p = potential_matrix(&[
            PotentialGeometry { x: 0.0, h: 20.0, radius: 0.01 },
            PotentialGeometry { x: 50.0, h: -1.0, radius: 0.3 },
        ])
        .unwrap();
        assert!(p.get(0, 1) < 0.0);
        assert!(p.is_symmetric(1e-12));
    }

    #[test]
    fn conductor_on_ground_rejected() {
        let err = potential_matrix(&[PotentialGeometry { x: 0.0, h: 0.0, radius: 0.01 }]);
        assert!(matches!(err, Err(EmiError::PhysicalRange(_))));
    }
}
