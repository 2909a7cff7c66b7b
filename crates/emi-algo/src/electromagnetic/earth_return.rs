//! Series impedance terms with earth return.
//!
//! Two closed forms are provided. Both take signed heights, so a buried
//! conductor is handled by the same expression as an overhead one.
//!
//! # Carson-Clem
//!
//! The earth is replaced by a single return conductor at the equivalent depth
//! `D_e = 658.87·√(ρ/f)` m carrying resistance `R_e = π²·f·10⁻⁴` Ω/km:
//!
//! ```text
//! Z_ii = r_i + R_e + j·X·ln(D_e / GMR_i)
//! Z_ij =       R_e + j·X·ln(D_e / d_ij)          X = ω·μ₀/2π (per km)
//! ```
//!
//! The result does not depend on conductor height. This is the default and
//! what the regression values are computed with.
//!
//! # Complex depth
//!
//! The ground plane is moved to the complex penetration depth
//! `p = √(ρ / jωμ₀)` and the image method is applied there:
//!
//! ```text
//! Z_ii = r_i + j·X·ln(2(h_i + p) / GMR_i)
//! Z_ij =       j·X·ln(√(Δx² + (h_i + h_j + 2p)²) / d_ij)
//! ```
//!
//! # References
//!
//! - J. R. Carson, "Wave propagation in overhead wires with ground return",
//!   Bell System Technical Journal 5 (1926).
//! - A. Deri et al., "The complex ground return plane", IEEE Trans. PAS-100 (1981).

use emi_core::{SystemParameters, MU_0};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarthReturnModel {
    #[default]
    CarsonClem,
    ComplexDepth,
}

/// Position and resistance of one conductor as seen by the impedance terms.
#[derive(Debug, Clone, Copy)]
pub struct ImpedanceGeometry {
    pub x: f64,
    /// Signed height; negative below ground
    pub h: f64,
    pub gmr: f64,
    pub r: f64,
}

impl EarthReturnModel {
    pub fn self_impedance(&self, params: &SystemParameters, c: &ImpedanceGeometry) -> Complex64 {
        let x_const = params.reactance_constant();
        match self {
            EarthReturnModel::CarsonClem => Complex64::new(
                c.r + params.earth_return_resistance(),
                x_const * (params.earth_return_depth() / c.gmr).ln(),
            ),
            EarthReturnModel::ComplexDepth => {
                let p = complex_depth(params);
                let ratio = (p + c.h) * 2.0 / c.gmr;
                Complex64::new(c.r, 0.0) + Complex64::i() * x_const * ratio.ln()
            }
        }
    }

    pub fn mutual_impedance(
        &self,
        params: &SystemParameters,
        a: &ImpedanceGeometry,
        b: &ImpedanceGeometry,
    ) -> Complex64 {
        let x_const = params.reactance_constant();
        let d = direct_distance(a, b);
        match self {
            EarthReturnModel::CarsonClem => Complex64::new(
                params.earth_return_resistance(),
                x_const * (params.earth_return_depth() / d).ln(),
            ),
            EarthReturnModel::ComplexDepth => {
                let p = complex_depth(params);
                let dx = a.x - b.x;
                let vertical = p * 2.0 + (a.h + b.h);
                let image = (vertical * vertical + dx * dx).sqrt();
                Complex64::i() * x_const * (image / d).ln()
            }
        }
    }
}

/// Complex penetration depth `p = √(ρ / jωμ₀)` in meters.
pub fn complex_depth(params: &SystemParameters) -> Complex64 {
    let jwm = Complex64::new(0.0, params.omega() * MU_0);
    (Complex64::new(params.earth_resistivity.value(), 0.0) / jwm).sqrt()
}

pub(crate) fn direct_distance(a: &ImpedanceGeometry, b: &ImpedanceGeometry) -> f64 {
    (a.x - b.x).hypot(a.h - b.h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SystemParameters {
        SystemParameters::new(50.0, 100.0).unwrap()
    }

    #[test]
    fn carson_clem_self_term() {
        let c = ImpedanceGeometry {
            x: -8.2,
            h: 14.47,
            gmr: 0.0085,
            r: 0.157,
        };
        let z = EarthReturnModel::CarsonClem.self_impedance(&params(), &c);
        // 0.157 + 0.049348 + j·0.0628319·ln(931.77/0.0085)
        assert!((z.re - 0.206_348).abs() < 1e-5);
        assert!((z.im - 0.729_150).abs() < 1e-5);
    }

    #[test]
    fn carson_clem_mutual_is_height_independent() {
        let a = ImpedanceGeometry { x: 0.0, h: 20.0, gmr: 0.01, r: 0.1 };
        let b = ImpedanceGeometry { x: 30.0, h: 20.0, gmr: 0.3, r: 0.01 };
        let b_low = ImpedanceGeometry { x: 30.0 * 0.6, h: 20.0 - 30.0 * 0.8, ..b };
        let model = EarthReturnModel::CarsonClem;
        let z1 = model.mutual_impedance(&params(), &a, &b);
        let z2 = model.mutual_impedance(&params(), &a, &b_low);
        assert!((z1 - z2).norm() < 1e-12);
    }

    #[test]
    fn complex_depth_magnitude() {
        // |p| = √(ρ/ωμ₀), at -45°
        let p = complex_depth(&params());
        let expected = (100.0 / (2.0 * std::f64::consts::PI * 50.0 * MU_0)).sqrt();
        assert!((p.norm() - expected).abs() < 1e-9);
        assert!(p.re > 0.0 && p.im < 0.0);
    }

    #[test]
    fn complex_depth_close_to_carson_clem() {
        let a = ImpedanceGeometry { x: 0.0, h: 15.0, gmr: 0.01, r: 0.1 };
        let b = ImpedanceGeometry { x: 60.0, h: -1.0, gmr: 0.3, r: 0.01 };
        let cc = EarthReturnModel::CarsonClem.mutual_impedance(&params(), &a, &b);
        let cd = EarthReturnModel::ComplexDepth.mutual_impedance(&params(), &a, &b);
        assert!((cc - cd).norm() / cc.norm() < 0.1);
    }
}
