//! Distributed electrical parameters of a coated steel pipeline.
//!
//! # Series impedance (Ω/km)
//!
//! Internal impedance of the steel wall, taken as a plane conductor of
//! thickness `t` rolled to the outer circumference, plus the same Carson-Clem
//! earth-return term the conductor matrices use:
//!
//! ```text
//! k      = √(j·ω·μ_r·μ₀ / ρ_s)                      (1/m)
//! z_int  = ρ_s·k / (2π·r_o) · coth(k·t)
//! z_ext  = R_e + j·X·ln(D_e / r_o)
//! z      = z_int + z_ext
//! ```
//!
//! For thick walls `coth(k·t) → 1` and `z_int` reduces to the classical skin
//! effect surface impedance; for thin walls it tends to the DC resistance.
//!
//! # Shunt admittance (S/km)
//!
//! Coating leakage conductance in parallel with the coating capacitance:
//!
//! ```text
//! G = 2π·r_o / (ρ_c·t_c)
//! B = 2π·ω·ε_r·ε₀·r_o / t_c
//! ```
//!
//! # Propagation
//!
//! `γ = √(z·y)` (principal root, `Re γ ≥ 0`) in 1/km, `Z_c = √(z/y)` in Ω.

use emi_core::{
    ConductorSpec, ConductorType, EmiError, EmiResult, Meters, OhmMeters, SystemParameters,
    EPSILON_0, MU_0,
};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoatingProperties {
    /// Coating material name, informational only (e.g. "FBE", "3LPE")
    pub kind: String,
    pub thickness: Meters,
    pub resistivity: OhmMeters,
    pub rel_permittivity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineProperties {
    pub outer_diameter: Meters,
    pub steel_thickness: Meters,
    pub steel_resistivity: OhmMeters,
    pub steel_rel_permeability: f64,
    pub burial_depth: Meters,
    pub coating: CoatingProperties,
}

impl PipelineProperties {
    pub fn validate(&self) -> EmiResult<()> {
        let positive = [
            ("outer diameter", self.outer_diameter.value()),
            ("steel thickness", self.steel_thickness.value()),
            ("steel resistivity", self.steel_resistivity.value()),
            ("steel relative permeability", self.steel_rel_permeability),
            ("burial depth", self.burial_depth.value()),
            ("coating thickness", self.coating.thickness.value()),
            ("coating resistivity", self.coating.resistivity.value()),
            ("coating relative permittivity", self.coating.rel_permittivity),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(EmiError::physical_range(format!(
                    "pipeline {name} must be positive, got {value}"
                )));
            }
        }
        if self.outer_diameter.value() <= 2.0 * self.steel_thickness.value() {
            return Err(EmiError::physical_range(format!(
                "outer diameter {} must exceed twice the steel thickness {}",
                self.outer_diameter, self.steel_thickness
            )));
        }
        Ok(())
    }

    pub fn outer_radius(&self) -> f64 {
        self.outer_diameter.value() / 2.0
    }

    pub fn inner_radius(&self) -> f64 {
        self.outer_radius() - self.steel_thickness.value()
    }

    /// DC resistance of the steel annulus (Ω/km).
    pub fn dc_resistance(&self) -> f64 {
        let ro = self.outer_radius();
        let ri = self.inner_radius();
        self.steel_resistivity.value() / (std::f64::consts::PI * (ro * ro - ri * ri)) * 1e3
    }

    /// Catalog entry for the pipeline as one conductor of the line system.
    pub fn conductor_type(&self) -> ConductorType {
        ConductorType::new(self.outer_radius(), self.outer_radius(), self.dc_resistance())
    }

    /// Pipeline conductor at horizontal offset `x`, buried at `burial_depth`.
    pub fn conductor(&self, label: &str, x: f64, type_name: &str) -> ConductorSpec {
        ConductorSpec::buried(label, x, self.burial_depth.value(), type_name)
    }

    /// Internal impedance of the steel wall (Ω/km).
    pub fn internal_impedance(&self, params: &SystemParameters) -> Complex64 {
        let rho = self.steel_resistivity.value();
        let k = (Complex64::new(0.0, params.omega() * self.steel_rel_permeability * MU_0) / rho)
            .sqrt();
        let kt = k * self.steel_thickness.value();
        // coth saturates to 1 well before cosh/sinh overflow
        let coth = if kt.re > 20.0 {
            Complex64::new(1.0, 0.0)
        } else {
            kt.cosh() / kt.sinh()
        };
        k * rho / (2.0 * std::f64::consts::PI * self.outer_radius()) * coth * 1e3
    }

    /// Earth-return part of the series impedance (Ω/km).
    pub fn earth_return_impedance(&self, params: &SystemParameters) -> Complex64 {
        Complex64::new(
            params.earth_return_resistance(),
            params.reactance_constant() * (params.earth_return_depth() / self.outer_radius()).ln(),
        )
    }

    pub fn series_impedance(&self, params: &SystemParameters) -> Complex64 {
        self.internal_impedance(params) + self.earth_return_impedance(params)
    }

    pub fn shunt_admittance(&self, params: &SystemParameters) -> Complex64 {
        let ro = self.outer_radius();
        let tc = self.coating.thickness.value();
        let two_pi = 2.0 * std::f64::consts::PI;
        let g = two_pi * ro / (self.coating.resistivity.value() * tc) * 1e3;
        let b = two_pi * params.omega() * self.coating.rel_permittivity * EPSILON_0 * ro / tc * 1e3;
        Complex64::new(g, b)
    }
}

/// Per-unit-length pipeline parameters, fixed for one study.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PipelineElectricalParams {
    /// Series impedance (Ω/km)
    pub z: Complex64,
    /// Shunt admittance (S/km)
    pub y: Complex64,
    /// Propagation constant (1/km)
    pub gamma: Complex64,
    /// Characteristic impedance (Ω)
    pub zc: Complex64,
}

impl PipelineElectricalParams {
    pub fn compute(props: &PipelineProperties, params: &SystemParameters) -> EmiResult<Self> {
        props.validate()?;
        params.validate()?;
        Self::from_series_shunt(props.series_impedance(params), props.shunt_admittance(params))
    }

    /// From externally supplied z (Ω/km) and y (S/km), e.g. measured values.
    pub fn from_series_shunt(z: Complex64, y: Complex64) -> EmiResult<Self> {
        if !(z.re.is_finite() && z.im.is_finite() && z.re > 0.0) {
            return Err(EmiError::physical_range(format!(
                "series impedance must have a positive real part, got {z}"
            )));
        }
        if !(y.re.is_finite() && y.im.is_finite()) || y.norm() == 0.0 {
            return Err(EmiError::physical_range(format!(
                "shunt admittance must be non-zero, got {y}"
            )));
        }
        Ok(Self {
            z,
            y,
            gamma: (z * y).sqrt(),
            zc: (z / y).sqrt(),
        })
    }

    /// Attenuation length `1/Re γ` (km).
    pub fn attenuation_length_km(&self) -> f64 {
        1.0 / self.gamma.re
    }
}
