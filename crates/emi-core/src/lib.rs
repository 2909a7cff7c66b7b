//! # emi-core: Interference Modeling Core
//!
//! Data model shared by the interference engine, the configuration loaders and
//! the `emi` command line tool.
//!
//! ## Conductor model
//!
//! A study is an ordered list of [`ConductorSpec`]s: overhead phase conductors,
//! overhead earth (shield) wires and one buried pipeline. Each conductor names a
//! [`ConductorType`] in an explicit [`ConductorCatalog`] value; there is no
//! process-wide lookup table. Conductor order is the row/column order of every
//! matrix derived from the list.
//!
//! ```rust
//! use emi_core::*;
//!
//! let mut catalog = ConductorCatalog::new();
//! catalog.insert("ACSR", ConductorType::new(0.0085, 0.0107, 0.157)).unwrap();
//! catalog.insert("pipe", ConductorType::new(0.3, 0.3, 0.0102)).unwrap();
//!
//! let conductors = vec![
//!     ConductorSpec::phase("C1_R", -8.2, 14.47, "ACSR", "C1", "R"),
//!     ConductorSpec::buried("pipeline", 173.2, 1.0, "pipe"),
//! ];
//! assert_eq!(conductors[1].effective_height(), -1.0);
//! assert!(catalog.resolve("ACSR").is_ok());
//!
//! let params = SystemParameters::new(50.0, 100.0).unwrap();
//! assert!((params.earth_return_depth() - 931.77).abs() < 0.01);
//! ```
//!
//! ## Modules
//!
//! - [`units`] - unit newtypes for configuration-facing quantities
//! - [`error`] - [`EmiError`] and [`EmiResult`]
//! - [`diagnostics`] - non-fatal warnings attached to results
//! - [`linalg`] - small dense real/complex matrices, inverted through faer

use std::collections::BTreeMap;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

pub mod diagnostics;
pub mod error;
pub mod linalg;
pub mod units;

pub use diagnostics::{Diagnostics, Issue, IssueCategory, Severity};
pub use error::{EmiError, EmiResult};
pub use linalg::{ComplexMatrix, RealMatrix, SINGULAR_CONDITION};
pub use units::{Degrees, Hertz, Kilometers, Meters, OhmMeters, OhmsPerKm};

/// Vacuum permeability μ₀ (H/m), CODATA 2018.
pub const MU_0: f64 = 1.256_637_062_12e-6;
/// Vacuum permittivity ε₀ (F/m), CODATA 2018.
pub const EPSILON_0: f64 = 8.854_187_812_8e-12;

// ============================================================================
// Conductors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConductorRole {
    /// Energized overhead phase conductor
    Phase,
    /// Overhead earth (shield) wire, grounded at every tower
    EarthWire,
    /// Buried pipeline
    Pipeline,
}

/// One conductor at a fixed cross-section position.
///
/// `y` is the height above ground for overhead conductors. Buried conductors
/// carry a positive `burial_depth` and are placed at `-burial_depth`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConductorSpec {
    pub label: String,
    pub x: Meters,
    pub y: Meters,
    pub type_name: String,
    pub role: ConductorRole,
    pub circuit: Option<String>,
    pub phase: Option<String>,
    pub burial_depth: Meters,
}

impl ConductorSpec {
    pub fn phase(
        label: impl Into<String>,
        x: f64,
        y: f64,
        type_name: impl Into<String>,
        circuit: impl Into<String>,
        phase: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            x: Meters(x),
            y: Meters(y),
            type_name: type_name.into(),
            role: ConductorRole::Phase,
            circuit: Some(circuit.into()),
            phase: Some(phase.into()),
            burial_depth: Meters(0.0),
        }
    }

    pub fn earth_wire(label: impl Into<String>, x: f64, y: f64, type_name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            x: Meters(x),
            y: Meters(y),
            type_name: type_name.into(),
            role: ConductorRole::EarthWire,
            circuit: None,
            phase: None,
            burial_depth: Meters(0.0),
        }
    }

    pub fn buried(
        label: impl Into<String>,
        x: f64,
        burial_depth: f64,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            x: Meters(x),
            y: Meters(-burial_depth),
            type_name: type_name.into(),
            role: ConductorRole::Pipeline,
            circuit: None,
            phase: None,
            burial_depth: Meters(burial_depth),
        }
    }

    /// Signed height used by every earth-return formula.
    pub fn effective_height(&self) -> f64 {
        if self.burial_depth.value() > 0.0 {
            -self.burial_depth.value()
        } else {
            self.y.value()
        }
    }

    pub fn is_buried(&self) -> bool {
        self.effective_height() < 0.0
    }

    /// The same conductor moved horizontally.
    pub fn with_x(mut self, x: f64) -> Self {
        self.x = Meters(x);
        self
    }
}

/// Catalog entry for one conductor type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConductorType {
    /// GMR used in the inductive (impedance) terms
    pub gmr_impedance: Meters,
    /// Radius used in the potential coefficients; differs from
    /// `gmr_impedance` for bundles
    pub gmr_potential: Meters,
    /// AC resistance at system frequency
    pub r_ac: OhmsPerKm,
}

impl ConductorType {
    pub fn new(gmr_impedance: f64, gmr_potential: f64, r_ac: f64) -> Self {
        Self {
            gmr_impedance: Meters(gmr_impedance),
            gmr_potential: Meters(gmr_potential),
            r_ac: OhmsPerKm(r_ac),
        }
    }

    pub fn validate(&self) -> EmiResult<()> {
        let fields = [
            ("gmr_impedance", self.gmr_impedance.value()),
            ("gmr_potential", self.gmr_potential.value()),
            ("r_ac", self.r_ac.value()),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(EmiError::physical_range(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Immutable lookup of conductor types, keyed by type name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConductorCatalog {
    types: BTreeMap<String, ConductorType>,
}

impl ConductorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, conductor: ConductorType) -> EmiResult<()> {
        conductor.validate()?;
        self.types.insert(name.into(), conductor);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_type(mut self, name: impl Into<String>, conductor: ConductorType) -> EmiResult<Self> {
        self.insert(name, conductor)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ConductorType> {
        self.types.get(name)
    }

    pub fn resolve(&self, name: &str) -> EmiResult<&ConductorType> {
        self.types
            .get(name)
            .ok_or_else(|| EmiError::configuration(format!("unknown conductor type '{name}'")))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConductorType)> {
        self.types.iter()
    }
}

// ============================================================================
// System parameters
// ============================================================================

/// Frequency and earth resistivity, fixed for one matrix build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemParameters {
    pub frequency: Hertz,
    pub earth_resistivity: OhmMeters,
}

impl SystemParameters {
    pub fn new(frequency_hz: f64, earth_resistivity_ohmm: f64) -> EmiResult<Self> {
        let params = Self {
            frequency: Hertz(frequency_hz),
            earth_resistivity: OhmMeters(earth_resistivity_ohmm),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> EmiResult<()> {
        if !self.frequency.is_positive() {
            return Err(EmiError::physical_range(format!(
                "frequency must be positive, got {}",
                self.frequency
            )));
        }
        if !self.earth_resistivity.is_positive() {
            return Err(EmiError::physical_range(format!(
                "earth resistivity must be positive, got {}",
                self.earth_resistivity
            )));
        }
        Ok(())
    }

    /// ω = 2πf (rad/s)
    pub fn omega(&self) -> f64 {
        self.frequency.angular()
    }

    /// Carson-Clem equivalent earth-return depth `658.87·√(ρ/f)` (m).
    pub fn earth_return_depth(&self) -> f64 {
        658.87 * (self.earth_resistivity.value() / self.frequency.value()).sqrt()
    }

    /// Earth-return resistance `π²·f·10⁻⁴` (Ω/km).
    pub fn earth_return_resistance(&self) -> f64 {
        std::f64::consts::PI.powi(2) * self.frequency.value() * 1e-4
    }

    /// `ω·μ₀/2π` expressed per km; multiplies every logarithmic reactance term.
    pub fn reactance_constant(&self) -> f64 {
        self.omega() * MU_0 / (2.0 * std::f64::consts::PI) * 1e3
    }
}

// ============================================================================
// Routes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Point3) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }

    /// Point at fraction `t` of the way from `self` to `other`.
    pub fn lerp(&self, other: &Point3, t: f64) -> Point3 {
        Point3::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Ordered centerline of an overhead line or a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    points: Vec<Point3>,
}

impl Route {
    pub fn new(name: impl Into<String>, points: Vec<Point3>) -> EmiResult<Self> {
        let name = name.into();
        if points.len() < 2 {
            return Err(EmiError::configuration(format!(
                "route '{}' needs at least 2 points, got {}",
                name,
                points.len()
            )));
        }
        if let Some(i) = points.iter().position(|p| !p.is_finite()) {
            return Err(EmiError::configuration(format!(
                "route '{name}' has a non-finite coordinate at point {i}"
            )));
        }
        Ok(Self { name, points })
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Consecutive point pairs.
    pub fn segments(&self) -> impl Iterator<Item = (Point3, Point3)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn length(&self) -> Meters {
        self.segments().map(|(a, b)| Meters(a.distance(&b))).sum()
    }
}

// ============================================================================
// Currents
// ============================================================================

/// Steady-state phasor currents keyed by (circuit, phase).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatingCurrents {
    currents: BTreeMap<(String, String), Complex64>,
}

impl OperatingCurrents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, circuit: impl Into<String>, phase: impl Into<String>, current: Complex64) {
        self.currents.insert((circuit.into(), phase.into()), current);
    }

    pub fn get(&self, circuit: &str, phase: &str) -> Option<Complex64> {
        self.currents
            .get(&(circuit.to_string(), phase.to_string()))
            .copied()
    }

    /// Equal-magnitude currents on one circuit at the given phase angles.
    pub fn balanced(mut self, circuit: &str, magnitude: f64, phases: &[(&str, Degrees)]) -> Self {
        for (phase, angle) in phases {
            self.insert(circuit, *phase, Complex64::from_polar(magnitude, angle.to_radians()));
        }
        self
    }

    /// Every phasor multiplied by a real factor.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            currents: self
                .currents
                .iter()
                .map(|(k, v)| (k.clone(), v * factor))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.currents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Complex64)> {
        self.currents
            .iter()
            .map(|((c, p), v)| (c.as_str(), p.as_str(), *v))
    }
}

/// Single-phase-to-ground fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultCondition {
    pub current: Complex64,
    /// Conductor label (e.g. `C1_R`) or a phase label unique on the tower
    pub faulted_phase: String,
}

impl FaultCondition {
    pub fn new(current: Complex64, faulted_phase: impl Into<String>) -> Self {
        Self {
            current,
            faulted_phase: faulted_phase.into(),
        }
    }
}
