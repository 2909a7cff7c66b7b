//! Fault-induced EMF with earth-wire screening.
//!
//! During a single-phase-to-ground fault the fault current returns partly
//! through the earth wires. The current they carry opposes the field of the
//! faulted phase, which is expressed as a screening factor `k`:
//!
//! ```text
//! k       = 1 − (Z_pe · Z_ee⁻¹ · Z_ef) / Z_pf
//! E_fault = −Z_pf · k · I_fault                    (V/km)
//! ```
//!
//! where `p` is the pipeline, `f` the faulted phase and `e` the earth-wire
//! set, all read from the full (unreduced) impedance matrix. With no earth
//! wires `k = 1`.
//!
//! How `k` is obtained is a [`ScreeningFactorStrategy`]: [`ExactMatrix`]
//! evaluates the expression above, [`FixedEstimate`] uses a value supplied by
//! the caller (for example a figure from a utility standard). The analyzer
//! never switches between them on its own.

use emi_core::{Diagnostics, EmiError, EmiResult, FaultCondition, Kilometers};
use num_complex::Complex64;
use serde::Serialize;
use tracing::debug;

use crate::electromagnetic::reduction::check_condition;
use crate::electromagnetic::{ElectromagneticSystem, ReductionOptions};

#[derive(Debug, Clone, Serialize)]
pub struct ScreeningFactor {
    pub k: Complex64,
    /// Strategy that produced `k`
    pub strategy: &'static str,
    /// Condition number of `Z_ee`, when it was inverted
    pub condition_number: Option<f64>,
    pub diagnostics: Diagnostics,
}

pub trait ScreeningFactorStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn screening_factor(
        &self,
        system: &ElectromagneticSystem,
        faulted: usize,
        pipeline: usize,
        options: &ReductionOptions,
    ) -> EmiResult<ScreeningFactor>;
}

/// `k` from the impedance matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatrix;

impl ScreeningFactorStrategy for ExactMatrix {
    fn name(&self) -> &'static str {
        "exact_matrix"
    }

    fn screening_factor(
        &self,
        system: &ElectromagneticSystem,
        faulted: usize,
        pipeline: usize,
        options: &ReductionOptions,
    ) -> EmiResult<ScreeningFactor> {
        let earth = system.earth_wire_indices();
        let mut diagnostics = Diagnostics::new();
        if earth.is_empty() {
            return Ok(ScreeningFactor {
                k: Complex64::new(1.0, 0.0),
                strategy: self.name(),
                condition_number: None,
                diagnostics,
            });
        }

        let z = system.impedance_matrix();
        let z_pf = z.get(pipeline, faulted);
        if z_pf.norm() == 0.0 {
            return Err(EmiError::singular(
                "pipeline to faulted-phase mutual impedance is zero",
            ));
        }

        let z_ee = z.select(&earth, &earth);
        let z_ee_inv = z_ee.inverse()?;
        let condition = z_ee.norm_one() * z_ee_inv.norm_one();
        check_condition(condition, options, "earth-wire impedance block", &mut diagnostics);

        let shielding = z
            .select(&[pipeline], &earth)
            .mul(&z_ee_inv)?
            .mul(&z.select(&earth, &[faulted]))?
            .get(0, 0);
        let k = Complex64::new(1.0, 0.0) - shielding / z_pf;

        debug!(k_re = k.re, k_im = k.im, condition, "screening factor");

        Ok(ScreeningFactor {
            k,
            strategy: self.name(),
            condition_number: Some(condition),
            diagnostics,
        })
    }
}

/// Caller-supplied `k`, used as is.
#[derive(Debug, Clone, Copy)]
pub struct FixedEstimate {
    pub k: Complex64,
}

impl ScreeningFactorStrategy for FixedEstimate {
    fn name(&self) -> &'static str {
        "fixed_estimate"
    }

    fn screening_factor(
        &self,
        _system: &ElectromagneticSystem,
        _faulted: usize,
        _pipeline: usize,
        _options: &ReductionOptions,
    ) -> EmiResult<ScreeningFactor> {
        Ok(ScreeningFactor {
            k: self.k,
            strategy: self.name(),
            condition_number: None,
            diagnostics: Diagnostics::new(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FaultEmf {
    /// EMF per unit length (V/km)
    pub emf: Complex64,
    pub k: Complex64,
    /// Direct pipeline to faulted-phase mutual impedance (Ω/km)
    pub mutual_impedance: Complex64,
    pub strategy: &'static str,
    pub diagnostics: Diagnostics,
}

pub struct FaultAnalyzer<'a> {
    system: &'a ElectromagneticSystem,
    options: ReductionOptions,
}

impl<'a> FaultAnalyzer<'a> {
    pub fn new(system: &'a ElectromagneticSystem) -> Self {
        Self {
            system,
            options: ReductionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReductionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn screening_factor(&self, faulted_phase: &str) -> EmiResult<ScreeningFactor> {
        self.screening_factor_with(faulted_phase, &ExactMatrix)
    }

    pub fn screening_factor_with(
        &self,
        faulted_phase: &str,
        strategy: &dyn ScreeningFactorStrategy,
    ) -> EmiResult<ScreeningFactor> {
        let faulted = self.system.resolve_label(faulted_phase)?;
        let pipeline = self.system.require_pipeline()?;
        strategy.screening_factor(self.system, faulted, pipeline, &self.options)
    }

    pub fn fault_emf(&self, fault: &FaultCondition) -> EmiResult<FaultEmf> {
        self.fault_emf_with(fault, &ExactMatrix)
    }

    pub fn fault_emf_with(
        &self,
        fault: &FaultCondition,
        strategy: &dyn ScreeningFactorStrategy,
    ) -> EmiResult<FaultEmf> {
        let faulted = self.system.resolve_label(&fault.faulted_phase)?;
        let pipeline = self.system.require_pipeline()?;
        let screening = strategy.screening_factor(self.system, faulted, pipeline, &self.options)?;
        let mutual = self.system.impedance_matrix().get(faulted, pipeline);

        Ok(FaultEmf {
            emf: -mutual * screening.k * fault.current,
            k: screening.k,
            mutual_impedance: mutual,
            strategy: screening.strategy,
            diagnostics: screening.diagnostics,
        })
    }

    /// Open-circuit voltage over an exposure length.
    pub fn fault_voltage(&self, fault: &FaultCondition, length: Kilometers) -> EmiResult<Complex64> {
        if !(length.is_finite() && length.value() >= 0.0) {
            return Err(EmiError::physical_range(format!(
                "exposure length must be non-negative, got {length}"
            )));
        }
        Ok(self.fault_emf(fault)?.emf * length.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emi_core::{ConductorCatalog, ConductorSpec, ConductorType, SystemParameters};

    fn system(with_earth: bool) -> ElectromagneticSystem {
        let catalog = ConductorCatalog::new()
            .with_type("ACSR", ConductorType::new(0.0085, 0.0107, 0.157))
            .unwrap()
            .with_type("GW", ConductorType::new(0.0085, 0.0107, 0.0644))
            .unwrap()
            .with_type("pipe", ConductorType::new(0.3, 0.3, 0.0))
            .unwrap();
        let mut conductors = vec![
            ConductorSpec::phase("R", -8.2, 14.47, "ACSR", "C1", "R"),
            ConductorSpec::phase("Y", 0.0, 17.0, "ACSR", "C1", "Y"),
            ConductorSpec::phase("B", 8.2, 14.47, "ACSR", "C1", "B"),
        ];
        if with_earth {
            conductors.push(ConductorSpec::earth_wire("EW", 1.07, 45.19, "GW"));
        }
        conductors.push(ConductorSpec::buried("pipeline", 173.2, 1.0, "pipe"));
        let params = SystemParameters::new(50.0, 100.0).unwrap();
        ElectromagneticSystem::build(&conductors, &params, &catalog).unwrap()
    }

    #[test]
    fn no_earth_wires_means_no_screening() {
        let sys = system(false);
        let analyzer = FaultAnalyzer::new(&sys);
        for phase in ["R", "Y", "B"] {
            let k = analyzer.screening_factor(phase).unwrap();
            assert_eq!(k.k, Complex64::new(1.0, 0.0));
            assert!(k.condition_number.is_none());
        }
    }

    #[test]
    fn earth_wire_screens() {
        let sys = system(true);
        let k = FaultAnalyzer::new(&sys).screening_factor("R").unwrap();
        assert!(k.k.norm() < 1.0 && k.k.norm() > 0.5);
        assert_eq!(k.strategy, "exact_matrix");
    }

    #[test]
    fn fixed_estimate_is_used_verbatim() {
        let sys = system(true);
        let analyzer = FaultAnalyzer::new(&sys);
        let fixed = FixedEstimate {
            k: Complex64::new(0.6, 0.0),
        };
        let fault = FaultCondition::new(Complex64::new(13_000.0, 0.0), "R");
        let emf = analyzer.fault_emf_with(&fault, &fixed).unwrap();
        assert_eq!(emf.k, Complex64::new(0.6, 0.0));
        assert_eq!(emf.strategy, "fixed_estimate");
        let expected = -emf.mutual_impedance * 0.6 * 13_000.0;
        assert!((emf.emf - expected).norm() < 1e-9);
    }

    #[test]
    fn fault_emf_is_linear_in_current() {
        let sys = system(true);
        let analyzer = FaultAnalyzer::new(&sys);
        let one = analyzer
            .fault_emf(&FaultCondition::new(Complex64::new(6_500.0, -1_000.0), "B"))
            .unwrap();
        let two = analyzer
            .fault_emf(&FaultCondition::new(Complex64::new(13_000.0, -2_000.0), "B"))
            .unwrap();
        assert!((two.emf - one.emf * 2.0).norm() < 1e-9);
    }

    #[test]
    fn unknown_phase_is_configuration_error() {
        let sys = system(true);
        let fault = FaultCondition::new(Complex64::new(13_000.0, 0.0), "W");
        assert!(matches!(
            FaultAnalyzer::new(&sys).fault_emf(&fault),
            Err(EmiError::Configuration(_))
        ));
    }

    #[test]
    fn fault_voltage_scales_with_length() {
        let sys = system(true);
        let analyzer = FaultAnalyzer::new(&sys);
        let fault = FaultCondition::new(Complex64::new(13_000.0, 0.0), "R");
        let per_km = analyzer.fault_emf(&fault).unwrap().emf;
        let v = analyzer.fault_voltage(&fault, Kilometers(2.5)).unwrap();
        assert!((v - per_km * 2.5).norm() < 1e-9);
        assert!(analyzer.fault_voltage(&fault, Kilometers(-1.0)).is_err());
    }
}
