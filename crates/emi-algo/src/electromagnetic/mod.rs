//! Multi-conductor impedance and potential matrices.
//!
//! [`ElectromagneticSystem`] takes an ordered conductor list (phases, earth
//! wires, one buried pipeline), resolves each conductor type in the catalog,
//! and builds:
//!
//! - `Z`: complex series impedance matrix, Ω/km ([`earth_return`])
//! - `P`: real potential coefficient matrix, km/μF ([`potential`])
//!
//! Both are indexed by conductor order and symmetric. Everything downstream
//! (Kron reduction, steady-state EMF, screening factor, sequence parameters)
//! reads these two matrices; nothing mutates them after [`build`].
//!
//! # Steady-state EMF
//!
//! With the earth wires eliminated ([`reduction`]), the EMF driven along the
//! pipeline per unit length is
//!
//! ```text
//! E = −Σ_k Z_red[pipeline, k] · I_k        (V/km, k over phase conductors)
//! ```
//!
//! [`build`]: ElectromagneticSystem::build

pub mod earth_return;
pub mod potential;
pub mod reduction;

use emi_core::{
    ComplexMatrix, ConductorCatalog, ConductorRole, ConductorSpec, Diagnostics, EmiError,
    EmiResult, OperatingCurrents, RealMatrix, SystemParameters,
};
use num_complex::Complex64;
use serde::Serialize;
use tracing::debug;

pub use earth_return::{EarthReturnModel, ImpedanceGeometry};
pub use potential::{potential_constant, PotentialGeometry};
pub use reduction::{kron_reduce, kron_reduce_real, ReducedSystem, ReductionOptions};

/// Minimum spacing between two distinct conductors.
const MIN_SEPARATION_M: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct ElectromagneticSystem {
    conductors: Vec<ConductorSpec>,
    params: SystemParameters,
    model: EarthReturnModel,
    z: ComplexMatrix,
    p: RealMatrix,
}

/// Steady-state EMF on the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct EmfResult {
    /// EMF per unit length (V/km)
    pub emf: Complex64,
    /// Contribution of each energized conductor, by label
    pub contributions: Vec<(String, Complex64)>,
    pub diagnostics: Diagnostics,
}

impl ElectromagneticSystem {
    pub fn build(
        conductors: &[ConductorSpec],
        params: &SystemParameters,
        catalog: &ConductorCatalog,
    ) -> EmiResult<Self> {
        Self::build_with_model(conductors, params, catalog, EarthReturnModel::default())
    }

    pub fn build_with_model(
        conductors: &[ConductorSpec],
        params: &SystemParameters,
        catalog: &ConductorCatalog,
        model: EarthReturnModel,
    ) -> EmiResult<Self> {
        params.validate()?;
        if conductors.is_empty() {
            return Err(EmiError::configuration("no conductors given"));
        }
        let pipelines = conductors
            .iter()
            .filter(|c| c.role == ConductorRole::Pipeline)
            .count();
        if pipelines > 1 {
            return Err(EmiError::configuration(format!(
                "at most one pipeline conductor is supported, got {pipelines}"
            )));
        }

        let mut z_geometry = Vec::with_capacity(conductors.len());
        let mut p_geometry = Vec::with_capacity(conductors.len());
        for c in conductors {
            let kind = catalog.resolve(&c.type_name)?;
            if kind.gmr_impedance.value() <= 0.0 || kind.gmr_potential.value() <= 0.0 {
                return Err(EmiError::physical_range(format!(
                    "conductor '{}' of type '{}' has a zero GMR",
                    c.label, c.type_name
                )));
            }
            let h = c.effective_height();
            z_geometry.push(ImpedanceGeometry {
                x: c.x.value(),
                h,
                gmr: kind.gmr_impedance.value(),
                r: kind.r_ac.value(),
            });
            p_geometry.push(PotentialGeometry {
                x: c.x.value(),
                h,
                radius: kind.gmr_potential.value(),
            });
        }

        for i in 0..z_geometry.len() {
            for j in i + 1..z_geometry.len() {
                if earth_return::direct_distance(&z_geometry[i], &z_geometry[j]) < MIN_SEPARATION_M {
                    return Err(EmiError::physical_range(format!(
                        "conductors '{}' and '{}' coincide",
                        conductors[i].label, conductors[j].label
                    )));
                }
            }
        }

        let n = conductors.len();
        let z = ComplexMatrix::from_fn(n, n, |i, j| {
            if i == j {
                model.self_impedance(params, &z_geometry[i])
            } else {
                model.mutual_impedance(params, &z_geometry[i], &z_geometry[j])
            }
        });
        let p = potential::potential_matrix(&p_geometry)?;

        debug!(conductors = n, ?model, "built impedance and potential matrices");

        Ok(Self {
            conductors: conductors.to_vec(),
            params: *params,
            model,
            z,
            p,
        })
    }

    pub fn conductors(&self) -> &[ConductorSpec] {
        &self.conductors
    }

    pub fn params(&self) -> &SystemParameters {
        &self.params
    }

    pub fn model(&self) -> EarthReturnModel {
        self.model
    }

    /// Series impedance matrix (Ω/km).
    pub fn impedance_matrix(&self) -> &ComplexMatrix {
        &self.z
    }

    /// Potential coefficient matrix (km/μF).
    pub fn potential_matrix(&self) -> &RealMatrix {
        &self.p
    }

    /// Maxwell capacitance matrix `C = P⁻¹` (μF/km).
    pub fn capacitance_matrix(&self) -> EmiResult<RealMatrix> {
        self.p.inverse()
    }

    // =========================================================================
    // Index sets
    // =========================================================================

    fn indices_with(&self, role: ConductorRole) -> Vec<usize> {
        self.conductors
            .iter()
            .enumerate()
            .filter(|(_, c)| c.role == role)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn phase_indices(&self) -> Vec<usize> {
        self.indices_with(ConductorRole::Phase)
    }

    pub fn earth_wire_indices(&self) -> Vec<usize> {
        self.indices_with(ConductorRole::EarthWire)
    }

    pub fn pipeline_index(&self) -> Option<usize> {
        self.conductors
            .iter()
            .position(|c| c.role == ConductorRole::Pipeline)
    }

    pub(crate) fn require_pipeline(&self) -> EmiResult<usize> {
        self.pipeline_index()
            .ok_or_else(|| EmiError::configuration("conductor set has no pipeline"))
    }

    /// Every conductor except the earth wires, in original order.
    pub fn non_earth_indices(&self) -> Vec<usize> {
        self.conductors
            .iter()
            .enumerate()
            .filter(|(_, c)| c.role != ConductorRole::EarthWire)
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of a phase conductor by conductor label (`C1_R`), or by phase
    /// label (`R`) when exactly one phase conductor carries it.
    pub fn resolve_label(&self, label: &str) -> EmiResult<usize> {
        if let Some(i) = self
            .conductors
            .iter()
            .position(|c| c.role == ConductorRole::Phase && c.label == label)
        {
            return Ok(i);
        }
        let by_phase: Vec<usize> = self
            .phase_indices()
            .into_iter()
            .filter(|&i| self.conductors[i].phase.as_deref() == Some(label))
            .collect();
        match by_phase.as_slice() {
            [i] => Ok(*i),
            [] => Err(EmiError::configuration(format!(
                "phase '{label}' does not match any phase conductor"
            ))),
            _ => Err(EmiError::configuration(format!(
                "phase '{label}' is ambiguous ({} conductors); use a conductor label",
                by_phase.len()
            ))),
        }
    }

    // =========================================================================
    // Reduction
    // =========================================================================

    /// Eliminate all earth wires, keeping phases and pipeline.
    pub fn reduce(&self, options: &ReductionOptions) -> EmiResult<ReducedSystem> {
        self.reduce_indices(&self.non_earth_indices(), &self.earth_wire_indices(), options)
    }

    pub fn reduce_indices(
        &self,
        keep: &[usize],
        eliminate: &[usize],
        options: &ReductionOptions,
    ) -> EmiResult<ReducedSystem> {
        let n = self.conductors.len();
        if let Some(bad) = keep.iter().chain(eliminate).find(|&&i| i >= n) {
            return Err(EmiError::configuration(format!(
                "conductor index {bad} out of range for {n} conductors"
            )));
        }
        kron_reduce(&self.z, keep, eliminate, options)
    }

    /// Capacitance of the non-earth conductors with earth wires at zero
    /// potential: `P` reduced like `Z`, then inverted.
    pub fn reduced_capacitance(&self) -> EmiResult<RealMatrix> {
        kron_reduce_real(&self.p, &self.non_earth_indices(), &self.earth_wire_indices())?
            .inverse()
    }

    // =========================================================================
    // Steady-state EMF
    // =========================================================================

    pub fn steady_state_emf(&self, currents: &OperatingCurrents) -> EmiResult<EmfResult> {
        self.steady_state_emf_with(currents, &ReductionOptions::default())
    }

    pub fn steady_state_emf_with(
        &self,
        currents: &OperatingCurrents,
        options: &ReductionOptions,
    ) -> EmiResult<EmfResult> {
        let pipeline = self.require_pipeline()?;
        let reduced = self.reduce(options)?;
        let row = reduced
            .position(pipeline)
            .ok_or_else(|| EmiError::configuration("pipeline was eliminated"))?;

        let mut emf = Complex64::new(0.0, 0.0);
        let mut contributions = Vec::new();
        for (col, &original) in reduced.kept.iter().enumerate() {
            let conductor = &self.conductors[original];
            if conductor.role != ConductorRole::Phase {
                continue;
            }
            let current = phase_current(conductor, currents)?;
            let term = -reduced.matrix.get(row, col) * current;
            emf += term;
            contributions.push((conductor.label.clone(), term));
        }

        debug!(emf_re = emf.re, emf_im = emf.im, "steady-state pipeline EMF");

        Ok(EmfResult {
            emf,
            contributions,
            diagnostics: reduced.diagnostics,
        })
    }
}

fn phase_current(conductor: &ConductorSpec, currents: &OperatingCurrents) -> EmiResult<Complex64> {
    let (Some(circuit), Some(phase)) = (conductor.circuit.as_deref(), conductor.phase.as_deref())
    else {
        return Err(EmiError::configuration(format!(
            "phase conductor '{}' has no circuit/phase label",
            conductor.label
        )));
    };
    currents.get(circuit, phase).ok_or_else(|| {
        EmiError::configuration(format!(
            "no operating current for circuit '{circuit}' phase '{phase}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use emi_core::{ConductorType, Degrees};

    fn catalog() -> ConductorCatalog {
        ConductorCatalog::new()
            .with_type("ACSR", ConductorType::new(0.0085, 0.0107, 0.157))
            .unwrap()
            .with_type("GW", ConductorType::new(0.0085, 0.0107, 0.0644))
            .unwrap()
            .with_type("pipe", ConductorType::new(0.3, 0.3, 0.0102))
            .unwrap()
    }

    fn single_circuit(with_earth: bool) -> Vec<ConductorSpec> {
        let mut conductors = vec![
            ConductorSpec::phase("C1_R", -8.2, 14.47, "ACSR", "C1", "R"),
            ConductorSpec::phase("C1_Y", 0.0, 14.47, "ACSR", "C1", "Y"),
            ConductorSpec::phase("C1_B", 8.2, 14.47, "ACSR", "C1", "B"),
        ];
        if with_earth {
            conductors.push(ConductorSpec::earth_wire("EW", 0.0, 22.0, "GW"));
        }
        conductors.push(ConductorSpec::buried("pipeline", 60.0, 1.0, "pipe"));
        conductors
    }

    fn currents() -> OperatingCurrents {
        OperatingCurrents::new().balanced(
            "C1",
            500.0,
            &[("R", Degrees(0.0)), ("Y", Degrees(-120.0)), ("B", Degrees(120.0))],
        )
    }

    fn params() -> SystemParameters {
        SystemParameters::new(50.0, 100.0).unwrap()
    }

    #[test]
    fn matrices_are_symmetric() {
        for model in [EarthReturnModel::CarsonClem, EarthReturnModel::ComplexDepth] {
            let system =
                ElectromagneticSystem::build_with_model(&single_circuit(true), &params(), &catalog(), model)
                    .unwrap();
            assert!(system.impedance_matrix().is_symmetric(1e-12));
            assert!(system.potential_matrix().is_symmetric(1e-12));
            assert_eq!(system.impedance_matrix().dim(), (5, 5));
        }
    }

    #[test]
    fn index_sets() {
        let system = ElectromagneticSystem::build(&single_circuit(true), &params(), &catalog()).unwrap();
        assert_eq!(system.phase_indices(), vec![0, 1, 2]);
        assert_eq!(system.earth_wire_indices(), vec![3]);
        assert_eq!(system.pipeline_index(), Some(4));
        assert_eq!(system.resolve_label("C1_Y").unwrap(), 1);
        assert_eq!(system.resolve_label("B").unwrap(), 2);
        assert!(matches!(
            system.resolve_label("W"),
            Err(EmiError::Configuration(_))
        ));
    }

    #[test]
    fn unknown_type_is_configuration_error() {
        let mut conductors = single_circuit(false);
        conductors[0].type_name = "AAAC".into();
        let err = ElectromagneticSystem::build(&conductors, &params(), &catalog());
        assert!(matches!(err, Err(EmiError::Configuration(_))));
    }

    #[test]
    fn coincident_conductors_rejected() {
        let mut conductors = single_circuit(false);
        conductors[1] = conductors[1].clone().with_x(-8.2);
        let err = ElectromagneticSystem::build(&conductors, &params(), &catalog());
        assert!(matches!(err, Err(EmiError::PhysicalRange(_))));
    }

    #[test]
    fn zero_gmr_rejected() {
        let catalog = catalog()
            .with_type("ACSR", ConductorType::new(0.0, 0.0107, 0.157))
            .unwrap();
        let err = ElectromagneticSystem::build(&single_circuit(false), &params(), &catalog);
        assert!(matches!(err, Err(EmiError::PhysicalRange(_))));
    }

    #[test]
    fn reduction_without_earth_wires_is_noop() {
        let system = ElectromagneticSystem::build(&single_circuit(false), &params(), &catalog()).unwrap();
        let reduced = system.reduce(&ReductionOptions::default()).unwrap();
        assert_eq!(&reduced.matrix, system.impedance_matrix());
    }

    #[test]
    fn earth_wire_shields_unbalanced_current() {
        let mut unbalanced = OperatingCurrents::new();
        unbalanced.insert("C1", "R", Complex64::new(500.0, 0.0));
        unbalanced.insert("C1", "Y", Complex64::new(0.0, 0.0));
        unbalanced.insert("C1", "B", Complex64::new(0.0, 0.0));

        let bare = ElectromagneticSystem::build(&single_circuit(false), &params(), &catalog())
            .unwrap()
            .steady_state_emf(&unbalanced)
            .unwrap();
        let shielded = ElectromagneticSystem::build(&single_circuit(true), &params(), &catalog())
            .unwrap()
            .steady_state_emf(&unbalanced)
            .unwrap();
        // 85.0 V/km bare, 51.5 V/km with the earth wire
        assert!((bare.emf.norm() - 85.013).abs() < 0.01);
        assert!((shielded.emf.norm() - 51.497).abs() < 0.01);
    }

    #[test]
    fn contributions_sum_to_emf() {
        let result = ElectromagneticSystem::build(&single_circuit(true), &params(), &catalog())
            .unwrap()
            .steady_state_emf(&currents())
            .unwrap();
        assert_eq!(result.contributions.len(), 3);
        let total: Complex64 = result.contributions.iter().map(|(_, e)| e).sum();
        assert!((total - result.emf).norm() < 1e-12);
        assert!((result.emf.norm() - 7.3265).abs() < 1e-3);
    }

    #[test]
    fn missing_current_is_configuration_error() {
        let system = ElectromagneticSystem::build(&single_circuit(false), &params(), &catalog()).unwrap();
        let mut partial = OperatingCurrents::new();
        partial.insert("C1", "R", Complex64::new(500.0, 0.0));
        assert!(matches!(
            system.steady_state_emf(&partial),
            Err(EmiError::Configuration(_))
        ));
    }

    #[test]
    fn capacitance_inverts_potential() {
        let system = ElectromagneticSystem::build(&single_circuit(true), &params(), &catalog()).unwrap();
        let c = system.capacitance_matrix().unwrap();
        let identity = system.potential_matrix().mul(&c).unwrap();
        for i in 0..5 {
            for j in 0..5 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((identity.get(i, j) - expected).abs() < 1e-9);
            }
        }
        assert_eq!(system.reduced_capacitance().unwrap().dim(), (4, 4));
    }
}
