//! Route-based interference study.
//!
//! Every [`Section`] rebuilds its own [`ElectromagneticSystem`] with the
//! pipeline moved to the section's average separation. Sections are
//! independent, so with the `parallel` feature they are evaluated on the
//! rayon pool; the results are always collected and summed in section order
//! so totals are reproducible bit for bit.
//!
//! ```text
//! V_section = E_section · L_section        (V)
//! V_total   = Σ V_section                  (vector sum)
//! ```

use emi_core::{
    ConductorCatalog, ConductorSpec, Diagnostics, EmiResult, FaultCondition, OperatingCurrents,
    SystemParameters,
};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::electromagnetic::reduction::DEFAULT_CONDITION_THRESHOLD;
use crate::electromagnetic::{EarthReturnModel, ElectromagneticSystem, ReductionOptions};
use crate::fault::FaultAnalyzer;
use crate::longitudinal::{LineEnds, LongitudinalAnalyzer, SourceSegment, VoltageProfile};
use crate::pipeline::PipelineElectricalParams;
use crate::route::Section;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StudyOptions {
    pub earth_return_model: EarthReturnModel,
    pub condition_threshold: f64,
}

impl Default for StudyOptions {
    fn default() -> Self {
        Self {
            earth_return_model: EarthReturnModel::default(),
            condition_threshold: DEFAULT_CONDITION_THRESHOLD,
        }
    }
}

impl StudyOptions {
    fn reduction(&self) -> ReductionOptions {
        ReductionOptions {
            condition_threshold: self.condition_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionResult {
    pub index: usize,
    pub start_chainage_m: f64,
    pub length_m: f64,
    pub average_separation_m: f64,
    /// EMF per unit length (V/km)
    pub emf: Complex64,
    /// Open-circuit voltage over the section (V)
    pub voltage: Complex64,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudyResult {
    pub sections: Vec<SectionResult>,
    /// Vector sum of section voltages (V)
    pub total_voltage: Complex64,
    /// Sum of section voltage magnitudes (V)
    pub scalar_sum: f64,
    pub total_length_m: f64,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Serialize)]
pub struct FaultSectionResult {
    pub index: usize,
    pub length_m: f64,
    pub average_separation_m: f64,
    pub k: Complex64,
    /// Fault EMF per unit length (V/km)
    pub emf: Complex64,
    pub voltage: Complex64,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Serialize)]
pub struct FaultStudyResult {
    pub faulted_phase: String,
    pub sections: Vec<FaultSectionResult>,
    pub total_voltage: Complex64,
    pub scalar_sum: f64,
    pub diagnostics: Diagnostics,
}

/// One overhead line, one pipeline, one set of operating currents.
#[derive(Debug, Clone)]
pub struct InterferenceStudy {
    /// Line conductors (phases and earth wires)
    pub ohl: Vec<ConductorSpec>,
    /// Types for the line conductors and the pipeline
    pub catalog: ConductorCatalog,
    pub params: SystemParameters,
    /// Pipeline conductor; its `x` is replaced by each section's separation
    pub pipeline: ConductorSpec,
    pub currents: OperatingCurrents,
    pub options: StudyOptions,
}

impl InterferenceStudy {
    pub fn new(
        ohl: Vec<ConductorSpec>,
        catalog: ConductorCatalog,
        params: SystemParameters,
        pipeline: ConductorSpec,
        currents: OperatingCurrents,
    ) -> Self {
        Self {
            ohl,
            catalog,
            params,
            pipeline,
            currents,
            options: StudyOptions::default(),
        }
    }

    pub fn with_options(mut self, options: StudyOptions) -> Self {
        self.options = options;
        self
    }

    /// Electromagnetic system for one section.
    pub fn section_system(&self, section: &Section) -> EmiResult<ElectromagneticSystem> {
        ElectromagneticSystem::build_with_model(
            &section.conductor_layout(&self.ohl, &self.pipeline),
            &self.params,
            &self.catalog,
            self.options.earth_return_model,
        )
    }

    fn evaluate(&self, section: &Section) -> EmiResult<SectionResult> {
        let system = self.section_system(section)?;
        let result = system.steady_state_emf_with(&self.currents, &self.options.reduction())?;
        let voltage = result.emf * section.length_km();
        debug!(
            section = section.index,
            separation_m = section.average_separation_m,
            emf_abs = result.emf.norm(),
            "section evaluated"
        );
        Ok(SectionResult {
            index: section.index,
            start_chainage_m: section.start_chainage_m,
            length_m: section.length_m,
            average_separation_m: section.average_separation_m,
            emf: result.emf,
            voltage,
            diagnostics: result.diagnostics.tagged(&format!("section {}", section.index)),
        })
    }

    fn evaluate_fault(&self, section: &Section, fault: &FaultCondition) -> EmiResult<FaultSectionResult> {
        let system = self.section_system(section)?;
        let emf = FaultAnalyzer::new(&system)
            .with_options(self.options.reduction())
            .fault_emf(fault)?;
        Ok(FaultSectionResult {
            index: section.index,
            length_m: section.length_m,
            average_separation_m: section.average_separation_m,
            k: emf.k,
            emf: emf.emf,
            voltage: emf.emf * section.length_km(),
            diagnostics: emf.diagnostics.tagged(&format!("section {}", section.index)),
        })
    }

    #[cfg(feature = "parallel")]
    fn map_sections<T, F>(sections: &[Section], f: F) -> EmiResult<Vec<T>>
    where
        T: Send,
        F: Fn(&Section) -> EmiResult<T> + Sync + Send,
    {
        sections.par_iter().map(f).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn map_sections<T, F>(sections: &[Section], f: F) -> EmiResult<Vec<T>>
    where
        F: Fn(&Section) -> EmiResult<T>,
    {
        sections.iter().map(f).collect()
    }

    /// Steady-state induced voltage over all sections.
    pub fn run(&self, sections: &[Section]) -> EmiResult<StudyResult> {
        info!(sections = sections.len(), "running steady-state study");
        let results = Self::map_sections(sections, |s| self.evaluate(s))?;

        let mut total_voltage = Complex64::new(0.0, 0.0);
        let mut scalar_sum = 0.0;
        let mut total_length_m = 0.0;
        let mut diagnostics = Diagnostics::new();
        for r in &results {
            total_voltage += r.voltage;
            scalar_sum += r.voltage.norm();
            total_length_m += r.length_m;
            diagnostics.merge(r.diagnostics.clone());
        }

        info!(
            total_abs = total_voltage.norm(),
            scalar_sum,
            warnings = diagnostics.warning_count(),
            "steady-state study complete"
        );

        Ok(StudyResult {
            sections: results,
            total_voltage,
            scalar_sum,
            total_length_m,
            diagnostics,
        })
    }

    /// Fault-induced voltage over all sections, exact screening per section.
    pub fn fault_run(&self, sections: &[Section], fault: &FaultCondition) -> EmiResult<FaultStudyResult> {
        info!(
            sections = sections.len(),
            phase = %fault.faulted_phase,
            "running fault study"
        );
        let results = Self::map_sections(sections, |s| self.evaluate_fault(s, fault))?;

        let mut total_voltage = Complex64::new(0.0, 0.0);
        let mut scalar_sum = 0.0;
        let mut diagnostics = Diagnostics::new();
        for r in &results {
            total_voltage += r.voltage;
            scalar_sum += r.voltage.norm();
            diagnostics.merge(r.diagnostics.clone());
        }

        Ok(FaultStudyResult {
            faulted_phase: fault.faulted_phase.clone(),
            sections: results,
            total_voltage,
            scalar_sum,
            diagnostics,
        })
    }

    /// Voltage along the whole route, each section driving its own EMF.
    pub fn longitudinal_profile(
        &self,
        result: &StudyResult,
        electrical: PipelineElectricalParams,
        ends: LineEnds,
    ) -> EmiResult<VoltageProfile> {
        let segments: Vec<SourceSegment> = result
            .sections
            .iter()
            .map(|s| SourceSegment {
                length_km: s.length_m / 1000.0,
                emf: s.emf,
            })
            .collect();
        LongitudinalAnalyzer::new(electrical).solve(&segments, ends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emi_core::{ConductorType, Degrees, Point3};

    fn study() -> InterferenceStudy {
        let catalog = ConductorCatalog::new()
            .with_type("ACSR", ConductorType::new(0.0085, 0.0107, 0.157))
            .unwrap()
            .with_type("GW", ConductorType::new(0.0085, 0.0107, 0.0644))
            .unwrap()
            .with_type("pipe", ConductorType::new(0.3, 0.3, 0.0102))
            .unwrap();
        let ohl = vec![
            ConductorSpec::phase("C1_R", -8.2, 14.47, "ACSR", "C1", "R"),
            ConductorSpec::phase("C1_Y", 0.0, 14.47, "ACSR", "C1", "Y"),
            ConductorSpec::phase("C1_B", 8.2, 14.47, "ACSR", "C1", "B"),
            ConductorSpec::earth_wire("EW", 0.0, 22.0, "GW"),
        ];
        let currents = OperatingCurrents::new().balanced(
            "C1",
            500.0,
            &[("R", Degrees(0.0)), ("Y", Degrees(-120.0)), ("B", Degrees(120.0))],
        );
        InterferenceStudy::new(
            ohl,
            catalog,
            SystemParameters::new(50.0, 100.0).unwrap(),
            ConductorSpec::buried("pipeline", 0.0, 1.0, "pipe"),
            currents,
        )
    }

    fn section(index: usize, length_m: f64, separation: f64) -> Section {
        Section {
            index,
            start_chainage_m: 0.0,
            length_m,
            average_separation_m: separation,
            start: Point3::default(),
            end: Point3::new(length_m, 0.0, 0.0),
        }
    }

    #[test]
    fn totals_follow_sections() {
        let sections = vec![section(0, 1000.0, 60.0), section(1, 500.0, 120.0)];
        let result = study().run(&sections).unwrap();
        assert_eq!(result.sections.len(), 2);
        assert_eq!(result.sections[1].index, 1);

        let sum: Complex64 = result.sections.iter().map(|s| s.voltage).sum();
        assert!((sum - result.total_voltage).norm() < 1e-12);
        assert!(result.total_voltage.norm() <= result.scalar_sum + 1e-12);
        assert!((result.total_length_m - 1500.0).abs() < 1e-9);
        assert!((result.sections[0].voltage - result.sections[0].emf).norm() < 1e-12);
    }

    #[test]
    fn ill_conditioning_is_tagged_per_section() {
        let options = StudyOptions {
            // a single earth wire has condition number exactly 1
            condition_threshold: 0.5,
            ..StudyOptions::default()
        };
        let result = study()
            .with_options(options)
            .run(&[section(0, 100.0, 60.0), section(1, 100.0, 80.0)])
            .unwrap();
        assert_eq!(result.diagnostics.warning_count(), 2);
        assert!(result
            .diagnostics
            .issues
            .iter()
            .any(|i| i.entity.as_deref() == Some("section 1")));
    }

    #[test]
    fn fault_study_sums_sections() {
        let fault = FaultCondition::new(Complex64::new(10_000.0, 0.0), "R");
        let result = study()
            .fault_run(&[section(0, 1000.0, 60.0), section(1, 2000.0, 60.0)], &fault)
            .unwrap();
        assert_eq!(result.faulted_phase, "R");
        assert!((result.total_voltage - result.sections[0].emf * 3.0).norm() < 1e-9);
        assert!(result.sections[0].k.norm() < 1.0);
    }

    #[test]
    fn missing_pipeline_type_fails_the_study() {
        let mut s = study();
        s.pipeline.type_name = "unknown".into();
        assert!(s.run(&[section(0, 100.0, 60.0)]).is_err());
    }

    #[test]
    fn profile_spans_route() {
        let s = study();
        let result = s.run(&[section(0, 1000.0, 60.0), section(1, 500.0, 120.0)]).unwrap();
        let electrical = PipelineElectricalParams::from_series_shunt(
            Complex64::new(0.10688, 0.5167),
            Complex64::new(0.01256, 0.00436),
        )
        .unwrap();
        let profile = s
            .longitudinal_profile(&result, electrical, LineEnds::open())
            .unwrap();
        assert!((profile.length_km() - 1.5).abs() < 1e-12);
        let (start, end) = profile.ends().unwrap();
        assert!(start.norm() > 0.0 && end.norm() > 0.0);
    }
}
