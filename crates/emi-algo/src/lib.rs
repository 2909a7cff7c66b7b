//! # emi-algo: Induced-Voltage Engine
//!
//! Numeric engine for voltages induced on a buried pipeline by an overhead
//! power line.
//!
//! | Component | Module | Produces |
//! |-----------|--------|----------|
//! | [`ElectromagneticSystem`] | [`electromagnetic`] | Z and P matrices, Kron reduction, steady-state EMF |
//! | [`CircuitParameters`] | [`sequence`] | transposed and sequence impedance/susceptance of one circuit |
//! | [`PipelineElectricalParams`] | [`pipeline`] | pipeline z, y, γ, Zc |
//! | [`FaultAnalyzer`] | [`fault`] | screening factor and fault EMF |
//! | [`LongitudinalAnalyzer`] | [`longitudinal`] | voltage/current profile along the pipeline |
//! | [`RouteSectionizer`] | [`route`] | sections with average separation from two 3-D routes |
//! | [`InterferenceStudy`] | [`study`] | per-section EMF and vector-summed route voltage |
//!
//! ## Data flow
//!
//! ```text
//! RouteSectionizer ──► Section ──► ElectromagneticSystem ──► EMF (V/km) ──► Σ (V)
//!                                          │
//!                                          ├──► FaultAnalyzer
//! PipelineElectricalParams ───────────────────► LongitudinalAnalyzer
//! ```
//!
//! Units: lengths in metres for geometry, impedances per kilometre, EMF in
//! V/km, section and total voltages in V.
//!
//! ## Example
//!
//! ```rust
//! use emi_algo::ElectromagneticSystem;
//! use emi_core::{ConductorCatalog, ConductorSpec, ConductorType, Degrees, OperatingCurrents, SystemParameters};
//!
//! let catalog = ConductorCatalog::new()
//!     .with_type("ACSR", ConductorType::new(0.0085, 0.0107, 0.157)).unwrap()
//!     .with_type("pipe", ConductorType::new(0.3, 0.3, 0.0102)).unwrap();
//! let conductors = vec![
//!     ConductorSpec::phase("R", -8.2, 14.47, "ACSR", "C1", "R"),
//!     ConductorSpec::phase("Y", 0.0, 14.47, "ACSR", "C1", "Y"),
//!     ConductorSpec::phase("B", 8.2, 14.47, "ACSR", "C1", "B"),
//!     ConductorSpec::buried("pipeline", 60.0, 1.0, "pipe"),
//! ];
//! let params = SystemParameters::new(50.0, 100.0).unwrap();
//! let system = ElectromagneticSystem::build(&conductors, &params, &catalog).unwrap();
//!
//! let currents = OperatingCurrents::new().balanced(
//!     "C1",
//!     500.0,
//!     &[("R", Degrees(0.0)), ("Y", Degrees(-120.0)), ("B", Degrees(120.0))],
//! );
//! let emf = system.steady_state_emf(&currents).unwrap();
//! assert!(emf.emf.norm() > 0.0);
//! ```

pub mod electromagnetic;
pub mod fault;
pub mod longitudinal;
pub mod pipeline;
pub mod route;
pub mod sequence;
pub mod study;

pub use electromagnetic::{
    kron_reduce, EarthReturnModel, ElectromagneticSystem, EmfResult, ReducedSystem,
    ReductionOptions,
};
pub use fault::{
    ExactMatrix, FaultAnalyzer, FaultEmf, FixedEstimate, ScreeningFactor, ScreeningFactorStrategy,
};
pub use longitudinal::{
    BoundaryCondition, LineEnds, LongitudinalAnalyzer, ProfilePoint, SourceSegment, VoltageProfile,
};
pub use pipeline::{CoatingProperties, PipelineElectricalParams, PipelineProperties};
pub use route::{LinearScan, NearestDistance, RouteSectionizer, Section, SectionizerConfig};
pub use sequence::CircuitParameters;
pub use study::{
    FaultSectionResult, FaultStudyResult, InterferenceStudy, SectionResult, StudyOptions,
    StudyResult,
};
