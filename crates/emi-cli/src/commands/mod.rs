pub mod emf;
pub mod fault;
pub mod params;
pub mod profile;
pub mod study;

use std::path::Path;

use anyhow::{Context, Result};
use emi_algo::{EarthReturnModel, ElectromagneticSystem, PipelineElectricalParams};
use emi_cli::cli::CaseArgs;
use emi_core::{ConductorCatalog, ConductorSpec};
use emi_io::{CurrentsConfig, OhlConfig, PipelineConfig};
use rayon::ThreadPoolBuilder;
use tracing::{info, warn};

pub fn load_ohl(path: &Path) -> Result<OhlConfig> {
    let ohl = emi_io::load_ohl_config(path)
        .with_context(|| format!("loading overhead line from {}", path.display()))?;
    info!(
        conductors = ohl.conductors.len(),
        earth_wires = ohl.earth_wire_count(),
        "loaded tower geometry from {}",
        path.display()
    );
    Ok(ohl)
}

pub fn load_pipeline(path: &Path) -> Result<PipelineConfig> {
    emi_io::load_pipeline_config(path)
        .with_context(|| format!("loading pipeline from {}", path.display()))
}

pub fn load_currents(path: &Path) -> Result<CurrentsConfig> {
    emi_io::load_currents_config(path)
        .with_context(|| format!("loading currents from {}", path.display()))
}

/// Tower, pipeline and currents of one exposure, with the pipeline type
/// registered in the conductor catalog.
pub struct Case {
    pub ohl: OhlConfig,
    pub pipeline: PipelineConfig,
    pub currents: CurrentsConfig,
    pub catalog: ConductorCatalog,
    pub model: EarthReturnModel,
}

impl Case {
    pub fn load(args: &CaseArgs) -> Result<Self> {
        let ohl = load_ohl(&args.ohl)?;
        let pipeline = load_pipeline(&args.pipeline)?;
        let currents = load_currents(&args.currents)?;
        let mut catalog = ohl.catalog.clone();
        pipeline.register(&mut catalog)?;
        Ok(Self {
            ohl,
            pipeline,
            currents,
            catalog,
            model: args.earth_model.into(),
        })
    }

    /// Tower conductors plus the pipeline at its configured separation.
    pub fn conductors(&self) -> Result<Vec<ConductorSpec>> {
        let mut conductors = self.ohl.conductors.clone();
        conductors.push(self.pipeline.conductor()?);
        Ok(conductors)
    }

    pub fn system(&self) -> Result<ElectromagneticSystem> {
        let system = ElectromagneticSystem::build_with_model(
            &self.conductors()?,
            &self.ohl.params,
            &self.catalog,
            self.model,
        )?;
        Ok(system)
    }

    pub fn electrical(&self) -> Result<PipelineElectricalParams> {
        Ok(PipelineElectricalParams::compute(
            &self.pipeline.properties,
            &self.ohl.params,
        )?)
    }
}

pub fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        match spec.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                let cores = num_cpus::get();
                warn!("invalid --threads value '{spec}', using {cores} threads");
                cores
            }
        }
    };
    if let Err(e) = ThreadPoolBuilder::new().num_threads(count).build_global() {
        warn!("thread pool not reconfigured: {e}");
    }
}
