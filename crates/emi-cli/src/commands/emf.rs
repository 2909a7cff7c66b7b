use std::io::{self, Write};

use anyhow::Result;
use emi_algo::EarthReturnModel;
use emi_cli::cli::CaseArgs;
use emi_cli::common::{log_diagnostics, polar, rect, table, write_json, OutputFormat};
use emi_core::Diagnostics;
use num_complex::Complex64;
use serde::Serialize;
use tracing::info;

use super::Case;

#[derive(Serialize)]
struct Contribution {
    conductor: String,
    emf: Complex64,
}

#[derive(Serialize)]
struct EmfReport {
    pipeline: String,
    x_separation_m: f64,
    earth_return_model: EarthReturnModel,
    /// V/km
    emf: Complex64,
    emf_magnitude: f64,
    contributions: Vec<Contribution>,
    diagnostics: Diagnostics,
}

pub fn handle(args: &CaseArgs, format: OutputFormat) -> Result<()> {
    let case = Case::load(args)?;
    let system = case.system()?;
    let result = system.steady_state_emf(&case.currents.steady_state)?;
    log_diagnostics(&result.diagnostics);
    info!(emf = result.emf.norm(), "steady-state EMF computed");

    let report = EmfReport {
        pipeline: case.pipeline.name.clone(),
        x_separation_m: case.pipeline.x_separation.map_or(0.0, |x| x.value()),
        earth_return_model: case.model,
        emf: result.emf,
        emf_magnitude: result.emf.norm(),
        contributions: result
            .contributions
            .into_iter()
            .map(|(conductor, emf)| Contribution { conductor, emf })
            .collect(),
        diagnostics: result.diagnostics,
    };

    match format {
        OutputFormat::Json => write_json(&report, &mut io::stdout())?,
        OutputFormat::Table => print_table(&report)?,
    }
    Ok(())
}

fn print_table(report: &EmfReport) -> Result<()> {
    println!(
        "Pipeline '{}' at {:.1} m: EMF {} V/km ({})",
        report.pipeline,
        report.x_separation_m,
        polar(report.emf, 3),
        rect(report.emf, 4)
    );
    let mut writer = table();
    writeln!(writer, "CONDUCTOR\tEMF (V/km)\t|EMF|\tANGLE (deg)")?;
    for c in &report.contributions {
        writeln!(
            writer,
            "{}\t{}\t{:.4}\t{:.2}",
            c.conductor,
            rect(c.emf, 4),
            c.emf.norm(),
            c.emf.arg().to_degrees()
        )?;
    }
    writer.flush()?;
    if report.diagnostics.has_issues() {
        println!("{}", report.diagnostics.summary());
    }
    Ok(())
}
