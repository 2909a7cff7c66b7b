use std::io::{self, Write};

use anyhow::{bail, Result};
use emi_algo::{BoundaryCondition, LineEnds, LongitudinalAnalyzer, PipelineElectricalParams, ProfilePoint};
use emi_cli::cli::{BoundarySpec, CaseArgs};
use emi_cli::common::{log_diagnostics, polar, rect, table, write_json, OutputFormat};
use num_complex::Complex64;
use serde::Serialize;
use tracing::info;

use super::Case;

#[derive(Serialize)]
struct ProfileReport {
    pipeline: String,
    length_km: f64,
    /// Driving EMF (V/km)
    emf: Complex64,
    electrical: PipelineElectricalParams,
    ends: LineEnds,
    points: Vec<ProfilePoint>,
    max_voltage: ProfilePoint,
}

fn resolve(spec: BoundarySpec, zc: Complex64) -> BoundaryCondition {
    match spec {
        BoundarySpec::Open => BoundaryCondition::Open,
        BoundarySpec::Grounded => BoundaryCondition::Grounded,
        BoundarySpec::Matched => BoundaryCondition::Impedance(zc),
        BoundarySpec::Impedance(z) => BoundaryCondition::Impedance(z),
    }
}

pub fn handle(
    args: &CaseArgs,
    length_km: f64,
    start: BoundarySpec,
    end: BoundarySpec,
    points: usize,
    format: OutputFormat,
) -> Result<()> {
    if !(length_km.is_finite() && length_km > 0.0) {
        bail!("pipeline length must be positive, got {length_km} km");
    }

    let case = Case::load(args)?;
    let system = case.system()?;
    let emf = system.steady_state_emf(&case.currents.steady_state)?;
    log_diagnostics(&emf.diagnostics);

    let electrical = case.electrical()?;
    let ends = LineEnds::new(resolve(start, electrical.zc), resolve(end, electrical.zc));
    let profile = LongitudinalAnalyzer::new(electrical).solve_uniform(emf.emf, length_km, ends)?;
    let samples = profile.sample(points)?;
    let max_voltage = profile.max_voltage(points)?;
    info!(
        max_voltage = max_voltage.voltage.norm(),
        at_km = max_voltage.x_km,
        "voltage profile solved"
    );

    let report = ProfileReport {
        pipeline: case.pipeline.name.clone(),
        length_km,
        emf: emf.emf,
        electrical,
        ends,
        points: samples,
        max_voltage,
    };

    match format {
        OutputFormat::Json => write_json(&report, &mut io::stdout())?,
        OutputFormat::Table => print_table(&report)?,
    }
    Ok(())
}

fn print_table(report: &ProfileReport) -> Result<()> {
    println!(
        "Pipeline '{}', {} km, EMF {} V/km, Zc {} ohm",
        report.pipeline,
        report.length_km,
        polar(report.emf, 3),
        rect(report.electrical.zc, 3)
    );
    let mut writer = table();
    writeln!(writer, "X (km)\t|V| (V)\tV ANGLE (deg)\t|I| (A)\tI ANGLE (deg)")?;
    for p in &report.points {
        writeln!(
            writer,
            "{:.3}\t{:.3}\t{:.2}\t{:.3}\t{:.2}",
            p.x_km,
            p.voltage.norm(),
            p.voltage.arg().to_degrees(),
            p.current.norm(),
            p.current.arg().to_degrees()
        )?;
    }
    writer.flush()?;
    println!(
        "Max |V| {:.3} V at {:.3} km",
        report.max_voltage.voltage.norm(),
        report.max_voltage.x_km
    );
    Ok(())
}
