use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use emi_algo::{CircuitParameters, EarthReturnModel, ElectromagneticSystem, PipelineElectricalParams};
use emi_cli::common::{log_diagnostics, rect, table, write_json, OutputFormat};
use emi_core::{ComplexMatrix, EmiError, RealMatrix};
use serde::Serialize;
use tracing::{info, warn};

use super::{load_ohl, load_pipeline};

#[derive(Serialize)]
struct PipelineReport {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    x_separation_m: Option<f64>,
    electrical: PipelineElectricalParams,
    attenuation_length_km: f64,
}

#[derive(Serialize)]
struct ParamsReport {
    frequency_hz: f64,
    earth_resistivity_ohmm: f64,
    earth_return_model: EarthReturnModel,
    earth_return_depth_m: f64,
    /// Conductor labels in matrix order
    labels: Vec<String>,
    /// Ω/km
    impedance_matrix: ComplexMatrix,
    /// km/μF
    potential_matrix: RealMatrix,
    circuits: Vec<CircuitParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pipeline: Option<PipelineReport>,
}

pub fn handle(
    ohl_path: &Path,
    pipeline_path: Option<&Path>,
    model: EarthReturnModel,
    format: OutputFormat,
) -> Result<()> {
    let ohl = load_ohl(ohl_path)?;
    let pipeline = pipeline_path.map(load_pipeline).transpose()?;

    let tower = ElectromagneticSystem::build_with_model(&ohl.conductors, &ohl.params, &ohl.catalog, model)?;
    let mut circuits = Vec::new();
    for id in ohl.circuits() {
        match CircuitParameters::for_circuit(&tower, &id) {
            Ok(parameters) => {
                log_diagnostics(&parameters.diagnostics);
                circuits.push(parameters);
            }
            Err(EmiError::Configuration(msg)) => {
                warn!("skipping sequence parameters for circuit {id}: {msg}")
            }
            Err(e) => return Err(e.into()),
        }
    }

    // Matrices include the pipeline when it has a fixed position.
    let mut conductors = ohl.conductors.clone();
    let mut catalog = ohl.catalog.clone();
    let mut pipeline_report = None;
    if let Some(pipe) = &pipeline {
        if let Some(x) = pipe.x_separation {
            pipe.register(&mut catalog)?;
            conductors.push(pipe.conductor_at(x.value()));
        }
        let electrical = PipelineElectricalParams::compute(&pipe.properties, &ohl.params)?;
        pipeline_report = Some(PipelineReport {
            name: pipe.name.clone(),
            x_separation_m: pipe.x_separation.map(|x| x.value()),
            electrical,
            attenuation_length_km: electrical.attenuation_length_km(),
        });
    }
    let system = ElectromagneticSystem::build_with_model(&conductors, &ohl.params, &catalog, model)?;
    info!(
        conductors = conductors.len(),
        circuits = circuits.len(),
        "line parameters computed"
    );

    let report = ParamsReport {
        frequency_hz: ohl.params.frequency.value(),
        earth_resistivity_ohmm: ohl.params.earth_resistivity.value(),
        earth_return_model: model,
        earth_return_depth_m: ohl.params.earth_return_depth(),
        labels: system.conductors().iter().map(|c| c.label.clone()).collect(),
        impedance_matrix: system.impedance_matrix().clone(),
        potential_matrix: system.potential_matrix().clone(),
        circuits,
        pipeline: pipeline_report,
    };

    match format {
        OutputFormat::Json => write_json(&report, &mut io::stdout())?,
        OutputFormat::Table => print_table(&report)?,
    }
    Ok(())
}

fn print_table(report: &ParamsReport) -> Result<()> {
    println!(
        "f = {} Hz, rho = {} ohm-m, D_e = {:.2} m",
        report.frequency_hz, report.earth_resistivity_ohmm, report.earth_return_depth_m
    );

    println!("\nImpedance matrix Z (ohm/km)");
    let mut writer = table();
    writeln!(writer, "\t{}", report.labels.join("\t"))?;
    for (i, label) in report.labels.iter().enumerate() {
        let row: Vec<String> = (0..report.labels.len())
            .map(|j| rect(report.impedance_matrix.get(i, j), 5))
            .collect();
        writeln!(writer, "{label}\t{}", row.join("\t"))?;
    }
    writer.flush()?;

    println!("\nPotential coefficient matrix P (km/uF)");
    let mut writer = table();
    writeln!(writer, "\t{}", report.labels.join("\t"))?;
    for (i, label) in report.labels.iter().enumerate() {
        let row: Vec<String> = (0..report.labels.len())
            .map(|j| format!("{:.3}", report.potential_matrix.get(i, j)))
            .collect();
        writeln!(writer, "{label}\t{}", row.join("\t"))?;
    }
    writer.flush()?;

    if !report.circuits.is_empty() {
        println!("\nSequence parameters (transposed)");
        let mut writer = table();
        writeln!(writer, "CIRCUIT\tZ1 (ohm/km)\tZ0 (ohm/km)\tB1 (uS/km)\tB0 (uS/km)")?;
        for c in &report.circuits {
            writeln!(
                writer,
                "{}\t{}\t{}\t{:.4}\t{:.4}",
                c.circuit,
                rect(c.positive_sequence_impedance(), 5),
                rect(c.zero_sequence_impedance(), 5),
                c.positive_sequence_susceptance(),
                c.zero_sequence_susceptance()
            )?;
        }
        writer.flush()?;
    }

    if let Some(pipe) = &report.pipeline {
        let e = &pipe.electrical;
        println!("\nPipeline '{}'", pipe.name);
        let mut writer = table();
        writeln!(writer, "z (ohm/km)\t{}", rect(e.z, 5))?;
        writeln!(writer, "y (S/km)\t{:.4e}{:+.4e}j", e.y.re, e.y.im)?;
        writeln!(writer, "gamma (1/km)\t{}", rect(e.gamma, 5))?;
        writeln!(writer, "Zc (ohm)\t{}", rect(e.zc, 3))?;
        writeln!(writer, "1/Re(gamma) (km)\t{:.3}", pipe.attenuation_length_km)?;
        writer.flush()?;
    }
    Ok(())
}
