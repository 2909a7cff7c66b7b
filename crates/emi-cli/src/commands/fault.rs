use std::io::{self, Write};

use anyhow::{bail, Result};
use emi_algo::{ExactMatrix, FaultAnalyzer, FixedEstimate, ScreeningFactorStrategy};
use emi_cli::cli::CaseArgs;
use emi_cli::common::{log_diagnostics, polar, rect, table, write_json, OutputFormat};
use emi_core::Diagnostics;
use num_complex::Complex64;
use serde::Serialize;
use tracing::info;

use super::Case;

#[derive(Serialize)]
struct FaultReport {
    faulted_phase: String,
    fault_current: Complex64,
    strategy: &'static str,
    k: Complex64,
    k_magnitude: f64,
    /// Pipeline to faulted-phase mutual impedance (Ω/km)
    mutual_impedance: Complex64,
    /// V/km
    emf: Complex64,
    emf_magnitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    length_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    voltage: Option<Complex64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    voltage_magnitude: Option<f64>,
    diagnostics: Diagnostics,
}

pub fn handle(
    args: &CaseArgs,
    fixed_k: Option<Complex64>,
    length_km: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    if let Some(length) = length_km {
        if !(length.is_finite() && length >= 0.0) {
            bail!("exposure length must be non-negative, got {length} km");
        }
    }

    let case = Case::load(args)?;
    let fault = case.currents.require_fault()?;
    let system = case.system()?;

    let strategy: Box<dyn ScreeningFactorStrategy> = match fixed_k {
        Some(k) => Box::new(FixedEstimate { k }),
        None => Box::new(ExactMatrix),
    };
    let result = FaultAnalyzer::new(&system).fault_emf_with(fault, strategy.as_ref())?;
    log_diagnostics(&result.diagnostics);
    info!(
        phase = %fault.faulted_phase,
        strategy = result.strategy,
        emf = result.emf.norm(),
        "fault EMF computed"
    );

    let voltage = length_km.map(|l| result.emf * l);
    let report = FaultReport {
        faulted_phase: fault.faulted_phase.clone(),
        fault_current: fault.current,
        strategy: result.strategy,
        k: result.k,
        k_magnitude: result.k.norm(),
        mutual_impedance: result.mutual_impedance,
        emf: result.emf,
        emf_magnitude: result.emf.norm(),
        length_km,
        voltage,
        voltage_magnitude: voltage.map(|v| v.norm()),
        diagnostics: result.diagnostics,
    };

    match format {
        OutputFormat::Json => write_json(&report, &mut io::stdout())?,
        OutputFormat::Table => print_table(&report)?,
    }
    Ok(())
}

fn print_table(report: &FaultReport) -> Result<()> {
    let mut writer = table();
    writeln!(writer, "Faulted phase\t{}", report.faulted_phase)?;
    writeln!(writer, "Fault current (A)\t{}", polar(report.fault_current, 1))?;
    writeln!(writer, "Screening factor k\t{} ({})", rect(report.k, 6), report.strategy)?;
    writeln!(writer, "|k|\t{:.6}", report.k_magnitude)?;
    writeln!(writer, "Z_pf (ohm/km)\t{}", rect(report.mutual_impedance, 6))?;
    writeln!(writer, "EMF (V/km)\t{}", polar(report.emf, 3))?;
    if let (Some(length), Some(voltage)) = (report.length_km, report.voltage) {
        writeln!(writer, "Voltage over {length} km (V)\t{}", polar(voltage, 2))?;
    }
    writer.flush()?;
    if report.diagnostics.has_issues() {
        println!("{}", report.diagnostics.summary());
    }
    Ok(())
}
