use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use emi_algo::{
    FaultStudyResult, InterferenceStudy, RouteSectionizer, SectionizerConfig, StudyOptions,
    StudyResult,
};
use emi_cli::cli::CaseArgs;
use emi_cli::common::{log_diagnostics, polar, table, write_json, OutputFormat};
use emi_core::Route;
use serde::Serialize;
use tracing::info;

use super::{configure_threads, Case};

#[derive(Serialize)]
struct StudyReport {
    pipeline: String,
    ohl_route: String,
    pipeline_route: String,
    sectionizer: SectionizerConfig,
    options: StudyOptions,
    steady_state: StudyResult,
    total_voltage_magnitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    fault: Option<FaultStudyResult>,
}

fn load_route(path: &Path, what: &str) -> Result<Route> {
    emi_io::load_route(path).with_context(|| format!("loading {what} route from {}", path.display()))
}

pub struct RouteArgs<'a> {
    pub ohl_route: &'a Path,
    pub pipeline_route: &'a Path,
    pub step: f64,
    pub max_section: Option<f64>,
    pub with_fault: bool,
    pub threads: &'a str,
}

pub fn handle(args: &CaseArgs, route: RouteArgs<'_>, format: OutputFormat) -> Result<()> {
    let start = Instant::now();
    configure_threads(route.threads);

    let case = Case::load(args)?;
    let ohl_route = load_route(route.ohl_route, "overhead line")?;
    let pipeline_route = load_route(route.pipeline_route, "pipeline")?;

    let sectionizer_config = SectionizerConfig {
        sample_step_m: route.step,
        max_section_length_m: route.max_section,
    };
    let sections = RouteSectionizer::new(&ohl_route, sectionizer_config)?.sectionize(&pipeline_route)?;

    let options = StudyOptions {
        earth_return_model: case.model,
        ..StudyOptions::default()
    };
    // The route decides the separation, so the file's x_separation_m is ignored.
    let study = InterferenceStudy::new(
        case.ohl.conductors.clone(),
        case.catalog.clone(),
        case.ohl.params,
        case.pipeline.conductor_at(0.0),
        case.currents.steady_state.clone(),
    )
    .with_options(options);

    let steady_state = study.run(&sections)?;
    log_diagnostics(&steady_state.diagnostics);

    let fault = if route.with_fault {
        let condition = case.currents.require_fault()?;
        let result = study.fault_run(&sections, condition)?;
        log_diagnostics(&result.diagnostics);
        Some(result)
    } else {
        None
    };

    info!(
        sections = sections.len(),
        total = steady_state.total_voltage.norm(),
        "route study finished in {:.3} s",
        start.elapsed().as_secs_f64()
    );

    let report = StudyReport {
        pipeline: case.pipeline.name.clone(),
        ohl_route: ohl_route.name.clone(),
        pipeline_route: pipeline_route.name.clone(),
        sectionizer: sectionizer_config,
        options,
        total_voltage_magnitude: steady_state.total_voltage.norm(),
        steady_state,
        fault,
    };

    match format {
        OutputFormat::Json => write_json(&report, &mut io::stdout())?,
        OutputFormat::Table => print_table(&report)?,
    }
    Ok(())
}

fn print_table(report: &StudyReport) -> Result<()> {
    let result = &report.steady_state;
    println!(
        "Pipeline '{}' along '{}': {} section(s), {:.1} m",
        report.pipeline,
        report.ohl_route,
        result.sections.len(),
        result.total_length_m
    );
    let mut writer = table();
    writeln!(
        writer,
        "SECTION\tSTART (m)\tLENGTH (m)\tSEPARATION (m)\tEMF (V/km)\tVOLTAGE (V)"
    )?;
    for s in &result.sections {
        writeln!(
            writer,
            "{}\t{:.1}\t{:.1}\t{:.2}\t{}\t{}",
            s.index + 1,
            s.start_chainage_m,
            s.length_m,
            s.average_separation_m,
            polar(s.emf, 3),
            polar(s.voltage, 3)
        )?;
    }
    writer.flush()?;
    println!("Total voltage (vector sum): {} V", polar(result.total_voltage, 3));
    println!("Scalar sum of |V|:          {:.3} V", result.scalar_sum);

    if let Some(fault) = &report.fault {
        println!("\nFault on {}", fault.faulted_phase);
        let mut writer = table();
        writeln!(writer, "SECTION\tSEPARATION (m)\t|k|\tEMF (V/km)\tVOLTAGE (V)")?;
        for s in &fault.sections {
            writeln!(
                writer,
                "{}\t{:.2}\t{:.4}\t{}\t{}",
                s.index + 1,
                s.average_separation_m,
                s.k.norm(),
                polar(s.emf, 2),
                polar(s.voltage, 2)
            )?;
        }
        writer.flush()?;
        println!("Total fault voltage: {} V", polar(fault.total_voltage, 2));
    }

    if result.diagnostics.has_issues() {
        println!("{}", result.diagnostics.summary());
    }
    Ok(())
}
