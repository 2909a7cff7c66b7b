use std::process::ExitCode;

use clap::Parser;
use emi_cli::cli::{Cli, Commands};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Params {
            ohl,
            pipeline,
            earth_model,
            format,
        } => {
            info!("Computing line parameters for {}", ohl.display());
            commands::params::handle(ohl, pipeline.as_deref(), (*earth_model).into(), *format)
        }
        Commands::Emf { case, format } => commands::emf::handle(case, *format),
        Commands::Fault {
            case,
            fixed_k,
            length_km,
            format,
        } => commands::fault::handle(case, *fixed_k, *length_km, *format),
        Commands::Profile {
            case,
            length_km,
            start,
            end,
            points,
            format,
        } => commands::profile::handle(case, *length_km, *start, *end, *points, *format),
        Commands::Study {
            case,
            ohl_route,
            pipeline_route,
            step,
            max_section,
            with_fault,
            threads,
            format,
        } => commands::study::handle(
            case,
            commands::study::RouteArgs {
                ohl_route,
                pipeline_route,
                step: *step,
                max_section: *max_section,
                with_fault: *with_fault,
                threads,
            },
            *format,
        ),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {e}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
