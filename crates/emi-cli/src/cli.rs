use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use num_complex::Complex64;

use crate::common::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Impedance and potential matrices, sequence parameters, pipeline constants
    Params {
        /// Overhead line tower file
        #[arg(long, value_hint = ValueHint::FilePath)]
        ohl: PathBuf,
        /// Pipeline file; placed at its x_separation_m when given
        #[arg(long, value_hint = ValueHint::FilePath)]
        pipeline: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = EarthModel::CarsonClem)]
        earth_model: EarthModel,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Steady-state EMF induced on the pipeline (V/km)
    Emf {
        #[command(flatten)]
        case: CaseArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Fault EMF with earth-wire screening
    Fault {
        #[command(flatten)]
        case: CaseArgs,
        /// Use this screening factor instead of the matrix value, as RE,IM
        #[arg(long, value_parser = parse_fixed_k)]
        fixed_k: Option<Complex64>,
        /// Exposure length; reports the open-circuit voltage over it
        #[arg(long)]
        length_km: Option<f64>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Voltage and current along a uniformly exposed pipeline
    Profile {
        #[command(flatten)]
        case: CaseArgs,
        #[arg(long)]
        length_km: f64,
        /// Start termination: open, grounded, zc or an impedance in ohms
        #[arg(long, default_value = "open")]
        start: BoundarySpec,
        /// End termination: open, grounded, zc or an impedance in ohms
        #[arg(long, default_value = "open")]
        end: BoundarySpec,
        /// Sample count along the line
        #[arg(long, default_value_t = 11)]
        points: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Route study: sectioning, per-section EMF and total voltage
    Study {
        #[command(flatten)]
        case: CaseArgs,
        #[arg(long, value_hint = ValueHint::FilePath)]
        ohl_route: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        pipeline_route: PathBuf,
        /// Distance sampling step along the pipeline (m)
        #[arg(long, default_value_t = 10.0)]
        step: f64,
        /// Split pipeline segments longer than this (m)
        #[arg(long)]
        max_section: Option<f64>,
        /// Also evaluate the fault case from the currents file
        #[arg(long)]
        with_fault: bool,
        /// Number of worker threads ("auto" = all cores)
        #[arg(long, default_value = "auto")]
        threads: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Input files shared by every exposure command.
#[derive(Args, Debug, Clone)]
pub struct CaseArgs {
    /// Overhead line tower file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub ohl: PathBuf,
    /// Pipeline file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub pipeline: PathBuf,
    /// Operating and fault currents file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub currents: PathBuf,
    #[arg(long, value_enum, default_value_t = EarthModel::CarsonClem)]
    pub earth_model: EarthModel,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EarthModel {
    /// Carson-Clem closed form
    #[default]
    CarsonClem,
    /// Complex penetration depth
    ComplexDepth,
}

impl From<EarthModel> for emi_algo::EarthReturnModel {
    fn from(model: EarthModel) -> Self {
        match model {
            EarthModel::CarsonClem => emi_algo::EarthReturnModel::CarsonClem,
            EarthModel::ComplexDepth => emi_algo::EarthReturnModel::ComplexDepth,
        }
    }
}

/// Pipeline termination as written on the command line. `Matched` needs the
/// pipeline's characteristic impedance and is resolved later.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundarySpec {
    Open,
    Grounded,
    Matched,
    Impedance(Complex64),
}

impl FromStr for BoundarySpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "grounded" | "earthed" => Ok(Self::Grounded),
            "zc" | "matched" => Ok(Self::Matched),
            other => emi_io::parse_complex(other)
                .map(Self::Impedance)
                .map_err(|e| format!("{e}; expected open, grounded, zc or ohms")),
        }
    }
}

fn parse_fixed_k(s: &str) -> Result<Complex64, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let value = |p: &str| {
        p.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid number '{p}' in screening factor"))
    };
    match parts.as_slice() {
        [re] => Ok(Complex64::new(value(re)?, 0.0)),
        [re, im] => Ok(Complex64::new(value(re)?, value(im)?)),
        _ => Err(format!("expected RE or RE,IM, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn boundary_specs() {
        assert_eq!("open".parse::<BoundarySpec>(), Ok(BoundarySpec::Open));
        assert_eq!("Grounded".parse::<BoundarySpec>(), Ok(BoundarySpec::Grounded));
        assert_eq!("zc".parse::<BoundarySpec>(), Ok(BoundarySpec::Matched));
        assert_eq!(
            "5".parse::<BoundarySpec>(),
            Ok(BoundarySpec::Impedance(Complex64::new(5.0, 0.0)))
        );
        assert_eq!(
            "2+1j".parse::<BoundarySpec>(),
            Ok(BoundarySpec::Impedance(Complex64::new(2.0, 1.0)))
        );
        assert!("shorted".parse::<BoundarySpec>().is_err());
    }

    #[test]
    fn fixed_k_forms() {
        assert_eq!(parse_fixed_k("0.7"), Ok(Complex64::new(0.7, 0.0)));
        assert_eq!(parse_fixed_k("0.7, 0.02"), Ok(Complex64::new(0.7, 0.02)));
        assert!(parse_fixed_k("0.7,0.02,1").is_err());
        assert!(parse_fixed_k("k").is_err());
    }
}
