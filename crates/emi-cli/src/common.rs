//! Output helpers shared across commands.

use std::io::{self, Write};

use clap::ValueEnum;
use emi_core::{Diagnostics, Severity};
use num_complex::Complex64;
use serde::Serialize;
use tabwriter::TabWriter;
use tracing::{error, warn};

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable aligned table
    #[default]
    Table,
    /// Pretty-printed JSON (pipe-friendly)
    Json,
}

/// Write data as JSON to the given writer.
pub fn write_json<W: Write, T: Serialize>(data: &T, writer: &mut W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, data).map_err(io::Error::other)?;
    writeln!(writer)?;
    Ok(())
}

pub fn table() -> TabWriter<io::Stdout> {
    TabWriter::new(io::stdout()).padding(2)
}

/// `a+bj` with fixed decimals.
pub fn rect(z: Complex64, decimals: usize) -> String {
    let sign = if z.im < 0.0 { '-' } else { '+' };
    format!("{:.*}{sign}{:.*}j", decimals, z.re, decimals, z.im.abs())
}

/// Magnitude and angle in degrees.
pub fn polar(z: Complex64, decimals: usize) -> String {
    format!("{:.*} ∠ {:.2}°", decimals, z.norm(), z.arg().to_degrees())
}

/// Surface diagnostics through the log so stdout stays clean for piping.
pub fn log_diagnostics(diagnostics: &Diagnostics) {
    for issue in &diagnostics.issues {
        match issue.severity {
            Severity::Warning => warn!("{issue}"),
            Severity::Error => error!("{issue}"),
        }
    }
}
