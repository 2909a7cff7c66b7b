//! Operating and fault current file.
//!
//! Every top-level key other than `description` and `fault` is a circuit id
//! mapping phase labels to phasors:
//!
//! ```json
//! {
//!   "description": "winter peak",
//!   "C1": { "R": "500+0j", "Y": "(-250-433.013j)", "B": "(-250+433.013j)" },
//!   "C2": { "R": [500.0, 0.0], "Y": { "magnitude": 500, "angle_deg": -120 }, "B": 500 },
//!   "fault": { "current": "13000+0j", "faulted_phase": "C1_R" }
//! }
//! ```
//!
//! Phasors are accepted as complex literals (`"a+bj"`, optionally in
//! parentheses), `[re, im]` pairs, polar objects, or plain real numbers.

use std::{collections::BTreeMap, path::Path};

use emi_core::{Degrees, EmiError, EmiResult, FaultCondition, OperatingCurrents};
use num_complex::Complex64;
use serde::Deserialize;
use thiserror::Error;

use crate::{parse_json, read_file};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhasorError {
    #[error("empty complex literal")]
    Empty,
    #[error("invalid complex literal '{0}'")]
    Invalid(String),
}

impl From<PhasorError> for EmiError {
    fn from(err: PhasorError) -> Self {
        EmiError::Parse(err.to_string())
    }
}

/// Parse a complex literal such as `500+0j`, `(-250-433.01j)`, `-12.5j`,
/// `1e3-2.5e-1J` or `42`.
pub fn parse_complex(text: &str) -> Result<Complex64, PhasorError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let s = compact
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(&compact);
    if s.is_empty() {
        return Err(PhasorError::Empty);
    }
    let invalid = || PhasorError::Invalid(text.to_string());

    let Some(body) = s.strip_suffix(['j', 'J']) else {
        return finite(s).map(|re| Complex64::new(re, 0.0)).ok_or_else(invalid);
    };

    // sign that starts the imaginary part: not leading, not an exponent sign
    let bytes = body.as_bytes();
    let split = (1..bytes.len())
        .rev()
        .find(|&i| matches!(bytes[i], b'+' | b'-') && !matches!(bytes[i - 1], b'e' | b'E'));

    let (re, im) = match split {
        Some(i) => (finite(&body[..i]), imaginary(&body[i..])),
        None => (Some(0.0), imaginary(body)),
    };
    match (re, im) {
        (Some(re), Some(im)) => Ok(Complex64::new(re, im)),
        _ => Err(invalid()),
    }
}

fn finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn imaginary(s: &str) -> Option<f64> {
    match s {
        "" | "+" => Some(1.0),
        "-" => Some(-1.0),
        _ => finite(s),
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PhasorValue {
    Text(String),
    Rectangular([f64; 2]),
    Polar { magnitude: f64, angle_deg: f64 },
    Real(f64),
}

impl PhasorValue {
    pub fn to_complex(&self) -> EmiResult<Complex64> {
        let value = match self {
            PhasorValue::Text(s) => parse_complex(s)?,
            PhasorValue::Rectangular([re, im]) => Complex64::new(*re, *im),
            PhasorValue::Polar {
                magnitude,
                angle_deg,
            } => Complex64::from_polar(*magnitude, Degrees(*angle_deg).to_radians()),
            PhasorValue::Real(re) => Complex64::new(*re, 0.0),
        };
        if value.re.is_finite() && value.im.is_finite() {
            Ok(value)
        } else {
            Err(EmiError::Parse(format!("non-finite phasor {value}")))
        }
    }
}

#[derive(Debug, Deserialize)]
struct CurrentsFile {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    fault: Option<FaultJson>,
    #[serde(flatten)]
    circuits: BTreeMap<String, BTreeMap<String, PhasorValue>>,
}

#[derive(Debug, Deserialize)]
struct FaultJson {
    current: PhasorValue,
    faulted_phase: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentsConfig {
    pub description: Option<String>,
    pub steady_state: OperatingCurrents,
    pub fault: Option<FaultCondition>,
}

impl CurrentsConfig {
    pub fn require_fault(&self) -> EmiResult<&FaultCondition> {
        self.fault
            .as_ref()
            .ok_or_else(|| EmiError::configuration("currents file has no fault section"))
    }
}

pub fn load_currents_config(path: impl AsRef<Path>) -> EmiResult<CurrentsConfig> {
    let path = path.as_ref();
    let text = read_file(path)?;
    load_currents_from_str(&text).map_err(|e| match e {
        EmiError::Parse(msg) => EmiError::Parse(format!("{}: {msg}", path.display())),
        other => other,
    })
}

pub fn load_currents_from_str(text: &str) -> EmiResult<CurrentsConfig> {
    let file: CurrentsFile = parse_json(text, "currents configuration")?;

    let mut steady_state = OperatingCurrents::new();
    for (circuit, phases) in &file.circuits {
        for (phase, value) in phases {
            let current = value.to_complex().map_err(|e| {
                EmiError::Parse(format!("circuit '{circuit}' phase '{phase}': {e}"))
            })?;
            steady_state.insert(circuit.as_str(), phase.as_str(), current);
        }
    }

    let fault = file
        .fault
        .map(|f| -> EmiResult<FaultCondition> {
            Ok(FaultCondition::new(f.current.to_complex()?, f.faulted_phase))
        })
        .transpose()?;

    if steady_state.is_empty() && fault.is_none() {
        return Err(EmiError::configuration(
            "currents file defines neither circuit currents nor a fault",
        ));
    }

    Ok(CurrentsConfig {
        description: file.description,
        steady_state,
        fault,
    })
}
