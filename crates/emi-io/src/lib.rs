//! # emi-io: Study Configuration Files
//!
//! JSON configuration boundary for the interference engine. Each loader reads
//! one file, validates it once, and returns strongly typed core values; the
//! engine never sees raw JSON.
//!
//! | File | Loader | Result |
//! |------|--------|--------|
//! | tower geometry + conductor types | [`load_ohl_config`] | [`OhlConfig`] |
//! | pipeline properties | [`load_pipeline_config`] | [`PipelineConfig`] |
//! | operating and fault currents | [`load_currents_config`] | [`CurrentsConfig`] |
//! | route trajectory | [`load_route`] | [`Route`](emi_core::Route) |
//!
//! Every loader has a `*_from_str` twin for in-memory JSON. Malformed JSON
//! is an [`EmiError::Parse`]; well-formed but invalid content fails with the
//! validation error of the core type it builds.
//!
//! ```rust
//! use emi_io::load_currents_from_str;
//!
//! let currents = load_currents_from_str(r#"{
//!     "description": "balanced 500 A",
//!     "C1": { "R": "500+0j", "Y": "(-250-433.013j)", "B": [-250.0, 433.013] }
//! }"#).unwrap();
//! assert_eq!(currents.steady_state.len(), 3);
//! ```

use std::{fs, path::Path};

use emi_core::{EmiError, EmiResult};
use serde::de::DeserializeOwned;

pub mod currents;
pub mod ohl;
pub mod pipeline;
pub mod route;

pub use currents::{
    load_currents_config, load_currents_from_str, parse_complex, CurrentsConfig, PhasorValue,
};
pub use ohl::{load_ohl_config, load_ohl_from_str, OhlConfig};
pub use pipeline::{load_pipeline_config, load_pipeline_from_str, PipelineConfig};
pub use route::{load_route, load_route_from_str};

fn read_file(path: &Path) -> EmiResult<String> {
    fs::read_to_string(path).map_err(EmiError::from)
}

fn parse_json<T: DeserializeOwned>(text: &str, what: &str) -> EmiResult<T> {
    serde_json::from_str(text).map_err(|e| EmiError::Parse(format!("{what}: {e}")))
}

fn require_finite(name: &str, value: f64) -> EmiResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EmiError::Parse(format!("{name} must be a finite number, got {value}")))
    }
}
