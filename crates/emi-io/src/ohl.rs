//! Overhead line tower file.
//!
//! ```json
//! {
//!   "system_parameters": { "frequency": 50, "earth_resistivity": 20 },
//!   "conductor_types": {
//!     "quad_zebra": { "gmr_impedance": 0.328, "gmr_potential": 0.2243, "r_ac": 0.0169 }
//!   },
//!   "tower_geometry": [
//!     { "conductor_id": "C1_R", "x": -1.0, "y": 32.26, "type": "quad_zebra",
//!       "circuit_id": "C1", "phase": "R" },
//!     { "conductor_id": "EW", "x": 0.0, "y": 50.76, "type": "earth_wire",
//!       "circuit_id": null, "phase": null }
//!   ]
//! }
//! ```
//!
//! A conductor without `circuit_id` is an earth wire.

use std::{collections::BTreeMap, collections::HashSet, path::Path};

use emi_core::{
    ConductorCatalog, ConductorRole, ConductorSpec, ConductorType, EmiError, EmiResult,
    SystemParameters,
};
use serde::Deserialize;

use crate::{parse_json, read_file, require_finite};

#[derive(Debug, Deserialize)]
struct OhlFile {
    system_parameters: ParametersJson,
    conductor_types: BTreeMap<String, ConductorTypeJson>,
    tower_geometry: Vec<TowerConductorJson>,
}

#[derive(Debug, Deserialize)]
struct ParametersJson {
    frequency: f64,
    earth_resistivity: f64,
}

#[derive(Debug, Deserialize)]
struct ConductorTypeJson {
    gmr_impedance: f64,
    gmr_potential: f64,
    r_ac: f64,
}

#[derive(Debug, Deserialize)]
struct TowerConductorJson {
    conductor_id: String,
    x: f64,
    y: f64,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    circuit_id: Option<String>,
    #[serde(default)]
    phase: Option<String>,
}

/// Validated overhead line configuration.
#[derive(Debug, Clone)]
pub struct OhlConfig {
    pub params: SystemParameters,
    pub catalog: ConductorCatalog,
    /// Tower conductors in file order
    pub conductors: Vec<ConductorSpec>,
}

impl OhlConfig {
    /// Circuit ids in order of first appearance.
    pub fn circuits(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for c in &self.conductors {
            if let Some(circuit) = &c.circuit {
                if !seen.contains(circuit) {
                    seen.push(circuit.clone());
                }
            }
        }
        seen
    }

    pub fn earth_wire_count(&self) -> usize {
        self.conductors
            .iter()
            .filter(|c| c.role == ConductorRole::EarthWire)
            .count()
    }
}

pub fn load_ohl_config(path: impl AsRef<Path>) -> EmiResult<OhlConfig> {
    let path = path.as_ref();
    let text = read_file(path)?;
    load_ohl_from_str(&text).map_err(|e| match e {
        EmiError::Parse(msg) => EmiError::Parse(format!("{}: {msg}", path.display())),
        other => other,
    })
}

pub fn load_ohl_from_str(text: &str) -> EmiResult<OhlConfig> {
    let file: OhlFile = parse_json(text, "overhead line configuration")?;

    let params = SystemParameters::new(
        file.system_parameters.frequency,
        file.system_parameters.earth_resistivity,
    )?;

    let mut catalog = ConductorCatalog::new();
    for (name, t) in file.conductor_types {
        catalog
            .insert(name.as_str(), ConductorType::new(t.gmr_impedance, t.gmr_potential, t.r_ac))
            .map_err(|e| EmiError::physical_range(format!("conductor type '{name}': {e}")))?;
    }

    if file.tower_geometry.is_empty() {
        return Err(EmiError::configuration("tower geometry lists no conductors"));
    }

    let mut labels = HashSet::new();
    let mut conductors = Vec::with_capacity(file.tower_geometry.len());
    for geo in file.tower_geometry {
        if !labels.insert(geo.conductor_id.clone()) {
            return Err(EmiError::configuration(format!(
                "duplicate conductor id '{}'",
                geo.conductor_id
            )));
        }
        catalog.resolve(&geo.type_name)?;
        let x = require_finite("conductor x", geo.x)?;
        let y = require_finite("conductor y", geo.y)?;

        let spec = match (geo.circuit_id, geo.phase) {
            (Some(circuit), Some(phase)) => {
                ConductorSpec::phase(geo.conductor_id, x, y, geo.type_name, circuit, phase)
            }
            (Some(circuit), None) => {
                return Err(EmiError::configuration(format!(
                    "conductor '{}' in circuit '{circuit}' has no phase label",
                    geo.conductor_id
                )))
            }
            (None, _) => ConductorSpec::earth_wire(geo.conductor_id, x, y, geo.type_name),
        };
        conductors.push(spec);
    }

    Ok(OhlConfig {
        params,
        catalog,
        conductors,
    })
}
