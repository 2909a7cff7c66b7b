//! Pipeline file.
//!
//! ```json
//! {
//!   "name": "DN600 gas line",
//!   "position": { "x_separation_m": 50.0, "burial_depth_m": 1.0 },
//!   "physical_properties": {
//!     "outer_diameter_m": 0.6, "steel_thickness_m": 0.0095,
//!     "steel_rel_permeability": 300, "steel_resistivity_ohmm": 1.8e-7
//!   },
//!   "coating_properties": {
//!     "type": "FBE", "thickness_m": 0.0005,
//!     "resistivity_ohmm": 1e12, "rel_permittivity": 4.0
//!   }
//! }
//! ```
//!
//! `x_separation_m` is optional: route studies place the pipeline per section.

use std::path::Path;

use emi_algo::{CoatingProperties, PipelineProperties};
use emi_core::{ConductorCatalog, ConductorSpec, EmiError, EmiResult, Meters, OhmMeters};
use serde::Deserialize;

use crate::{parse_json, read_file, require_finite};

#[derive(Debug, Deserialize)]
struct PipelineFile {
    name: String,
    position: PositionJson,
    physical_properties: PhysicalJson,
    coating_properties: CoatingJson,
}

#[derive(Debug, Deserialize)]
struct PositionJson {
    #[serde(default)]
    x_separation_m: Option<f64>,
    burial_depth_m: f64,
}

#[derive(Debug, Deserialize)]
struct PhysicalJson {
    outer_diameter_m: f64,
    steel_thickness_m: f64,
    steel_rel_permeability: f64,
    steel_resistivity_ohmm: f64,
}

#[derive(Debug, Deserialize)]
struct CoatingJson {
    #[serde(rename = "type", default)]
    kind: String,
    thickness_m: f64,
    resistivity_ohmm: f64,
    rel_permittivity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub name: String,
    /// Fixed horizontal separation from the tower centreline, if given
    pub x_separation: Option<Meters>,
    pub properties: PipelineProperties,
}

impl PipelineConfig {
    /// Catalog key under which the pipeline conductor type is registered.
    pub fn type_name(&self) -> String {
        format!("pipeline:{}", self.name)
    }

    /// Register the pipeline's conductor type in `catalog`.
    pub fn register(&self, catalog: &mut ConductorCatalog) -> EmiResult<()> {
        catalog.insert(self.type_name(), self.properties.conductor_type())
    }

    /// Pipeline conductor at `x`.
    pub fn conductor_at(&self, x: f64) -> ConductorSpec {
        self.properties.conductor(&self.name, x, &self.type_name())
    }

    /// Pipeline conductor at the configured separation.
    pub fn conductor(&self) -> EmiResult<ConductorSpec> {
        let x = self.x_separation.ok_or_else(|| {
            EmiError::configuration(format!(
                "pipeline '{}' has no x_separation_m; supply a route instead",
                self.name
            ))
        })?;
        Ok(self.conductor_at(x.value()))
    }
}

pub fn load_pipeline_config(path: impl AsRef<Path>) -> EmiResult<PipelineConfig> {
    let path = path.as_ref();
    let text = read_file(path)?;
    load_pipeline_from_str(&text).map_err(|e| match e {
        EmiError::Parse(msg) => EmiError::Parse(format!("{}: {msg}", path.display())),
        other => other,
    })
}

pub fn load_pipeline_from_str(text: &str) -> EmiResult<PipelineConfig> {
    let file: PipelineFile = parse_json(text, "pipeline configuration")?;

    let x_separation = file
        .position
        .x_separation_m
        .map(|x| require_finite("x_separation_m", x).map(Meters))
        .transpose()?;

    let properties = PipelineProperties {
        outer_diameter: Meters(file.physical_properties.outer_diameter_m),
        steel_thickness: Meters(file.physical_properties.steel_thickness_m),
        steel_resistivity: OhmMeters(file.physical_properties.steel_resistivity_ohmm),
        steel_rel_permeability: file.physical_properties.steel_rel_permeability,
        burial_depth: Meters(file.position.burial_depth_m),
        coating: CoatingProperties {
            kind: file.coating_properties.kind,
            thickness: Meters(file.coating_properties.thickness_m),
            resistivity: OhmMeters(file.coating_properties.resistivity_ohmm),
            rel_permittivity: file.coating_properties.rel_permittivity,
        },
    };
    properties.validate()?;

    Ok(PipelineConfig {
        name: file.name,
        x_separation,
        properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPE: &str = r#"{
        "name": "DN600",
        "position": { "x_separation_m": 50.0, "burial_depth_m": 1.0 },
        "physical_properties": {
            "outer_diameter_m": 0.6, "steel_thickness_m": 0.0095,
            "steel_rel_permeability": 300, "steel_resistivity_ohmm": 1.8e-7
        },
        "coating_properties": {
            "type": "FBE", "thickness_m": 0.0005,
            "resistivity_ohmm": 1e12, "rel_permittivity": 4.0
        }
    }"#;

    #[test]
    fn parses_pipeline() {
        let config = load_pipeline_from_str(PIPE).unwrap();
        assert_eq!(config.name, "DN600");
        assert_eq!(config.x_separation, Some(Meters(50.0)));
        assert_eq!(config.properties.coating.kind, "FBE");

        let conductor = config.conductor().unwrap();
        assert_eq!(conductor.x.value(), 50.0);
        assert_eq!(conductor.effective_height(), -1.0);
        assert_eq!(conductor.type_name, "pipeline:DN600");

        let mut catalog = ConductorCatalog::new();
        config.register(&mut catalog).unwrap();
        assert!((catalog.resolve("pipeline:DN600").unwrap().r_ac.value() - 0.010_213_6).abs() < 1e-7);
    }

    #[test]
    fn separation_is_optional() {
        let text = PIPE.replace(r#""x_separation_m": 50.0, "#, "");
        let config = load_pipeline_from_str(&text).unwrap();
        assert!(config.x_separation.is_none());
        assert!(matches!(config.conductor(), Err(EmiError::Configuration(_))));
        assert_eq!(config.conductor_at(120.0).x.value(), 120.0);
    }

    #[test]
    fn wall_thicker_than_radius_rejected() {
        let text = PIPE.replace(r#""steel_thickness_m": 0.0095"#, r#""steel_thickness_m": 0.31"#);
        assert!(matches!(
            load_pipeline_from_str(&text),
            Err(EmiError::PhysicalRange(_))
        ));
    }

    #[test]
    fn zero_permittivity_rejected() {
        let text = PIPE.replace(r#""rel_permittivity": 4.0"#, r#""rel_permittivity": 0"#);
        assert!(matches!(
            load_pipeline_from_str(&text),
            Err(EmiError::PhysicalRange(_))
        ));
    }
}
