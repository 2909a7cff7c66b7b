//! Sectioning of a pipeline route against an overhead line route.
//!
//! The two routes are independent 3-D polylines. Each pipeline segment
//! (optionally split into equal pieces no longer than
//! [`SectionizerConfig::max_section_length_m`]) becomes one [`Section`].
//! Its separation from the line is the mean of the shortest distances from
//! sample points on the piece to the line polyline:
//!
//! ```text
//! samples at 0, s, 2s, … (strictly before the piece end), plus the end
//! separation = mean(min over OHL segments of |sample − segment|)
//! ```
//!
//! Section lengths add up to the pipeline route length; sections are
//! numbered from the pipeline start and keep that order downstream.

use emi_core::{ConductorSpec, EmiError, EmiResult, Meters, Point3, Route};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Shortest piece a pipeline segment may be split into (m).
pub const MIN_SECTION_LENGTH_M: f64 = 1.0;
/// Finest distance-sampling step (m).
pub const MIN_SAMPLE_STEP_M: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionizerConfig {
    /// Spacing of distance samples along a piece (m)
    pub sample_step_m: f64,
    /// Split pipeline segments longer than this into equal pieces (m)
    pub max_section_length_m: Option<f64>,
}

impl Default for SectionizerConfig {
    fn default() -> Self {
        Self {
            sample_step_m: 10.0,
            max_section_length_m: None,
        }
    }
}

impl SectionizerConfig {
    pub fn validate(&self) -> EmiResult<()> {
        if !(self.sample_step_m.is_finite() && self.sample_step_m > 0.0) {
            return Err(EmiError::configuration(format!(
                "sample step must be positive, got {} m",
                self.sample_step_m
            )));
        }
        if self.sample_step_m < MIN_SAMPLE_STEP_M {
            return Err(EmiError::physical_range(format!(
                "sample step {} m is below the {MIN_SAMPLE_STEP_M} m minimum",
                self.sample_step_m
            )));
        }
        if let Some(max) = self.max_section_length_m {
            if !(max.is_finite() && max > 0.0) {
                return Err(EmiError::configuration(format!(
                    "maximum section length must be positive, got {max} m"
                )));
            }
            if max < MIN_SECTION_LENGTH_M {
                return Err(EmiError::physical_range(format!(
                    "maximum section length {max} m is below the {MIN_SECTION_LENGTH_M} m minimum"
                )));
            }
        }
        Ok(())
    }
}

/// Shortest distance from a point to the overhead line route.
pub trait NearestDistance: Send + Sync {
    fn distance(&self, point: &Point3) -> f64;
}

/// Scans every line segment for each query.
#[derive(Debug, Clone)]
pub struct LinearScan {
    segments: Vec<(Point3, Point3)>,
}

impl LinearScan {
    pub fn new(route: &Route) -> Self {
        Self {
            segments: route.segments().collect(),
        }
    }
}

impl NearestDistance for LinearScan {
    fn distance(&self, point: &Point3) -> f64 {
        self.segments
            .iter()
            .map(|(a, b)| point_segment_distance(point, a, b))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Distance from `p` to the closed segment `a`–`b`.
pub fn point_segment_distance(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab = (b.x - a.x, b.y - a.y, b.z - a.z);
    let ap = (p.x - a.x, p.y - a.y, p.z - a.z);
    let len2 = ab.0 * ab.0 + ab.1 * ab.1 + ab.2 * ab.2;
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = ((ap.0 * ab.0 + ap.1 * ab.1 + ap.2 * ab.2) / len2).clamp(0.0, 1.0);
    p.distance(&a.lerp(b, t))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub index: usize,
    pub start_chainage_m: f64,
    pub length_m: f64,
    pub average_separation_m: f64,
    pub start: Point3,
    pub end: Point3,
}

impl Section {
    pub fn length_km(&self) -> f64 {
        Meters(self.length_m).to_kilometers().value()
    }

    /// Line conductors followed by the pipeline moved to this section's
    /// separation.
    pub fn conductor_layout(&self, ohl: &[ConductorSpec], pipeline: &ConductorSpec) -> Vec<ConductorSpec> {
        let mut conductors = ohl.to_vec();
        conductors.push(pipeline.clone().with_x(self.average_separation_m));
        conductors
    }
}

pub struct RouteSectionizer<D: NearestDistance = LinearScan> {
    index: D,
    config: SectionizerConfig,
}

impl RouteSectionizer<LinearScan> {
    pub fn new(ohl: &Route, config: SectionizerConfig) -> EmiResult<Self> {
        Self::with_index(LinearScan::new(ohl), config)
    }
}

impl<D: NearestDistance> RouteSectionizer<D> {
    pub fn with_index(index: D, config: SectionizerConfig) -> EmiResult<Self> {
        config.validate()?;
        Ok(Self { index, config })
    }

    pub fn config(&self) -> &SectionizerConfig {
        &self.config
    }

    pub fn sectionize(&self, pipeline: &Route) -> EmiResult<Vec<Section>> {
        let mut sections = Vec::new();
        let mut chainage = 0.0;

        for (a, b) in pipeline.segments() {
            let segment_length = a.distance(&b);
            if segment_length == 0.0 {
                debug!(chainage, "skipping zero-length pipeline segment");
                continue;
            }
            let pieces = match self.config.max_section_length_m {
                Some(max) => (segment_length / max).ceil().max(1.0) as usize,
                None => 1,
            };

            for k in 0..pieces {
                let start = a.lerp(&b, k as f64 / pieces as f64);
                let end = a.lerp(&b, (k + 1) as f64 / pieces as f64);
                let length_m = segment_length / pieces as f64;
                let separation = self.average_distance(&start, &end, length_m);
                if !(separation > 0.0) {
                    return Err(EmiError::physical_range(format!(
                        "section {} at chainage {:.1} m lies on the line route",
                        sections.len(),
                        chainage
                    )));
                }
                sections.push(Section {
                    index: sections.len(),
                    start_chainage_m: chainage,
                    length_m,
                    average_separation_m: separation,
                    start,
                    end,
                });
                chainage += length_m;
            }
        }

        if sections.is_empty() {
            return Err(EmiError::configuration(format!(
                "pipeline route '{}' has zero length",
                pipeline.name
            )));
        }

        info!(
            sections = sections.len(),
            length_m = chainage,
            "pipeline route sectionized"
        );
        Ok(sections)
    }

    fn average_distance(&self, start: &Point3, end: &Point3, length_m: f64) -> f64 {
        let step = self.config.sample_step_m;
        let steps = ((length_m / step).floor() as usize).max(1);
        let mut total = 0.0;
        let mut count = 0usize;
        for i in 0..steps {
            let offset = i as f64 * step;
            if offset >= length_m {
                break;
            }
            total += self.index.distance(&start.lerp(end, offset / length_m));
            count += 1;
        }
        total += self.index.distance(end);
        count += 1;
        total / count as f64
    }
}
