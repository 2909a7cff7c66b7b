//! Voltage and current along a pipeline driven by a distributed EMF.
//!
//! The pipeline is a lossy transmission line with series impedance `z`,
//! shunt admittance `y` and a longitudinal source `E` (V/km):
//!
//! ```text
//! dV/dx = −z·I + E
//! dI/dx = −y·V
//! ```
//!
//! Over a stretch of length `u` with uniform `E` the state `(V, I)` propagates
//! as an affine transfer:
//!
//! ```text
//! V(u) =  C·V₀ − z·S·I₀ + E·S
//! I(u) = −y·S·V₀ + C·I₀ − 2·E·y·S_h²
//!
//! C = cosh(γu),  S = sinh(γu)/γ,  S_h = sinh(γu/2)/γ
//! ```
//!
//! `S` and `S_h` are evaluated from their Taylor series when `|γu|` is small,
//! so a short line or a vanishing `γ` never divides by zero. A route with
//! several sections is the composition of the per-section transfers; the two
//! unknowns `V₀, I₀` follow from one boundary condition at each end, each
//! written as `α·V + β·I = 0`.
//!
//! Current is positive in the direction of increasing chainage.

use emi_core::{EmiError, EmiResult};
use num_complex::Complex64;
use serde::Serialize;
use tracing::debug;

use crate::pipeline::PipelineElectricalParams;

/// Below this `|γu|` the series forms of `S` and `S_h` are used.
const SMALL_ARGUMENT: f64 = 1e-3;
/// Positions within this distance (km) of `[0, L]` are clamped.
const POSITION_TOLERANCE_KM: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "impedance", rename_all = "snake_case")]
pub enum BoundaryCondition {
    /// Insulated end, `I = 0`
    Open,
    /// Solidly earthed end, `V = 0`
    Grounded,
    /// Earthed through an impedance (Ω)
    Impedance(Complex64),
}

impl BoundaryCondition {
    /// `(α, β)` of `α·V + β·I = 0`. At the start the termination current
    /// flows into the line, at the end it flows out.
    fn coefficients(&self, at_start: bool) -> (Complex64, Complex64) {
        let one = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        match *self {
            BoundaryCondition::Open => (zero, one),
            BoundaryCondition::Grounded => (one, zero),
            BoundaryCondition::Impedance(z) if at_start => (one, z),
            BoundaryCondition::Impedance(z) => (one, -z),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineEnds {
    pub start: BoundaryCondition,
    pub end: BoundaryCondition,
}

impl LineEnds {
    pub fn new(start: BoundaryCondition, end: BoundaryCondition) -> Self {
        Self { start, end }
    }

    pub fn open() -> Self {
        Self::new(BoundaryCondition::Open, BoundaryCondition::Open)
    }

    pub fn grounded() -> Self {
        Self::new(BoundaryCondition::Grounded, BoundaryCondition::Grounded)
    }

    /// Both ends terminated in the characteristic impedance.
    pub fn matched(zc: Complex64) -> Self {
        Self::new(BoundaryCondition::Impedance(zc), BoundaryCondition::Impedance(zc))
    }
}

/// Stretch of pipeline with a uniform EMF.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceSegment {
    pub length_km: f64,
    /// V/km
    pub emf: Complex64,
}

#[derive(Debug, Clone, Copy)]
struct Transfer {
    c: Complex64,
    s: Complex64,
    s_h: Complex64,
}

impl Transfer {
    fn over(gamma: Complex64, u: f64) -> Self {
        Self {
            c: (gamma * u).cosh(),
            s: sinh_over_gamma(gamma, u),
            s_h: sinh_over_gamma(gamma, u / 2.0),
        }
    }

    fn apply(
        &self,
        p: &PipelineElectricalParams,
        emf: Complex64,
        v0: Complex64,
        i0: Complex64,
    ) -> (Complex64, Complex64) {
        let v = self.c * v0 - p.z * self.s * i0 + emf * self.s;
        let i = -p.y * self.s * v0 + self.c * i0 - emf * p.y * self.s_h * self.s_h * 2.0;
        (v, i)
    }
}

/// `sinh(γu)/γ`, with the series `u·(1 + w/6 + w²/120)`, `w = (γu)²`, near zero.
fn sinh_over_gamma(gamma: Complex64, u: f64) -> Complex64 {
    let gu = gamma * u;
    if gu.norm() < SMALL_ARGUMENT {
        let w = gu * gu;
        (Complex64::new(1.0, 0.0) + w / 6.0 + w * w / 120.0) * u
    } else {
        gu.sinh() / gamma
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct SectionState {
    start_km: f64,
    length_km: f64,
    emf: Complex64,
    v0: Complex64,
    i0: Complex64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfilePoint {
    pub x_km: f64,
    pub voltage: Complex64,
    pub current: Complex64,
}

/// Solved line; evaluates `V(x)` and `I(x)` on demand.
#[derive(Debug, Clone, Serialize)]
pub struct VoltageProfile {
    params: PipelineElectricalParams,
    ends: LineEnds,
    sections: Vec<SectionState>,
    length_km: f64,
}

impl VoltageProfile {
    pub fn length_km(&self) -> f64 {
        self.length_km
    }

    pub fn line_ends(&self) -> LineEnds {
        self.ends
    }

    fn state_at(&self, x_km: f64) -> EmiResult<(Complex64, Complex64)> {
        if !x_km.is_finite()
            || x_km < -POSITION_TOLERANCE_KM
            || x_km > self.length_km + POSITION_TOLERANCE_KM
        {
            return Err(EmiError::physical_range(format!(
                "position {x_km} km is outside the line [0, {}] km",
                self.length_km
            )));
        }
        let x = x_km.clamp(0.0, self.length_km);
        let section = self
            .sections
            .iter()
            .find(|s| x <= s.start_km + s.length_km)
            .or(self.sections.last())
            .ok_or_else(|| EmiError::Other("voltage profile has no sections".into()))?;
        let u = (x - section.start_km).max(0.0);
        Ok(Transfer::over(self.params.gamma, u).apply(&self.params, section.emf, section.v0, section.i0))
    }

    /// Pipeline-to-remote-earth voltage at `x_km` (V).
    pub fn voltage(&self, x_km: f64) -> EmiResult<Complex64> {
        Ok(self.state_at(x_km)?.0)
    }

    /// Longitudinal current at `x_km` (A).
    pub fn current(&self, x_km: f64) -> EmiResult<Complex64> {
        Ok(self.state_at(x_km)?.1)
    }

    /// `n` evenly spaced points including both ends (`n ≥ 2`).
    pub fn sample(&self, n: usize) -> EmiResult<Vec<ProfilePoint>> {
        let n = n.max(2);
        (0..n)
            .map(|k| {
                let x_km = self.length_km * k as f64 / (n - 1) as f64;
                let (voltage, current) = self.state_at(x_km)?;
                Ok(ProfilePoint {
                    x_km,
                    voltage,
                    current,
                })
            })
            .collect()
    }

    /// Sampled point with the largest `|V|`.
    pub fn max_voltage(&self, n: usize) -> EmiResult<ProfilePoint> {
        let points = self.sample(n)?;
        points
            .into_iter()
            .max_by(|a, b| a.voltage.norm().total_cmp(&b.voltage.norm()))
            .ok_or_else(|| EmiError::Other("empty voltage profile".into()))
    }

    /// `(V(0), V(L))`
    pub fn ends(&self) -> EmiResult<(Complex64, Complex64)> {
        Ok((self.voltage(0.0)?, self.voltage(self.length_km)?))
    }
}

pub struct LongitudinalAnalyzer {
    params: PipelineElectricalParams,
}

impl LongitudinalAnalyzer {
    pub fn new(params: PipelineElectricalParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PipelineElectricalParams {
        &self.params
    }

    pub fn solve_uniform(&self, emf: Complex64, length_km: f64, ends: LineEnds) -> EmiResult<VoltageProfile> {
        self.solve(&[SourceSegment { length_km, emf }], ends)
    }

    pub fn solve(&self, segments: &[SourceSegment], ends: LineEnds) -> EmiResult<VoltageProfile> {
        if segments.is_empty() {
            return Err(EmiError::configuration("no source segments given"));
        }
        for (i, s) in segments.iter().enumerate() {
            if !(s.length_km.is_finite() && s.length_km > 0.0) {
                return Err(EmiError::physical_range(format!(
                    "segment {i} length must be positive, got {} km",
                    s.length_km
                )));
            }
            if !(s.emf.re.is_finite() && s.emf.im.is_finite()) {
                return Err(EmiError::physical_range(format!("segment {i} EMF is not finite")));
            }
        }
        let p = &self.params;

        // Affine map (V0, I0) -> (V_L, I_L) = M·(V0, I0) + f, built by
        // pushing the unit states and the zero state through every section.
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let mut basis_v = (one, zero);
        let mut basis_i = (zero, one);
        let mut forced = (zero, zero);
        for s in segments {
            let t = Transfer::over(p.gamma, s.length_km);
            basis_v = t.apply(p, zero, basis_v.0, basis_v.1);
            basis_i = t.apply(p, zero, basis_i.0, basis_i.1);
            forced = t.apply(p, s.emf, forced.0, forced.1);
        }

        let (a0, b0) = ends.start.coefficients(true);
        let (al, bl) = ends.end.coefficients(false);
        let a11 = a0;
        let a12 = b0;
        let a21 = al * basis_v.0 + bl * basis_v.1;
        let a22 = al * basis_i.0 + bl * basis_i.1;
        let rhs = -(al * forced.0 + bl * forced.1);

        let det = a11 * a22 - a12 * a21;
        let scale = (a11.norm() + a12.norm()) * (a21.norm() + a22.norm());
        if !(det.re.is_finite() && det.im.is_finite()) || det.norm() <= 1e-14 * scale {
            return Err(EmiError::singular(
                "boundary conditions do not determine the line state",
            ));
        }
        let v0 = -a12 * rhs / det;
        let i0 = a11 * rhs / det;

        let mut sections = Vec::with_capacity(segments.len());
        let (mut v, mut i) = (v0, i0);
        let mut start_km = 0.0;
        for s in segments {
            sections.push(SectionState {
                start_km,
                length_km: s.length_km,
                emf: s.emf,
                v0: v,
                i0: i,
            });
            (v, i) = Transfer::over(p.gamma, s.length_km).apply(p, s.emf, v, i);
            start_km += s.length_km;
        }

        debug!(
            sections = sections.len(),
            length_km = start_km,
            v0 = v0.norm(),
            v_end = v.norm(),
            "longitudinal profile solved"
        );

        Ok(VoltageProfile {
            params: self.params,
            ends,
            sections,
            length_km: start_km,
        })
    }
}
