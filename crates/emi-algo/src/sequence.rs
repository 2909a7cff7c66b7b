//! Phase and sequence parameters of one three-phase circuit.
//!
//! The circuit's three phase conductors are Kron-reduced against the earth
//! wires (other circuits and the pipeline are simply not selected), then
//! averaged as for a perfectly transposed line and transformed with the
//! Fortescue matrix ordered [positive, negative, zero]:
//!
//! ```text
//!     ┌ 1   1   1 ┐
//! H = │ a²  a   1 │      a = e^{j2π/3}
//!     └ a   a²  1 ┘
//! Z_PNZ = H⁻¹ · Z_transposed · H
//! ```
//!
//! Susceptances are `B = ωC` from the Maxwell capacitance matrix, so
//! off-diagonal entries are negative.

use emi_core::{ComplexMatrix, Diagnostics, EmiError, EmiResult, RealMatrix};
use num_complex::Complex64;
use serde::Serialize;
use tracing::debug;

use crate::electromagnetic::{kron_reduce_real, ElectromagneticSystem, ReductionOptions};

#[derive(Debug, Clone, Serialize)]
pub struct CircuitParameters {
    pub circuit: String,
    /// Phase conductor labels in matrix order
    pub labels: Vec<String>,
    /// Reduced phase impedance (Ω/km)
    pub z_phase: ComplexMatrix,
    /// Reduced Maxwell capacitance (μF/km)
    pub c_phase: RealMatrix,
    /// Transposed impedance (Ω/km)
    pub z_transposed: ComplexMatrix,
    /// Transposed susceptance (μS/km)
    pub b_transposed: RealMatrix,
    /// Sequence impedance, [P, N, Z] order (Ω/km)
    pub z_sequence: ComplexMatrix,
    /// Sequence susceptance, [P, N, Z] order (μS/km)
    pub b_sequence: ComplexMatrix,
    pub diagnostics: Diagnostics,
}

impl CircuitParameters {
    pub fn for_circuit(system: &ElectromagneticSystem, circuit: &str) -> EmiResult<Self> {
        Self::for_circuit_with(system, circuit, &ReductionOptions::default())
    }

    pub fn for_circuit_with(
        system: &ElectromagneticSystem,
        circuit: &str,
        options: &ReductionOptions,
    ) -> EmiResult<Self> {
        let phases: Vec<usize> = system
            .phase_indices()
            .into_iter()
            .filter(|&i| system.conductors()[i].circuit.as_deref() == Some(circuit))
            .collect();
        if phases.len() != 3 {
            return Err(EmiError::configuration(format!(
                "circuit '{circuit}' has {} phase conductors, expected 3",
                phases.len()
            )));
        }
        let earth = system.earth_wire_indices();

        let reduced = system.reduce_indices(&phases, &earth, options)?;
        let c_phase = kron_reduce_real(system.potential_matrix(), &phases, &earth)?.inverse()?;
        let omega = system.params().omega();

        let z_transposed = transposed(&reduced.matrix);
        let b = RealMatrix::from_fn(3, 3, |i, j| omega * c_phase.get(i, j));
        let averaged = transposed_real(&b);
        let b_transposed = RealMatrix::from_fn(3, 3, |i, j| averaged[i][j]);

        let b_complex = ComplexMatrix::from_fn(3, 3, |i, j| Complex64::new(b_transposed.get(i, j), 0.0));
        let z_sequence = to_sequence(&z_transposed)?;
        let b_sequence = to_sequence(&b_complex)?;

        debug!(
            circuit,
            z1_re = z_sequence.get(0, 0).re,
            z1_im = z_sequence.get(0, 0).im,
            z0_re = z_sequence.get(2, 2).re,
            z0_im = z_sequence.get(2, 2).im,
            "sequence impedances"
        );

        Ok(Self {
            circuit: circuit.to_string(),
            labels: phases
                .iter()
                .map(|&i| system.conductors()[i].label.clone())
                .collect(),
            z_phase: reduced.matrix,
            c_phase,
            z_transposed,
            b_transposed,
            z_sequence,
            b_sequence,
            diagnostics: reduced.diagnostics,
        })
    }

    pub fn positive_sequence_impedance(&self) -> Complex64 {
        self.z_sequence.get(0, 0)
    }

    pub fn zero_sequence_impedance(&self) -> Complex64 {
        self.z_sequence.get(2, 2)
    }

    pub fn positive_sequence_susceptance(&self) -> f64 {
        self.b_sequence.get(0, 0).re
    }

    pub fn zero_sequence_susceptance(&self) -> f64 {
        self.b_sequence.get(2, 2).re
    }
}

fn transposed(m: &ComplexMatrix) -> ComplexMatrix {
    let s = (m.get(0, 0) + m.get(1, 1) + m.get(2, 2)) / 3.0;
    let mutual = (m.get(0, 1) + m.get(0, 2) + m.get(1, 2)) / 3.0;
    ComplexMatrix::from_fn(3, 3, |i, j| if i == j { s } else { mutual })
}

fn transposed_real(m: &RealMatrix) -> [[f64; 3]; 3] {
    let s = (m.get(0, 0) + m.get(1, 1) + m.get(2, 2)) / 3.0;
    let mutual = (m.get(0, 1) + m.get(0, 2) + m.get(1, 2)) / 3.0;
    [[s, mutual, mutual], [mutual, s, mutual], [mutual, mutual, s]]
}

/// Fortescue matrix with [P, N, Z] column order.
pub fn fortescue() -> ComplexMatrix {
    let one = Complex64::new(1.0, 0.0);
    let a = Complex64::from_polar(1.0, 2.0 * std::f64::consts::PI / 3.0);
    let a2 = a * a;
    ComplexMatrix::from_fn(3, 3, |i, j| match (i, j) {
        (0, _) | (_, 2) => one,
        (1, 0) | (2, 1) => a2,
        _ => a,
    })
}

fn to_sequence(m: &ComplexMatrix) -> EmiResult<ComplexMatrix> {
    let h = fortescue();
    h.inverse()?.mul(m)?.mul(&h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emi_core::{ConductorCatalog, ConductorSpec, ConductorType, SystemParameters};

    fn system() -> ElectromagneticSystem {
        let catalog = ConductorCatalog::new()
            .with_type("ACSR", ConductorType::new(0.328, 0.2243, 0.0169))
            .unwrap()
            .with_type("GW", ConductorType::new(0.00042, 0.0095, 0.001))
            .unwrap();
        let conductors = vec![
            ConductorSpec::phase("C1_R", -1.0, 32.2645, "ACSR", "C1", "R"),
            ConductorSpec::phase("C1_Y", -3.991, 25.070, "ACSR", "C1", "Y"),
            ConductorSpec::phase("C1_B", -19.681, 21.036, "ACSR", "C1", "B"),
            ConductorSpec::phase("C2_R", 19.681, 21.036, "ACSR", "C2", "R"),
            ConductorSpec::phase("C2_Y", 3.991, 25.070, "ACSR", "C2", "Y"),
            ConductorSpec::phase("C2_B", 1.0, 32.2645, "ACSR", "C2", "B"),
            ConductorSpec::earth_wire("EW", 0.0, 50.764, "GW"),
        ];
        ElectromagneticSystem::build(&conductors, &SystemParameters::new(50.0, 20.0).unwrap(), &catalog)
            .unwrap()
    }

    #[test]
    fn fortescue_inverse() {
        let h = fortescue();
        let product = h.inverse().unwrap().mul(&h).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((product.get(i, j) - Complex64::new(expected, 0.0)).norm() < 1e-12);
            }
        }
    }

    #[test]
    fn transposed_line_decouples() {
        let params = CircuitParameters::for_circuit(&system(), "C1").unwrap();
        assert_eq!(params.labels, vec!["C1_R", "C1_Y", "C1_B"]);
        let z = &params.z_sequence;
        for i in 0..3 {
            for j in 0..3 {
                if i != j {
                    assert!(z.get(i, j).norm() < 1e-10);
                    assert!(params.b_sequence.get(i, j).norm() < 1e-10);
                }
            }
        }
        let zs = params.z_transposed.get(0, 0);
        let zm = params.z_transposed.get(0, 1);
        assert!((params.positive_sequence_impedance() - (zs - zm)).norm() < 1e-10);
        assert!((z.get(1, 1) - (zs - zm)).norm() < 1e-10);
        assert!((params.zero_sequence_impedance() - (zs + zm * 2.0)).norm() < 1e-10);
    }

    #[test]
    fn sequence_magnitudes_are_physical() {
        let params = CircuitParameters::for_circuit(&system(), "C2").unwrap();
        let z1 = params.positive_sequence_impedance();
        let z0 = params.zero_sequence_impedance();
        assert!(z1.re > 0.0 && z1.im > 0.0);
        assert!(z0.norm() > z1.norm());
        assert!((z1 - Complex64::new(0.016_928, 0.235_427)).norm() < 1e-5);
        assert!((z0 - Complex64::new(0.111_112, 0.775_017)).norm() < 1e-5);
        assert!((params.positive_sequence_susceptance() - 4.391_62).abs() < 1e-4);
        assert!((params.zero_sequence_susceptance() - 2.273_98).abs() < 1e-4);
        assert!(params.positive_sequence_susceptance() > params.zero_sequence_susceptance());
        assert!(params.zero_sequence_susceptance() > 0.0);
        // Maxwell capacitance: positive diagonal, negative coupling
        assert!(params.c_phase.get(0, 0) > 0.0);
        assert!(params.c_phase.get(0, 1) < 0.0);
    }

    #[test]
    fn unknown_circuit_rejected() {
        assert!(matches!(
            CircuitParameters::for_circuit(&system(), "C3"),
            Err(EmiError::Configuration(_))
        ));
    }
}
