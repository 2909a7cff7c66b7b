//! Properties every conductor arrangement must satisfy.

use emi_algo::{
    EarthReturnModel, ElectromagneticSystem, FaultAnalyzer, InterferenceStudy, LineEnds,
    PipelineElectricalParams, ReductionOptions, Section,
};
use emi_core::{
    ConductorCatalog, ConductorSpec, ConductorType, Degrees, FaultCondition, OperatingCurrents,
    Point3, SystemParameters,
};
use num_complex::Complex64;

fn catalog() -> ConductorCatalog {
    ConductorCatalog::new()
        .with_type("ACSR", ConductorType::new(0.0122, 0.0159, 0.067))
        .unwrap()
        .with_type("OPGW", ConductorType::new(0.0064, 0.0085, 0.31))
        .unwrap()
        .with_type("pipe", ConductorType::new(0.2, 0.2, 0.015))
        .unwrap()
}

fn line(earth_wires: usize) -> Vec<ConductorSpec> {
    let mut conductors = vec![
        ConductorSpec::phase("C1_R", -6.5, 24.0, "ACSR", "C1", "R"),
        ConductorSpec::phase("C1_Y", -7.5, 18.0, "ACSR", "C1", "Y"),
        ConductorSpec::phase("C1_B", -6.5, 12.0, "ACSR", "C1", "B"),
        ConductorSpec::phase("C2_R", 6.5, 24.0, "ACSR", "C2", "R"),
        ConductorSpec::phase("C2_Y", 7.5, 18.0, "ACSR", "C2", "Y"),
        ConductorSpec::phase("C2_B", 6.5, 12.0, "ACSR", "C2", "B"),
    ];
    let shields = [(-4.0, 31.0), (4.0, 31.0)];
    for (i, (x, y)) in shields.iter().take(earth_wires).enumerate() {
        conductors.push(ConductorSpec::earth_wire(format!("EW{}", i + 1), *x, *y, "OPGW"));
    }
    conductors
}

fn with_pipeline(mut conductors: Vec<ConductorSpec>, separation: f64) -> Vec<ConductorSpec> {
    conductors.push(ConductorSpec::buried("pipeline", separation, 1.5, "pipe"));
    conductors
}

fn currents() -> OperatingCurrents {
    // C2 loaded differently so the two circuits do not cancel
    OperatingCurrents::new()
        .balanced(
            "C1",
            800.0,
            &[("R", Degrees(0.0)), ("Y", Degrees(-120.0)), ("B", Degrees(120.0))],
        )
        .balanced(
            "C2",
            300.0,
            &[("R", Degrees(-10.0)), ("Y", Degrees(-130.0)), ("B", Degrees(110.0))],
        )
}

fn params() -> SystemParameters {
    SystemParameters::new(50.0, 250.0).unwrap()
}

fn build(separation: f64, earth_wires: usize) -> ElectromagneticSystem {
    ElectromagneticSystem::build(
        &with_pipeline(line(earth_wires), separation),
        &params(),
        &catalog(),
    )
    .unwrap()
}

#[test]
fn matrices_symmetric_for_every_model() {
    for model in [EarthReturnModel::CarsonClem, EarthReturnModel::ComplexDepth] {
        for earth_wires in 0..=2 {
            let system = ElectromagneticSystem::build_with_model(
                &with_pipeline(line(earth_wires), 80.0),
                &params(),
                &catalog(),
                model,
            )
            .unwrap();
            let (n, _) = system.impedance_matrix().dim();
            for i in 0..n {
                for j in 0..n {
                    let zij = system.impedance_matrix().get(i, j);
                    let zji = system.impedance_matrix().get(j, i);
                    assert!((zij - zji).norm() < 1e-12);
                    let pij = system.potential_matrix().get(i, j);
                    let pji = system.potential_matrix().get(j, i);
                    assert!((pij - pji).abs() < 1e-12);
                }
            }
            let reduced = system.reduce(&ReductionOptions::default()).unwrap();
            assert!(reduced.matrix.is_symmetric(1e-12));
        }
    }
}

#[test]
fn reduction_without_earth_wires_returns_input() {
    let system = build(80.0, 0);
    let reduced = system.reduce(&ReductionOptions::default()).unwrap();
    assert_eq!(&reduced.matrix, system.impedance_matrix());
    assert!(reduced.condition_number.is_none());
}

#[test]
fn screening_factor_is_one_without_earth_wires() {
    let system = build(80.0, 0);
    let analyzer = FaultAnalyzer::new(&system);
    for label in ["C1_R", "C1_Y", "C1_B", "C2_R", "C2_Y", "C2_B"] {
        assert_eq!(
            analyzer.screening_factor(label).unwrap().k,
            Complex64::new(1.0, 0.0)
        );
    }
}

#[test]
fn steady_state_emf_is_linear_in_current() {
    let system = build(80.0, 2);
    let base = system.steady_state_emf(&currents()).unwrap().emf;
    let doubled = system.steady_state_emf(&currents().scaled(2.0)).unwrap().emf;
    assert!((doubled - base * 2.0).norm() < 1e-9 * base.norm().max(1.0));
    assert!((doubled.norm() - 2.0 * base.norm()).abs() < 1e-9);
}

#[test]
fn fault_emf_is_linear_in_current() {
    let system = build(80.0, 2);
    let analyzer = FaultAnalyzer::new(&system);
    let one = analyzer
        .fault_emf(&FaultCondition::new(Complex64::from_polar(8_000.0, -1.3), "C2_Y"))
        .unwrap();
    let two = analyzer
        .fault_emf(&FaultCondition::new(Complex64::from_polar(16_000.0, -1.3), "C2_Y"))
        .unwrap();
    assert!((two.emf.norm() - 2.0 * one.emf.norm()).abs() < 1e-9 * one.emf.norm());
}

#[test]
fn emf_decreases_with_separation() {
    for earth_wires in [0, 2] {
        let mut last = f64::INFINITY;
        for separation in [20.0, 40.0, 80.0, 160.0, 320.0, 640.0] {
            let emf = build(separation, earth_wires)
                .steady_state_emf(&currents())
                .unwrap()
                .emf
                .norm();
            assert!(emf <= last, "{emf} V/km at {separation} m after {last} V/km");
            last = emf;
        }
    }
}

#[test]
fn fault_emf_decreases_with_separation() {
    let fault = FaultCondition::new(Complex64::new(12_000.0, 0.0), "C1_R");
    let mut last = f64::INFINITY;
    for separation in [30.0, 100.0, 300.0, 900.0] {
        let system = build(separation, 2);
        let emf = FaultAnalyzer::new(&system).fault_emf(&fault).unwrap().emf.norm();
        assert!(emf < last);
        last = emf;
    }
}

fn section(index: usize, start: f64, length_m: f64, separation: f64) -> Section {
    Section {
        index,
        start_chainage_m: start,
        length_m,
        average_separation_m: separation,
        start: Point3::new(start, separation, 0.0),
        end: Point3::new(start + length_m, separation, 0.0),
    }
}

fn study() -> InterferenceStudy {
    InterferenceStudy::new(
        line(2),
        catalog(),
        params(),
        ConductorSpec::buried("pipeline", 0.0, 1.5, "pipe"),
        currents(),
    )
}

#[test]
fn vector_sum_bounded_by_scalar_sum() {
    let sections = vec![
        section(0, 0.0, 700.0, 40.0),
        section(1, 700.0, 1200.0, 95.0),
        section(2, 1900.0, 400.0, 260.0),
        section(3, 2300.0, 900.0, 35.0),
    ];
    let result = study().run(&sections).unwrap();
    assert!(result.total_voltage.norm() <= result.scalar_sum + 1e-12);

    // same phasor everywhere: the bound is reached
    let aligned = vec![section(0, 0.0, 500.0, 60.0), section(1, 500.0, 1500.0, 60.0)];
    let result = study().run(&aligned).unwrap();
    assert!((result.total_voltage.norm() - result.scalar_sum).abs() < 1e-9);
}

#[test]
fn section_order_is_preserved() {
    let sections: Vec<Section> = (0..16)
        .map(|i| section(i, i as f64 * 250.0, 250.0, 30.0 + 15.0 * i as f64))
        .collect();
    let result = study().run(&sections).unwrap();
    let order: Vec<usize> = result.sections.iter().map(|s| s.index).collect();
    assert_eq!(order, (0..16).collect::<Vec<_>>());

    let mut expected = Complex64::new(0.0, 0.0);
    for s in &result.sections {
        expected += s.voltage;
    }
    assert_eq!(expected, result.total_voltage);
}

#[test]
fn longitudinal_profile_over_study() {
    let sections = vec![
        section(0, 0.0, 3000.0, 50.0),
        section(1, 3000.0, 3000.0, 400.0),
    ];
    let s = study();
    let result = s.run(&sections).unwrap();
    let electrical = PipelineElectricalParams::from_series_shunt(
        Complex64::new(0.12, 0.55),
        Complex64::new(0.002, 0.02),
    )
    .unwrap();

    let open = s
        .longitudinal_profile(&result, electrical, LineEnds::open())
        .unwrap();
    let (start, end) = open.ends().unwrap();
    assert!(open.current(0.0).unwrap().norm() < 1e-9);
    assert!(open.current(6.0).unwrap().norm() < 1e-9);
    assert!(start.norm() > 0.0 && end.norm() > 0.0);

    let grounded = s
        .longitudinal_profile(&result, electrical, LineEnds::grounded())
        .unwrap();
    assert!(grounded.voltage(0.0).unwrap().norm() < 1e-9);
    assert!(grounded.voltage(6.0).unwrap().norm() < 1e-9);
}

#[test]
fn study_result_serializes() {
    let result = study().run(&[section(0, 0.0, 1000.0, 70.0)]).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["sections"].as_array().map(Vec::len), Some(1));
    assert!(json["total_voltage"].is_array());
}
