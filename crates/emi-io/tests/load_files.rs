use std::io::Write;
use std::path::PathBuf;

use emi_algo::{InterferenceStudy, RouteSectionizer, SectionizerConfig};
use emi_core::EmiError;
use emi_io::{load_currents_config, load_ohl_config, load_pipeline_config, load_route};
use tempfile::NamedTempFile;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

#[test]
fn demo_files_load() {
    let ohl = load_ohl_config(demo("example_3_4_tower.json")).unwrap();
    assert_eq!(ohl.conductors.len(), 7);
    assert_eq!(ohl.circuits(), vec!["C1", "C2"]);

    let pipe = load_pipeline_config(demo("pipeline_dn600.json")).unwrap();
    assert_eq!(pipe.name, "DN600");

    let currents = load_currents_config(demo("currents_500a.json")).unwrap();
    assert_eq!(currents.steady_state.len(), 6);
    assert_eq!(currents.require_fault().unwrap().faulted_phase, "C1_R");

    let route = load_route(demo("pipeline_route.json")).unwrap();
    assert!((route.length().value() - 1538.516_48).abs() < 1e-3);
}

#[test]
fn route_study_from_files() {
    let ohl = load_ohl_config(demo("example_3_4_tower.json")).unwrap();
    let pipe = load_pipeline_config(demo("pipeline_dn600.json")).unwrap();
    let currents = load_currents_config(demo("currents_500a.json")).unwrap();
    let ohl_route = load_route(demo("ohl_route.json")).unwrap();
    let pipeline_route = load_route(demo("pipeline_route.json")).unwrap();

    let mut catalog = ohl.catalog.clone();
    pipe.register(&mut catalog).unwrap();

    let sections = RouteSectionizer::new(&ohl_route, SectionizerConfig::default())
        .unwrap()
        .sectionize(&pipeline_route)
        .unwrap();
    let result = InterferenceStudy::new(
        ohl.conductors,
        catalog,
        ohl.params,
        pipe.conductor_at(0.0),
        currents.steady_state,
    )
    .run(&sections)
    .unwrap();

    assert!((result.sections[0].emf.norm() - 17.43).abs() < 0.1);
    assert!((result.sections[1].emf.norm() - 6.71).abs() < 0.1);
    assert!((result.total_voltage.norm() - 20.94).abs() < 0.1);
}

#[test]
fn missing_file_is_io_error() {
    assert!(matches!(
        load_ohl_config(demo("no_such_tower.json")),
        Err(EmiError::Io(_))
    ));
}

#[test]
fn parse_errors_name_the_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{ \"name\": \"broken\", \"coordinates_m\": [[0, 0], ").unwrap();
    let err = load_route(file.path()).unwrap_err();
    match err {
        EmiError::Parse(msg) => assert!(msg.contains(&file.path().display().to_string())),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn currents_from_temp_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "C1": {{ "R": {{ "magnitude": 1000, "angle_deg": -30 }} }} }}"#
    )
    .unwrap();
    let currents = load_currents_config(file.path()).unwrap();
    let r = currents.steady_state.get("C1", "R").unwrap();
    assert!((r.norm() - 1000.0).abs() < 1e-9);
    assert!((r.arg().to_degrees() + 30.0).abs() < 1e-9);
}
