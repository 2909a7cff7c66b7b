//! Route trajectory file: `{ "name": "...", "coordinates_m": [[x, y, z], ...] }`.
//! Two-element points are taken at `z = 0`.

use std::path::Path;

use emi_core::{EmiError, EmiResult, Point3, Route};
use serde::Deserialize;

use crate::{parse_json, read_file};

#[derive(Debug, Deserialize)]
struct RouteFile {
    name: String,
    coordinates_m: Vec<Vec<f64>>,
}

pub fn load_route(path: impl AsRef<Path>) -> EmiResult<Route> {
    let path = path.as_ref();
    let text = read_file(path)?;
    load_route_from_str(&text).map_err(|e| match e {
        EmiError::Parse(msg) => EmiError::Parse(format!("{}: {msg}", path.display())),
        other => other,
    })
}

pub fn load_route_from_str(text: &str) -> EmiResult<Route> {
    let file: RouteFile = parse_json(text, "route trajectory")?;
    let points = file
        .coordinates_m
        .iter()
        .enumerate()
        .map(|(i, c)| match c.as_slice() {
            [x, y] => Ok(Point3::new(*x, *y, 0.0)),
            [x, y, z] => Ok(Point3::new(*x, *y, *z)),
            _ => Err(EmiError::Parse(format!(
                "route '{}' point {i} has {} coordinates, expected 2 or 3",
                file.name,
                c.len()
            ))),
        })
        .collect::<EmiResult<Vec<_>>>()?;
    Route::new(file.name, points)
}
