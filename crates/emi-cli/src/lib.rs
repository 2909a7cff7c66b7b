pub mod cli;
pub mod common;

pub use cli::{BoundarySpec, Cli, Commands, EarthModel};
