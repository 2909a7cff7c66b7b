//! Unified error types for the EMI engine
//!
//! This module provides a common error type [`EmiError`] shared by the matrix
//! engine, the configuration boundary and the CLI. Errors are raised at the
//! point of detection and never retried: they describe bad input, not
//! transient failure.
//!
//! # Example
//!
//! ```ignore
//! use emi_core::{EmiError, EmiResult};
//!
//! fn section_emf(path: &str) -> EmiResult<f64> {
//!     let ohl = load_ohl_config(path)?;
//!     let system = ElectromagneticSystem::build(&ohl.conductors, &ohl.params, &ohl.catalog)?;
//!     Ok(system.steady_state_emf(&currents)?.emf.norm())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all EMI operations.
#[derive(Error, Debug)]
pub enum EmiError {
    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unresolvable conductor type, missing phase label, malformed route
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-positive resistivity/permittivity/diameter, inconsistent geometry
    #[error("Physical range error: {0}")]
    PhysicalRange(String),

    /// A matrix that must be inverted is singular
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using EmiError.
pub type EmiResult<T> = Result<T, EmiError>;

impl EmiError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        EmiError::Configuration(msg.into())
    }

    pub fn physical_range(msg: impl Into<String>) -> Self {
        EmiError::PhysicalRange(msg.into())
    }

    pub fn singular(msg: impl Into<String>) -> Self {
        EmiError::SingularMatrix(msg.into())
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for EmiError {
    fn from(err: anyhow::Error) -> Self {
        EmiError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for EmiError {
    fn from(s: String) -> Self {
        EmiError::Other(s)
    }
}

impl From<&str> for EmiError {
    fn from(s: &str) -> Self {
        EmiError::Other(s.to_string())
    }
}

// JSON parsing errors
impl From<serde_json::Error> for EmiError {
    fn from(err: serde_json::Error) -> Self {
        EmiError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EmiError::singular("earth-wire block is not invertible");
        assert!(err.to_string().contains("Singular matrix"));
        assert!(err.to_string().contains("earth-wire block"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let emi_err: EmiError = io_err.into();
        assert!(matches!(emi_err, EmiError::Io(_)));
    }

    #[test]
    fn test_json_error_is_parse() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let emi_err: EmiError = json_err.into();
        assert!(matches!(emi_err, EmiError::Parse(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> EmiResult<()> {
            Err(EmiError::physical_range("frequency must be positive"))
        }

        fn outer() -> EmiResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(EmiError::PhysicalRange(_))));
    }
}
