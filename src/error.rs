//! Error types for Congelar

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed architecture descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("Unknown operation '{op}' in layer '{layer}'")]
    UnknownOp { layer: String, op: String },

    #[error("Weight archive is missing parameter '{0}'")]
    MissingParameter(String),

    #[error("Weight archive contains undeclared parameter '{0}'")]
    UnexpectedParameter(String),

    #[error("Shape mismatch for '{name}': expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
