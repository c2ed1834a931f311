//! Error types
//!
//! One `thiserror` enum per concern. Expected outcomes (rejected inputs,
//! missing remediation, malformed labels) are not errors and never show up
//! here; they are modelled as values in `diagnosis::types`.

use thiserror::Error;

/// Broken classifier contract or classifier failure
#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error("prediction vector has {actual} entries but the label set has {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("prediction vector is empty")]
    EmptyVector,

    #[error("probability at index {index} is not in [0, 1]: {value}")]
    InvalidProbability { index: usize, value: f64 },

    #[error("classifier failed: {0}")]
    Classifier(String),
}

/// History store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("diagnosis record not found: {0}")]
    NotFound(String),

    #[error("diagnosis record {0} belongs to another user")]
    NotOwner(String),

    #[error("history backend error: {0}")]
    Backend(String),
}

/// Label set and knowledge base loading errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid label set: {0}")]
    InvalidLabelSet(String),

    #[error("invalid knowledge base entry '{key}': {reason}")]
    InvalidRecord { key: String, reason: String },
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
