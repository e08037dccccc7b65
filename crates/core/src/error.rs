//! Configuration errors.

use thiserror::Error;

/// Errors raised while validating strategy or application configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// IV filter mode is not one of the supported names.
    #[error("invalid iv_filter_mode: {0}")]
    UnknownIvFilterMode(String),

    /// A lower bound exceeds its upper bound.
    #[error("invalid range for {field}: min {min} > max {max}")]
    InvertedRange {
        field: &'static str,
        min: String,
        max: String,
    },

    /// A moving-average window is zero or the short window is not shorter.
    #[error("invalid moving-average windows: short {short}, long {long}")]
    InvalidWindows { short: usize, long: usize },

    /// A fraction lies outside its allowed interval or is not finite.
    #[error("{field} must be within [0, 1], got {value}")]
    FractionOutOfRange { field: &'static str, value: f64 },

    /// A required setting is missing.
    #[error("missing setting: {0}")]
    Missing(&'static str),
}

impl ConfigError {
    pub fn inverted<T: std::fmt::Display>(field: &'static str, min: T, max: T) -> Self {
        Self::InvertedRange {
            field,
            min: min.to_string(),
            max: max.to_string(),
        }
    }
}
