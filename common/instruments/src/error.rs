//! Registry error types.

use thiserror::Error;

/// Registration errors. All of these are construction-time: the registry
/// refuses ambiguous names up front instead of letting two instruments race
/// under one name at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstrumentError {
    #[error("meter '{0}' is already registered")]
    MeterExists(String),

    #[error("instrument '{name}' is already registered on meter '{meter}'")]
    InstrumentExists { meter: String, name: String },

    #[error("meter '{0}' has been released")]
    MeterReleased(String),

    #[error("trace source '{0}' is already registered")]
    TraceSourceExists(String),
}

/// Failure reported by a pull-based instrument's callback during collection.
///
/// Collection never maps a failed callback to a default value; a zero that
/// means "callback broken" is indistinguishable from a real zero.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ObserveError {
    message: String,
}

impl ObserveError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
