//! Shared error type across scrapemeter crates.

use thiserror::Error;

use crate::instrument::InstrumentKind;

/// Stable error codes (logged and surfaced to embedding applications).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Same name registered with a different kind.
    DuplicateDefinition,
    /// Second callback for one asynchronous instrument.
    DuplicateCallback,
    /// Lookup of an unregistered instrument.
    NotFound,
    /// Instrument name rejected by validation.
    InvalidName,
    /// Histogram boundaries not finite / not strictly increasing.
    InvalidBoundaries,
    /// Measurement rejected by the instrument's aggregation rule.
    InvalidValue,
    /// Callback registration on a synchronous instrument.
    NotAsynchronous,
    /// Observation callback returned an error.
    CallbackFailed,
    /// Observation callback missed the collection deadline.
    CallbackTimeout,
    /// Meter already shut down.
    ShutDown,
    /// Invalid static configuration.
    BadConfig,
    /// Exposition encoding failed.
    Encode,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::DuplicateDefinition => "DUPLICATE_DEFINITION",
            ErrorCode::DuplicateCallback => "DUPLICATE_CALLBACK",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::InvalidBoundaries => "INVALID_BOUNDARIES",
            ErrorCode::InvalidValue => "INVALID_VALUE",
            ErrorCode::NotAsynchronous => "NOT_ASYNCHRONOUS",
            ErrorCode::CallbackFailed => "CALLBACK_FAILED",
            ErrorCode::CallbackTimeout => "CALLBACK_TIMEOUT",
            ErrorCode::ShutDown => "SHUT_DOWN",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::Encode => "ENCODE",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MeterError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum MeterError {
    #[error("instrument {name} already defined as {existing}, requested {requested}")]
    DuplicateDefinition {
        name: String,
        existing: InstrumentKind,
        requested: InstrumentKind,
    },
    #[error("callback already registered for instrument {0}")]
    DuplicateCallback(String),
    #[error("instrument not found: {0}")]
    NotFound(String),
    #[error("invalid instrument name: {0}")]
    InvalidName(String),
    #[error("invalid histogram boundaries: {0}")]
    InvalidBoundaries(String),
    #[error("invalid value for {instrument}: {reason}")]
    InvalidValue { instrument: String, reason: String },
    #[error("instrument {0} is not asynchronous")]
    NotAsynchronous(String),
    #[error("callback for {instrument} failed: {reason}")]
    Callback { instrument: String, reason: String },
    #[error("callback for {instrument} timed out")]
    CallbackTimeout { instrument: String },
    #[error("meter is shut down")]
    ShutDown,
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("encode: {0}")]
    Encode(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MeterError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeterError::DuplicateDefinition { .. } => ErrorCode::DuplicateDefinition,
            MeterError::DuplicateCallback(_) => ErrorCode::DuplicateCallback,
            MeterError::NotFound(_) => ErrorCode::NotFound,
            MeterError::InvalidName(_) => ErrorCode::InvalidName,
            MeterError::InvalidBoundaries(_) => ErrorCode::InvalidBoundaries,
            MeterError::InvalidValue { .. } => ErrorCode::InvalidValue,
            MeterError::NotAsynchronous(_) => ErrorCode::NotAsynchronous,
            MeterError::Callback { .. } => ErrorCode::CallbackFailed,
            MeterError::CallbackTimeout { .. } => ErrorCode::CallbackTimeout,
            MeterError::ShutDown => ErrorCode::ShutDown,
            MeterError::BadConfig(_) => ErrorCode::BadConfig,
            MeterError::Encode(_) => ErrorCode::Encode,
            MeterError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub(crate) fn invalid_value(instrument: &str, reason: impl Into<String>) -> Self {
        MeterError::InvalidValue {
            instrument: instrument.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<std::fmt::Error> for MeterError {
    fn from(e: std::fmt::Error) -> Self {
        MeterError::Encode(e.to_string())
    }
}
