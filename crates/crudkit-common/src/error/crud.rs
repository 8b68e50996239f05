//! Query building and execution error types.

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // Spec errors (0x0100 - 0x01FF)
    /// Malformed or contradictory query specification.
    InvalidSpec = 0x0100,

    // Configuration errors (0x0200 - 0x02FF)
    /// Missing schema metadata, bad dialect, unset connection.
    Configuration = 0x0200,
    /// Configuration file could not be read.
    Io = 0x0201,

    // Execution errors (0x0300 - 0x03FF)
    /// The database client failed to prepare or execute.
    ExecutionFailed = 0x0300,
    /// A sequence fetch returned no usable identifier.
    SequenceExhausted = 0x0301,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x01 => "Spec",
            0x02 => "Configuration",
            0x03 => "Execution",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for crudkit.
///
/// Every failure is surfaced synchronously at the call that caused it.
/// Nothing in crudkit retries; see [`CrudError::is_retryable`].
///
/// # Example
///
/// ```rust
/// use crudkit_common::error::{CrudError, CrudResult, ErrorCode};
///
/// fn check_table(name: &str) -> CrudResult<()> {
///     if name.is_empty() {
///         return Err(CrudError::configuration("table name is empty"));
///     }
///     Ok(())
/// }
///
/// assert_eq!(check_table("").unwrap_err().code(), ErrorCode::Configuration);
/// ```
#[derive(Debug, Error)]
pub enum CrudError {
    /// The query specification is malformed or contradictory.
    #[error("invalid query spec: {message}")]
    InvalidSpec {
        /// Error message.
        message: String,
    },

    /// Programmer or deployment error: missing schema, bad dialect.
    #[error("configuration error: {message}")]
    Configuration {
        /// Error message.
        message: String,
    },

    /// I/O error while loading configuration.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The database client reported a failed prepare or execute.
    #[error("execution failed: {message}")]
    Execution {
        /// Error message.
        message: String,
        /// The driver error, when one is available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    /// A sequence fetch produced no usable identifier.
    #[error("sequence '{sequence}' returned no usable value")]
    SequenceExhausted {
        /// The sequence name.
        sequence: String,
    },
}

impl CrudError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidSpec { .. } => ErrorCode::InvalidSpec,
            Self::Configuration { .. } => ErrorCode::Configuration,
            Self::Io { .. } => ErrorCode::Io,
            Self::Execution { .. } => ErrorCode::ExecutionFailed,
            Self::SequenceExhausted { .. } => ErrorCode::SequenceExhausted,
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Always false: retry and backoff belong to the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }

    /// Returns true if the error was raised before any SQL reached the database.
    #[must_use]
    pub const fn is_spec_error(&self) -> bool {
        matches!(self, Self::InvalidSpec { .. })
    }

    /// Creates an invalid spec error.
    #[must_use]
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an execution error without an underlying source.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an execution error wrapping a driver error.
    #[must_use]
    pub fn driver<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Execution {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }
}

impl From<toml::de::Error> for CrudError {
    fn from(e: toml::de::Error) -> Self {
        CrudError::configuration(e.to_string())
    }
}

impl From<toml::ser::Error> for CrudError {
    fn from(e: toml::ser::Error) -> Self {
        CrudError::configuration(e.to_string())
    }
}
