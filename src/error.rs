//! Unified error handling for the rotapost crate
//!
//! The scheduler keeps its own [`SchedulerError`]; everything that crosses
//! the storage, config or HTTP boundary is folded into [`Error`].
//!
//! # Architecture
//!
//! - [`RotapostErrorTrait`] - Common interface implemented by crate errors
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use rotapost::error::{Error, RotapostErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying: {err}");
//!     } else {
//!         eprintln!("Fatal error ({}): {err}", err.category());
//!     }
//! }
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

pub use crate::scheduler::error::SchedulerError;

/// Common trait for rotapost error types
pub trait RotapostErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad pools or safety configuration supplied by the caller
    Input,
    /// Storage and I/O errors
    Storage,
    /// Parsing and serialization errors
    Parsing,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Storage => "storage",
            Self::Parsing => "parsing",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the rotapost crate
#[derive(Error, Debug)]
pub enum Error {
    /// Scheduler errors (empty pools, bad safety config)
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RotapostErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            Self::Database(_) => false,
            Self::Io(_) => true,
            Self::Json(_) | Self::Toml(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Scheduler(e) if e.is_caller_error() => ErrorCategory::Input,
            Self::Scheduler(_) => ErrorCategory::Other,
            Self::Database(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) | Self::Toml(_) => ErrorCategory::Parsing,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The wrapped scheduler error, if any
    pub fn as_scheduler(&self) -> Option<&SchedulerError> {
        match self {
            Self::Scheduler(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::error::PoolKind;

    #[test]
    fn test_error_category() {
        let err: Error = SchedulerError::insufficient_pool(PoolKind::Targets).into();
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(err.as_scheduler().is_some());

        let db_err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(db_err.category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_is_recoverable() {
        let io_err: Error = io::Error::new(io::ErrorKind::TimedOut, "slow disk").into();
        assert!(io_err.is_recoverable());

        let pool_err: Error = SchedulerError::insufficient_pool(PoolKind::Actors).into();
        assert!(!pool_err.is_recoverable());
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("Invalid bind address");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Config error: Invalid bind address");
    }

    #[test]
    fn test_other_error() {
        let err = Error::with_source("import failed", io::Error::other("boom"));
        assert_eq!(err.category(), ErrorCategory::Other);
        assert!(std::error::Error::source(&err).is_some());
    }
}
