//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Pool kinds consumed by a scheduling run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    Actors,
    Targets,
    Texts,
    Media,
}

impl PoolKind {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Actors => "actors",
            Self::Targets => "targets",
            Self::Texts => "texts",
            Self::Media => "media",
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// A required pool has no eligible members
    InsufficientPool {
        pool: PoolKind,
    },

    /// Safety configuration rejected by validation
    InvalidSafetyConfig {
        field: String,
        reason: String,
    },

    /// Missing field while building a safety configuration
    MissingSafetyField {
        field: &'static str,
    },

    /// Unparseable time of day
    InvalidTime {
        value: String,
    },

    /// Serialization/deserialization error
    SerializationError {
        reason: String,
    },

    /// IO error
    IoError {
        operation: String,
        reason: String,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientPool { pool } => {
                write!(f, "Insufficient pool: no eligible {} available", pool)
            }
            Self::InvalidSafetyConfig { field, reason } => {
                write!(f, "Invalid safety config '{}': {}", field, reason)
            }
            Self::MissingSafetyField { field } => {
                write!(f, "Safety config field '{}' must be set explicitly", field)
            }
            Self::InvalidTime { value } => {
                write!(f, "Invalid time '{}'. Expected HH:MM", value)
            }
            Self::SerializationError { reason } => {
                write!(f, "Serialization error: {}", reason)
            }
            Self::IoError { operation, reason } => {
                write!(f, "IO error during '{}': {}", operation, reason)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for SchedulerError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            operation: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl SchedulerError {
    /// Create an insufficient pool error
    pub fn insufficient_pool(pool: PoolKind) -> Self {
        Self::InsufficientPool { pool }
    }

    /// Create an invalid safety config error
    pub fn invalid_safety(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSafetyConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an IO error with context
    pub fn io_error(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IoError {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// The empty pool, if this is an entry validation failure
    pub fn empty_pool(&self) -> Option<PoolKind> {
        match self {
            Self::InsufficientPool { pool } => Some(*pool),
            _ => None,
        }
    }

    /// Whether the caller supplied bad input (maps to a 4xx at the API edge)
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientPool { .. }
                | Self::InvalidSafetyConfig { .. }
                | Self::MissingSafetyField { .. }
                | Self::InvalidTime { .. }
        )
    }

    /// Check if the error is recoverable
    ///
    /// Scheduling is deterministic, so only IO failures are worth retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::IoError { .. })
    }
}
