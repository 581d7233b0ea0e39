//! Error handling for the election system

use crate::types::{ElectionStatus, StatusRequirement};

/// Result type alias for the election system
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the election system
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Operation attempted in the wrong lifecycle phase
    #[error("Cannot {operation}: election status is {current}, required {required}")]
    InvalidStateTransition {
        operation: String,
        required: StatusRequirement,
        current: ElectionStatus,
    },

    /// Referenced voter or candidate does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Uniqueness violation (duplicate national id, repeated verification)
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Voter exists but may not vote
    #[error("Voter {voter_id} is not eligible to vote: {reason}")]
    VoterIneligible { voter_id: String, reason: String },

    /// Voter already cast their ballot
    #[error("Voter {voter_id} has already cast their vote")]
    AlreadyVoted { voter_id: String },

    /// Authentication or session failure
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Input validation errors
    #[error("Validation failed: {field}")]
    Validation { field: String },

    /// Missing or malformed configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Console input/output errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new state transition error
    pub fn invalid_state(
        operation: impl Into<String>,
        required: ElectionStatus,
        current: ElectionStatus,
    ) -> Self {
        Self::InvalidStateTransition {
            operation: operation.into(),
            required: StatusRequirement::Exactly(required),
            current,
        }
    }

    /// Create a state error for an operation refused once the election closed
    pub fn election_closed(operation: impl Into<String>) -> Self {
        Self::InvalidStateTransition {
            operation: operation.into(),
            required: StatusRequirement::NotClosed,
            current: ElectionStatus::Closed,
        }
    }

    /// Create a new not-found error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a new conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a new eligibility error
    pub fn ineligible(voter_id: impl ToString, reason: impl Into<String>) -> Self {
        Self::VoterIneligible {
            voter_id: voter_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a new already-voted error
    pub fn already_voted(voter_id: impl ToString) -> Self {
        Self::AlreadyVoted {
            voter_id: voter_id.to_string(),
        }
    }

    /// Create a new unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }

    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for every reason a voter may be refused a ballot, including
    /// having voted already.
    pub fn is_voter_ineligible(&self) -> bool {
        matches!(self, Self::VoterIneligible { .. } | Self::AlreadyVoted { .. })
    }
}

/// Convenience macros for creating specific error types
#[macro_export]
macro_rules! conflict_error {
    ($msg:expr) => {
        $crate::Error::conflict($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::conflict(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::Error::internal($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::internal(format!($fmt, $($arg)*))
    };
}
