//! Validation error types

use thiserror::Error;

/// Result type for validation plugin operations
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Errors returned by validation plugins to the ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Malformed block, context or transaction position
    #[error("Invalid validation input: {0}")]
    Structural(String),

    /// Plugin initialization or wiring problem
    #[error("Validation plugin misconfigured: {0}")]
    Configuration(String),

    /// Validation could not be carried out; the transaction may be retried
    #[error("Validation execution failure: {0}")]
    ExecutionFailure(String),

    /// Transaction does not satisfy the endorsement policy
    #[error("Endorsement policy failure: {0}")]
    EndorsementPolicy(String),
}

/// Outcome classes a transaction validator may report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxValidationError {
    #[error("Execution failure: {0}")]
    ExecutionFailure(String),

    #[error("Endorsement policy failure: {0}")]
    EndorsementPolicy(String),

    /// Any other outcome; reaching the chain with this is a programming error
    #[error("Unclassified validation error: {0}")]
    Unclassified(String),
}

impl TxValidationError {
    pub fn execution(reason: impl std::fmt::Display) -> Self {
        TxValidationError::ExecutionFailure(reason.to_string())
    }

    pub fn policy(reason: impl std::fmt::Display) -> Self {
        TxValidationError::EndorsementPolicy(reason.to_string())
    }
}

impl From<ValidationError> for TxValidationError {
    /// Only execution and policy failures describe a transaction outcome
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::ExecutionFailure(reason) => TxValidationError::ExecutionFailure(reason),
            ValidationError::EndorsementPolicy(reason) => {
                TxValidationError::EndorsementPolicy(reason)
            }
            other => TxValidationError::Unclassified(other.to_string()),
        }
    }
}
