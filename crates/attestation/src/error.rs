//! Attestation error types

use thiserror::Error;

/// Result type for attestation operations
pub type AttestationResult<T> = std::result::Result<T, AttestationError>;

/// Attestation error types
#[derive(Error, Debug)]
pub enum AttestationError {
    /// The hardware backend cannot run on this platform
    #[error("Attestation unsupported on this platform: {0}")]
    Unsupported(String),

    /// Any other failure while producing evidence
    #[error("Attestation issuance failed: {0}")]
    IssuanceFailed(String),

    /// No issuer registered under the requested tag
    #[error("No issuer registered for evidence type: {0}")]
    IssuerNotFound(String),

    /// No verifier registered for the evidence type
    #[error("No verifier registered for evidence type: {0}")]
    VerifierNotFound(String),

    /// No converter registered for the attestation type
    #[error("No converter registered for attestation type: {0}")]
    ConverterNotFound(String),

    /// Report data is not bound to the expected statement
    #[error("Report data does not match the expected statement")]
    StatementMismatch,

    /// Report was produced by a different code image
    #[error("Measurement mismatch: expected {expected}, got {actual}")]
    MeasurementMismatch {
        /// Expected measurement (hex)
        expected: String,
        /// Measurement found in the report (hex)
        actual: String,
    },

    /// Report is malformed or its signature does not verify
    #[error("Invalid attestation report: {0}")]
    ReportInvalid(String),

    /// Expected validation values supplied by the caller are unusable
    #[error("Invalid validation values: {0}")]
    InvalidValidationValues(String),

    /// Evidence (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AttestationError {
    /// Build a measurement mismatch error with hex-encoded values
    pub fn measurement_mismatch(expected: &[u8], actual: &[u8]) -> Self {
        AttestationError::MeasurementMismatch {
            expected: hex::encode(expected),
            actual: hex::encode(actual),
        }
    }

    /// Whether this error is a semantic mismatch rather than a broken report
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            AttestationError::StatementMismatch | AttestationError::MeasurementMismatch { .. }
        )
    }
}
