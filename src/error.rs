//! Top-level error type

use pcc_attestation::AttestationError;
use pcc_crypto::CryptoError;
use pcc_validation::ValidationError;
use thiserror::Error;

/// Errors surfaced by the client facade
#[derive(Debug, Error)]
pub enum PccError {
    #[error("Attestation error: {0}")]
    Attestation(#[from] AttestationError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The ledger gateway rejected or failed a call
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for facade operations
pub type PccResult<T> = Result<T, PccError>;
