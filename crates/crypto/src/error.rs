//! Confidentiality error types

use thiserror::Error;

/// Result type for envelope operations
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;

/// Result type for primitive operations and message codecs
pub type PrimitiveResult<T> = std::result::Result<T, PrimitiveError>;

/// Envelope error types
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The ledger query for the chaincode encryption key failed
    #[error("Failed to fetch chaincode encryption key: {0}")]
    KeyFetchFailed(String),

    /// The chaincode encryption key is not a valid encoded public key
    #[error("Failed to decode chaincode encryption key: {0}")]
    KeyDecodeFailed(#[source] PrimitiveError),

    /// Enclave key pairs could not be generated or encoded
    #[error("Invalid enclave key material: {0}")]
    KeyMaterial(#[source] PrimitiveError),

    #[error("Failed to conceal request: {0}")]
    ConcealFailed(#[source] PrimitiveError),

    /// The signed response envelope could not be decoded
    #[error("Failed to decode response: {0}")]
    RevealDecodeFailed(#[source] PrimitiveError),

    /// Missing response key, wrong key or tampered ciphertext
    #[error("Failed to decrypt response: {0}")]
    RevealDecryptFailed(#[source] PrimitiveError),

    /// Decrypted response content is not base64
    #[error("Malformed response content: {0}")]
    RevealContentMalformed(#[source] PrimitiveError),

    /// Enclave side: the confidential request could not be opened
    #[error("Failed to open request: {0}")]
    RequestOpenFailed(#[source] PrimitiveError),

    /// Enclave side: the response could not be encrypted or signed
    #[error("Failed to seal response: {0}")]
    ResponseSealFailed(#[source] PrimitiveError),
}

/// Failures of the symmetric, key transport and encoding primitives
#[derive(Error, Debug)]
pub enum PrimitiveError {
    #[error("message too short: {0} bytes")]
    Truncated(usize),

    #[error("encryption failed")]
    Encryption,

    /// Wrong key or tampered ciphertext
    #[error("authentication failed")]
    Authentication,

    #[error("invalid symmetric key length: {0} bytes")]
    KeyLength(usize),

    #[error("no {0} key available")]
    MissingKey(&'static str),

    #[error("RSA operation failed: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("invalid public key: {0}")]
    PublicKey(#[from] rsa::pkcs8::spki::Error),

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
