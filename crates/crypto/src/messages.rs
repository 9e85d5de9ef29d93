//! Wire messages exchanged between clients, the ledger and the enclave
//!
//! All messages are JSON with byte fields as standard base64. Messages that cross
//! the ledger as text are additionally base64 encoded as a whole.

use crate::error::PrimitiveResult;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pcc_attestation::evidence::base64_bytes;
use pcc_attestation::Evidence;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// JSON and base64 text encodings shared by all wire messages
pub trait WireMessage: Serialize + DeserializeOwned {
    fn to_bytes(&self) -> PrimitiveResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn from_bytes(data: &[u8]) -> PrimitiveResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    fn to_base64(&self) -> PrimitiveResult<String> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    fn from_base64(text: &[u8]) -> PrimitiveResult<Self> {
        let data = STANDARD.decode(trim_ascii(text))?;
        Self::from_bytes(&data)
    }
}

fn trim_ascii(text: &[u8]) -> &[u8] {
    let start = text
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(text.len());
    let end = text
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &text[start..end]
}

/// Invocation as seen by the enclave after decryption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleartextChaincodeRequest {
    pub function: String,
    pub args: Vec<String>,
    /// Key the enclave must encrypt the response with
    #[serde(with = "base64_bytes")]
    pub return_encryption_key: Vec<u8>,
}

/// Confidential request submitted through the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeRequestMessage {
    /// Cleartext request under the request key
    #[serde(with = "base64_bytes")]
    pub encrypted_request: Vec<u8>,
    /// Request key under the chaincode public key
    #[serde(with = "base64_bytes")]
    pub encrypted_key_transport_message: Vec<u8>,
}

/// Enclave response with its protocol metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeResponseMessage {
    /// base64 of the result, under the response key
    #[serde(with = "base64_bytes")]
    pub encrypted_response: Vec<u8>,
    #[serde(default)]
    pub chaincode_id: String,
    #[serde(default)]
    pub enclave_id: String,
}

/// Response message with the enclave's detached signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedChaincodeResponseMessage {
    /// Serialized [`ChaincodeResponseMessage`]
    #[serde(with = "base64_bytes")]
    pub chaincode_response_message: Vec<u8>,
    /// ECDSA P-256 signature (`r || s`) over `chaincode_response_message`
    #[serde(default, with = "base64_bytes")]
    pub signature: Vec<u8>,
}

/// Enclave identity registered on the ledger by the enclave registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedCredentials {
    pub enclave_id: String,
    pub chaincode_id: String,
    /// DER SubjectPublicKeyInfo of the enclave encryption key
    #[serde(with = "base64_bytes")]
    pub encryption_key: Vec<u8>,
    /// SEC1 compressed P-256 key the enclave signs responses with
    #[serde(with = "base64_bytes")]
    pub verifying_key: Vec<u8>,
    /// Evidence binding `verifying_key`
    pub evidence: Evidence,
}

impl WireMessage for CleartextChaincodeRequest {}
impl WireMessage for ChaincodeRequestMessage {}
impl WireMessage for ChaincodeResponseMessage {}
impl WireMessage for SignedChaincodeResponseMessage {}
impl WireMessage for AttestedCredentials {}
