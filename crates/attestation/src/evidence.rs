//! Evidence model shared by issuers and verifiers

use crate::error::{AttestationError, AttestationResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Helper module for serializing/deserializing bytes as standard base64
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Base64Visitor;

        impl<'de> Visitor<'de> for Base64Visitor {
            type Value = Vec<u8>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a base64 encoded string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Vec<u8>, E>
            where
                E: de::Error,
            {
                STANDARD.decode(v).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(Base64Visitor)
    }
}

/// What is being attested, e.g. an enclave public key or a request digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement(Vec<u8>);

impl Statement {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// SHA-256 digest that reports carry in their custom data field
    pub fn digest(&self) -> [u8; 32] {
        statement_digest(&self.0)
    }
}

impl From<Vec<u8>> for Statement {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Statement {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Hash binding a statement to a report
pub fn statement_digest(statement: &[u8]) -> [u8; 32] {
    Sha256::digest(statement).into()
}

/// Portable attestation evidence, tagged with the backend that issued it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Issuing backend tag (e.g. `sgx-dcap`, `simulation`)
    #[serde(rename = "type")]
    pub evidence_type: String,
    /// Backend-specific proof
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Evidence {
    pub fn new(evidence_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            evidence_type: evidence_type.into(),
            data,
        }
    }

    /// Serialize to the JSON wire form
    pub fn to_bytes(&self) -> AttestationResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from the JSON wire form
    pub fn from_bytes(data: &[u8]) -> AttestationResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Trust anchor the verifying party checks evidence against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationValues {
    /// Statement the report must be bound to
    pub statement: Vec<u8>,
    /// Expected enclave measurement (MRENCLAVE), hex encoded
    pub measurement: String,
}

impl ValidationValues {
    pub fn new(statement: impl Into<Vec<u8>>, measurement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            measurement: measurement.into(),
        }
    }

    /// Decode the expected measurement from its hex form
    pub fn measurement_bytes(&self) -> AttestationResult<Vec<u8>> {
        hex::decode(self.measurement.trim()).map_err(|e| {
            AttestationError::InvalidValidationValues(format!(
                "cannot decode expected measurement: {}",
                e
            ))
        })
    }
}
