//! Enclave-side counterpart of the encryption context
//!
//! Holds the enclave's long-lived key pairs: an RSA key that clients wrap request keys
//! for, and a P-256 key that signs responses. Both public keys are published through
//! [`AttestedCredentials`] together with evidence binding the verifying key.

use crate::error::{CryptoError, CryptoResult, PrimitiveError};
use crate::keys::{decrypt_message, encrypt_message, generate_encryption_key, unwrap_key, SymmetricKey};
use crate::messages::{
    AttestedCredentials, ChaincodeRequestMessage, ChaincodeResponseMessage,
    CleartextChaincodeRequest, SignedChaincodeResponseMessage, WireMessage,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use pcc_attestation::Evidence;
use rand::rngs::OsRng;
use rsa::pkcs8::EncodePublicKey;
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Enclave id for a SEC1 compressed verifying key
pub fn enclave_id_for(verifying_key: &[u8]) -> String {
    hex::encode(Sha256::digest(verifying_key))
}

/// Key material of one enclave instance
pub struct EnclaveCrypto {
    decryption_key: RsaPrivateKey,
    signing_key: SigningKey,
}

impl EnclaveCrypto {
    /// Generate fresh key pairs
    pub fn generate() -> CryptoResult<Self> {
        let decryption_key = generate_encryption_key().map_err(CryptoError::KeyMaterial)?;
        Ok(Self::from_keys(decryption_key, SigningKey::random(&mut OsRng)))
    }

    pub fn from_keys(decryption_key: RsaPrivateKey, signing_key: SigningKey) -> Self {
        Self {
            decryption_key,
            signing_key,
        }
    }

    /// Encryption key in the form published on the ledger
    pub fn public_encryption_key(&self) -> CryptoResult<String> {
        crate::keys::encode_public_key(&self.decryption_key.to_public_key())
            .map_err(CryptoError::KeyMaterial)
    }

    /// SEC1 compressed response verifying key
    pub fn verifying_key_bytes(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    pub fn enclave_id(&self) -> String {
        enclave_id_for(&self.verifying_key_bytes())
    }

    /// Credentials to register, with `evidence` binding [`Self::verifying_key_bytes`]
    pub fn attested_credentials(
        &self,
        chaincode_id: &str,
        evidence: Evidence,
    ) -> CryptoResult<AttestedCredentials> {
        let encryption_key = self
            .decryption_key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyMaterial(e.into()))?;

        Ok(AttestedCredentials {
            enclave_id: self.enclave_id(),
            chaincode_id: chaincode_id.to_string(),
            encryption_key: encryption_key.as_bytes().to_vec(),
            verifying_key: self.verifying_key_bytes(),
            evidence,
        })
    }

    /// Decrypt a request produced by [`EncryptionContext::conceal`](crate::EncryptionContext::conceal)
    pub fn open_request(&self, request: &str) -> CryptoResult<CleartextChaincodeRequest> {
        let message = ChaincodeRequestMessage::from_base64(request.as_bytes())
            .map_err(CryptoError::RequestOpenFailed)?;
        let request_key = unwrap_key(&self.decryption_key, &message.encrypted_key_transport_message)
            .map_err(CryptoError::RequestOpenFailed)?;
        let cleartext = decrypt_message(&request_key, &message.encrypted_request)
            .map_err(CryptoError::RequestOpenFailed)?;

        let request =
            CleartextChaincodeRequest::from_bytes(&cleartext).map_err(CryptoError::RequestOpenFailed)?;
        debug!(function = %request.function, "opened confidential request");
        Ok(request)
    }

    /// Encrypt `result` under the request's return key and sign the response.
    ///
    /// Returns base64 text of a [`SignedChaincodeResponseMessage`].
    pub fn seal_response(
        &self,
        request: &CleartextChaincodeRequest,
        chaincode_id: &str,
        result: &[u8],
    ) -> CryptoResult<String> {
        let response_key = SymmetricKey::from_slice(&request.return_encryption_key).ok_or_else(|| {
            CryptoError::ResponseSealFailed(PrimitiveError::KeyLength(
                request.return_encryption_key.len(),
            ))
        })?;
        let content = STANDARD.encode(result);
        let encrypted_response = encrypt_message(&response_key, content.as_bytes())
            .map_err(CryptoError::ResponseSealFailed)?;

        let response = ChaincodeResponseMessage {
            encrypted_response,
            chaincode_id: chaincode_id.to_string(),
            enclave_id: self.enclave_id(),
        }
        .to_bytes()
        .map_err(CryptoError::ResponseSealFailed)?;

        let signature: Signature = self.signing_key.sign(&response);
        SignedChaincodeResponseMessage {
            chaincode_response_message: response,
            signature: signature.to_bytes().to_vec(),
        }
        .to_base64()
        .map_err(CryptoError::ResponseSealFailed)
    }
}

impl std::fmt::Debug for EnclaveCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnclaveCrypto")
            .field("enclave_id", &self.enclave_id())
            .finish()
    }
}
