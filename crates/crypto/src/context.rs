//! Per-invocation encryption context

use crate::error::{CryptoError, CryptoResult, PrimitiveError};
use crate::keys::{decrypt_message, encrypt_message, wrap_key, SymmetricKey};
use crate::messages::{
    ChaincodeRequestMessage, ChaincodeResponseMessage, CleartextChaincodeRequest,
    SignedChaincodeResponseMessage, WireMessage,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::RsaPublicKey;
use std::sync::Arc;
use tracing::debug;

/// Conceals one chaincode invocation and reveals its response.
///
/// The request and response keys are generated by [`conceal`](Self::conceal), owned
/// exclusively by this context and zeroized when it is dropped or concealed again.
pub struct EncryptionContext {
    chaincode_key: Arc<RsaPublicKey>,
    request_key: Option<SymmetricKey>,
    response_key: Option<SymmetricKey>,
}

impl EncryptionContext {
    pub fn new(chaincode_key: Arc<RsaPublicKey>) -> Self {
        Self {
            chaincode_key,
            request_key: None,
            response_key: None,
        }
    }

    pub fn chaincode_key(&self) -> &RsaPublicKey {
        &self.chaincode_key
    }

    /// Encrypt an invocation of `function` for the enclave.
    ///
    /// Returns base64 text of a [`ChaincodeRequestMessage`]. On failure no keys are
    /// retained.
    pub fn conceal(&mut self, function: &str, args: &[String]) -> CryptoResult<String> {
        self.request_key = None;
        self.response_key = None;

        let request_key = SymmetricKey::generate();
        let response_key = SymmetricKey::generate();

        let cleartext = CleartextChaincodeRequest {
            function: function.to_string(),
            args: args.to_vec(),
            return_encryption_key: response_key.as_bytes().to_vec(),
        };
        let cleartext = cleartext.to_bytes().map_err(CryptoError::ConcealFailed)?;

        let encrypted_request =
            encrypt_message(&request_key, &cleartext).map_err(CryptoError::ConcealFailed)?;
        let encrypted_key_transport_message =
            wrap_key(&self.chaincode_key, &request_key).map_err(CryptoError::ConcealFailed)?;

        let message = ChaincodeRequestMessage {
            encrypted_request,
            encrypted_key_transport_message,
        }
        .to_base64()
        .map_err(CryptoError::ConcealFailed)?;

        debug!(function = %function, args = args.len(), "concealed chaincode request");
        self.request_key = Some(request_key);
        self.response_key = Some(response_key);
        Ok(message)
    }

    /// Decrypt a signed response produced for the last concealed request.
    ///
    /// `signed_response` is base64 text of a [`SignedChaincodeResponseMessage`]. The
    /// signature is not checked here; that is the validator's job.
    pub fn reveal(&self, signed_response: &[u8]) -> CryptoResult<Vec<u8>> {
        let signed = SignedChaincodeResponseMessage::from_base64(signed_response)
            .map_err(CryptoError::RevealDecodeFailed)?;
        let response = ChaincodeResponseMessage::from_bytes(&signed.chaincode_response_message)
            .map_err(CryptoError::RevealDecodeFailed)?;

        let response_key = self.response_key.as_ref().ok_or_else(|| {
            CryptoError::RevealDecryptFailed(PrimitiveError::MissingKey("response"))
        })?;
        let content = decrypt_message(response_key, &response.encrypted_response)
            .map_err(CryptoError::RevealDecryptFailed)?;

        STANDARD
            .decode(&content)
            .map_err(|e| CryptoError::RevealContentMalformed(e.into()))
    }

    #[cfg(test)]
    pub(crate) fn response_key(&self) -> Option<&SymmetricKey> {
        self.response_key.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn request_key(&self) -> Option<&SymmetricKey> {
        self.request_key.as_ref()
    }
}

impl std::fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("concealed", &self.response_key.is_some())
            .finish()
    }
}
