//! Encryption context provider backed by the enclave registry

use crate::context::EncryptionContext;
use crate::error::{CryptoError, CryptoResult};
use crate::keys::decode_public_key;
use async_trait::async_trait;
use rsa::RsaPublicKey;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Ledger view of the enclave registry
#[async_trait]
pub trait ChaincodeKeySource: Send + Sync {
    /// Base64 DER public encryption key of the enclave hosting `chaincode_name`
    async fn query_chaincode_encryption_key(&self, chaincode_name: &str) -> anyhow::Result<String>;
}

/// Creates encryption contexts for one chaincode.
///
/// The chaincode encryption key is fetched on first use and cached for the lifetime
/// of the provider; a rotated key requires a new provider. Concurrent first callers
/// share a single fetch. A failed fetch is not cached.
pub struct EncryptionProvider<S> {
    source: S,
    chaincode_name: String,
    chaincode_key: OnceCell<Arc<RsaPublicKey>>,
}

impl<S: ChaincodeKeySource> EncryptionProvider<S> {
    pub fn new(source: S, chaincode_name: impl Into<String>) -> Self {
        Self {
            source,
            chaincode_name: chaincode_name.into(),
            chaincode_key: OnceCell::new(),
        }
    }

    pub fn chaincode_name(&self) -> &str {
        &self.chaincode_name
    }

    /// Whether the chaincode key has been fetched
    pub fn is_key_cached(&self) -> bool {
        self.chaincode_key.initialized()
    }

    /// A fresh context sharing the cached chaincode key
    pub async fn new_encryption_context(&self) -> CryptoResult<EncryptionContext> {
        let key = self
            .chaincode_key
            .get_or_try_init(|| self.fetch_chaincode_key())
            .await?;
        Ok(EncryptionContext::new(Arc::clone(key)))
    }

    async fn fetch_chaincode_key(&self) -> CryptoResult<Arc<RsaPublicKey>> {
        debug!(chaincode = %self.chaincode_name, "fetching chaincode encryption key");

        let encoded = self
            .source
            .query_chaincode_encryption_key(&self.chaincode_name)
            .await
            .map_err(|e| CryptoError::KeyFetchFailed(format!("{:#}", e)))?;
        let key = decode_public_key(&encoded).map_err(CryptoError::KeyDecodeFailed)?;

        info!(chaincode = %self.chaincode_name, "cached chaincode encryption key");
        Ok(Arc::new(key))
    }
}
