//! Confidential chaincode client

use crate::config::PccConfig;
use crate::error::{PccError, PccResult};
use async_trait::async_trait;
use pcc_crypto::{ChaincodeKeySource, EncryptionProvider};
use std::sync::Arc;
use tracing::debug;

/// Function the enclave host exposes for confidential invocations
pub const INVOKE_FUNCTION: &str = "__invoke";

/// Registry query returning a chaincode's encryption key
pub const QUERY_ENCRYPTION_KEY: &str = "queryChaincodeEncryptionKey";

/// Connection to the ledger, provided by the application
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Evaluate `function` on `contract` and return its raw result
    async fn evaluate_transaction(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> anyhow::Result<Vec<u8>>;
}

/// Chaincode key source backed by the enclave registry contract
pub struct RegistryKeySource {
    gateway: Arc<dyn LedgerGateway>,
    registry_contract: String,
}

impl RegistryKeySource {
    pub fn new(gateway: Arc<dyn LedgerGateway>, registry_contract: impl Into<String>) -> Self {
        Self {
            gateway,
            registry_contract: registry_contract.into(),
        }
    }
}

#[async_trait]
impl ChaincodeKeySource for RegistryKeySource {
    async fn query_chaincode_encryption_key(&self, chaincode_name: &str) -> anyhow::Result<String> {
        let key = self
            .gateway
            .evaluate_transaction(
                &self.registry_contract,
                QUERY_ENCRYPTION_KEY,
                &[chaincode_name.to_string()],
            )
            .await?;
        Ok(String::from_utf8(key)?)
    }
}

/// Invokes one confidential chaincode: conceal, evaluate through the gateway, reveal
pub struct ConfidentialClient {
    gateway: Arc<dyn LedgerGateway>,
    provider: EncryptionProvider<RegistryKeySource>,
}

impl ConfidentialClient {
    pub fn new(gateway: Arc<dyn LedgerGateway>, config: &PccConfig) -> PccResult<Self> {
        config.validate()?;
        let source = RegistryKeySource::new(Arc::clone(&gateway), config.registry_contract.clone());
        Ok(Self {
            gateway,
            provider: EncryptionProvider::new(source, config.chaincode_name.clone()),
        })
    }

    pub fn chaincode_name(&self) -> &str {
        self.provider.chaincode_name()
    }

    pub fn provider(&self) -> &EncryptionProvider<RegistryKeySource> {
        &self.provider
    }

    /// Invoke `function` confidentially and return the decrypted result
    pub async fn invoke(&self, function: &str, args: &[String]) -> PccResult<Vec<u8>> {
        let mut context = self.provider.new_encryption_context().await?;
        let request = context.conceal(function, args)?;

        debug!(chaincode = %self.chaincode_name(), function = %function, "submitting confidential request");
        let response = self
            .gateway
            .evaluate_transaction(self.chaincode_name(), INVOKE_FUNCTION, &[request])
            .await
            .map_err(|e| PccError::Gateway(format!("{:#}", e)))?;

        Ok(context.reveal(&response)?)
    }
}
