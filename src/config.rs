//! Client configuration

use crate::error::{PccError, PccResult};
use crate::logging::LogConfig;
use pcc_attestation::{DcapVerifier, ValidationValues, VerifierRegistry};
use pcc_validation::{AttestedEndorsementValidator, TransactionValidatorFactory};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Default name of the enclave registry contract
pub const DEFAULT_REGISTRY_CONTRACT: &str = "ercc";

/// Configuration for talking to one confidential chaincode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PccConfig {
    /// Chaincode hosted in the enclave
    pub chaincode_name: String,

    /// Enclave registry contract holding chaincode keys and credentials
    #[serde(default = "default_registry_contract")]
    pub registry_contract: String,

    #[serde(default)]
    pub attestation: AttestationSettings,

    #[serde(default)]
    pub logging: LogConfig,
}

fn default_registry_contract() -> String {
    DEFAULT_REGISTRY_CONTRACT.to_string()
}

/// What attestation evidence is trusted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationSettings {
    /// Expected enclave measurement (MRENCLAVE), hex
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_measurement: Option<String>,

    /// Accept simulated reports; never enable in production
    pub allow_simulation: bool,

    /// PEM root certificate that PCK chains in DCAP quotes must end in.
    /// DCAP evidence is rejected when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pck_root_ca: Option<PathBuf>,
}

impl AttestationSettings {
    /// Verifiers for the accepted evidence types
    pub fn verifier_registry(&self) -> PccResult<VerifierRegistry> {
        let mut registry = VerifierRegistry::with_builtin(self.allow_simulation);
        if let Some(path) = &self.pck_root_ca {
            let pem = std::fs::read_to_string(path)?;
            let verifier = DcapVerifier::new().with_trusted_root_pem(&pem)?;
            info!(root = %path.display(), "loaded PCK root certificate");
            registry.register(Arc::new(verifier));
        }
        Ok(registry)
    }

    /// Validation values binding `statement` to the expected measurement
    pub fn validation_values(&self, statement: impl Into<Vec<u8>>) -> PccResult<ValidationValues> {
        let measurement = self
            .expected_measurement
            .clone()
            .ok_or_else(|| PccError::Config("no expected measurement configured".to_string()))?;
        Ok(ValidationValues::new(statement, measurement))
    }
}

impl PccConfig {
    pub fn new(chaincode_name: impl Into<String>) -> Self {
        Self {
            chaincode_name: chaincode_name.into(),
            registry_contract: default_registry_contract(),
            attestation: AttestationSettings::default(),
            logging: LogConfig::default(),
        }
    }

    /// Load and validate configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> PccResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> PccResult<Self> {
        let config: PccConfig =
            toml::from_str(content).map_err(|e| PccError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> PccResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PccError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> PccResult<()> {
        if self.chaincode_name.trim().is_empty() {
            return Err(PccError::Config("chaincode_name must not be empty".to_string()));
        }
        if self.registry_contract.trim().is_empty() {
            return Err(PccError::Config(
                "registry_contract must not be empty".to_string(),
            ));
        }

        if let Some(measurement) = &self.attestation.expected_measurement {
            let bytes = hex::decode(measurement.trim()).map_err(|e| {
                PccError::Config(format!("expected_measurement is not hex: {}", e))
            })?;
            if bytes.len() != 32 {
                return Err(PccError::Config(format!(
                    "expected_measurement must be 32 bytes, got {}",
                    bytes.len()
                )));
            }
        }

        self.logging.filter()?;
        Ok(())
    }

    /// Custom transaction validator for the ledger's validator chain, accepting
    /// responses of `chaincode_name` only
    pub fn endorsement_validator_factory(&self) -> PccResult<TransactionValidatorFactory> {
        Ok(AttestedEndorsementValidator::factory(
            self.attestation.verifier_registry()?,
            self.chaincode_name.clone(),
            self.registry_contract.clone(),
        ))
    }
}
