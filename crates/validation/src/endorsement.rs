//! Attested endorsement validator
//!
//! Accepts a transaction only when its response was produced for the validated
//! chaincode and signed by an enclave that the enclave registry recorded with evidence
//! verifying against the chaincode's expected measurement.
//!
//! Registry layout in the registry namespace:
//!
//! - `chaincode/<chaincode_id>/measurement`: expected MRENCLAVE, hex text
//! - `chaincode/<chaincode_id>/enclave/<enclave_id>`: JSON [`AttestedCredentials`]

use crate::error::TxValidationError;
use crate::plugin::{TransactionValidator, TransactionValidatorFactory};
use crate::state::{State, StateFetcher};
use p256::ecdsa::{signature::Verifier as _, Signature, VerifyingKey};
use pcc_attestation::{ValidationValues, VerifierRegistry};
use pcc_crypto::{
    enclave_id_for, AttestedCredentials, ChaincodeResponseMessage, SignedChaincodeResponseMessage,
    WireMessage,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default namespace of the enclave registry chaincode
pub const DEFAULT_REGISTRY_NAMESPACE: &str = "ercc";

pub fn measurement_key(chaincode_id: &str) -> String {
    format!("chaincode/{}/measurement", chaincode_id)
}

pub fn enclave_key(chaincode_id: &str, enclave_id: &str) -> String {
    format!("chaincode/{}/enclave/{}", chaincode_id, enclave_id)
}

/// Custom transaction validator tracing responses to attested enclaves
pub struct AttestedEndorsementValidator {
    state_fetcher: Arc<dyn StateFetcher>,
    verifiers: VerifierRegistry,
    chaincode_id: String,
    registry_namespace: String,
}

impl AttestedEndorsementValidator {
    /// Validator for responses of `chaincode_id`
    pub fn new(
        state_fetcher: Arc<dyn StateFetcher>,
        verifiers: VerifierRegistry,
        chaincode_id: impl Into<String>,
    ) -> Self {
        Self {
            state_fetcher,
            verifiers,
            chaincode_id: chaincode_id.into(),
            registry_namespace: DEFAULT_REGISTRY_NAMESPACE.to_string(),
        }
    }

    pub fn chaincode_id(&self) -> &str {
        &self.chaincode_id
    }

    pub fn with_registry_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.registry_namespace = namespace.into();
        self
    }

    /// Factory for [`ValidatorChain`](crate::ValidatorChain)
    pub fn factory(
        verifiers: VerifierRegistry,
        chaincode_id: impl Into<String>,
        registry_namespace: impl Into<String>,
    ) -> TransactionValidatorFactory {
        let chaincode_id = chaincode_id.into();
        let registry_namespace = registry_namespace.into();
        Arc::new(
            move |state_fetcher: Arc<dyn StateFetcher>| -> Box<dyn TransactionValidator> {
                Box::new(
                    AttestedEndorsementValidator::new(
                        state_fetcher,
                        verifiers.clone(),
                        chaincode_id.clone(),
                    )
                    .with_registry_namespace(registry_namespace.clone()),
                )
            },
        )
    }

    fn read(&self, state: &dyn State, key: &str) -> Result<Vec<u8>, TxValidationError> {
        state
            .get_state(&self.registry_namespace, key)
            .map_err(|e| TxValidationError::execution(format!("cannot read {}: {:#}", key, e)))?
            .ok_or_else(|| TxValidationError::policy(format!("{} not registered", key)))
    }

    fn check_response(
        &self,
        state: &dyn State,
        signed: &SignedChaincodeResponseMessage,
        response: &ChaincodeResponseMessage,
    ) -> Result<(), TxValidationError> {
        if response.chaincode_id.is_empty() || response.enclave_id.is_empty() {
            return Err(TxValidationError::policy(
                "response does not identify its chaincode and enclave",
            ));
        }
        if response.chaincode_id != self.chaincode_id {
            return Err(TxValidationError::policy(format!(
                "response produced for chaincode {}, expected {}",
                response.chaincode_id, self.chaincode_id
            )));
        }

        let measurement = self.read(state, &measurement_key(&response.chaincode_id))?;
        let measurement = String::from_utf8(measurement)
            .map_err(|_| TxValidationError::policy("registered measurement is not text"))?;

        let credentials = self.read(
            state,
            &enclave_key(&response.chaincode_id, &response.enclave_id),
        )?;
        let credentials = AttestedCredentials::from_bytes(&credentials)
            .map_err(|e| TxValidationError::policy(format!("invalid enclave credentials: {}", e)))?;

        if credentials.enclave_id != response.enclave_id
            || credentials.chaincode_id != response.chaincode_id
        {
            return Err(TxValidationError::policy(
                "credentials registered under a different identity",
            ));
        }
        if enclave_id_for(&credentials.verifying_key) != credentials.enclave_id {
            return Err(TxValidationError::policy(
                "enclave id does not match its verifying key",
            ));
        }

        let expected = ValidationValues::new(credentials.verifying_key.clone(), measurement);
        self.verifiers
            .verify(&credentials.evidence, &expected)
            .map_err(|e| TxValidationError::policy(format!("attestation rejected: {}", e)))?;

        let verifying_key = VerifyingKey::from_sec1_bytes(&credentials.verifying_key)
            .map_err(|e| TxValidationError::policy(format!("invalid verifying key: {}", e)))?;
        let signature = Signature::from_slice(&signed.signature)
            .map_err(|e| TxValidationError::policy(format!("malformed signature: {}", e)))?;
        verifying_key
            .verify(&signed.chaincode_response_message, &signature)
            .map_err(|_| TxValidationError::policy("response signature verification failed"))
    }
}

impl TransactionValidator for AttestedEndorsementValidator {
    fn validate(&self, tx_data: &[u8], policy: &[u8]) -> Result<(), TxValidationError> {
        if policy.is_empty() {
            return Err(TxValidationError::execution("empty endorsement policy"));
        }

        let signed = SignedChaincodeResponseMessage::from_bytes(tx_data)
            .map_err(|e| TxValidationError::execution(format!("malformed transaction: {}", e)))?;
        let response = ChaincodeResponseMessage::from_bytes(&signed.chaincode_response_message)
            .map_err(|e| TxValidationError::execution(format!("malformed response: {}", e)))?;

        let mut state = self
            .state_fetcher
            .fetch_state()
            .map_err(|e| TxValidationError::execution(format!("cannot fetch state: {:#}", e)))?;
        let result = self.check_response(state.as_ref(), &signed, &response);
        state.done();

        match &result {
            Ok(()) => debug!(
                chaincode = %response.chaincode_id,
                enclave = %response.enclave_id,
                "response endorsed by attested enclave"
            ),
            Err(err) => warn!(
                chaincode = %response.chaincode_id,
                enclave = %response.enclave_id,
                error = %err,
                "rejected enclave response"
            ),
        }
        result
    }
}
