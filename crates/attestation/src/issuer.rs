//! Evidence issuers and the fallback-aware issuer registry

use crate::dcap::{DcapIssuer, DCAP_EVIDENCE_TYPE};
use crate::error::{AttestationError, AttestationResult};
use crate::evidence::Evidence;
use crate::simulation::{SimulationIssuer, SIMULATION_EVIDENCE_TYPE};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Produces attestation evidence binding custom data to the running enclave
pub trait Issuer: Send + Sync {
    /// Type tag stamped on the evidence this issuer produces
    fn evidence_type(&self) -> &str;

    /// Produce evidence whose report binds `custom_data`.
    ///
    /// Hardware issuers may block on driver I/O. A platform that lacks the hardware
    /// must report [`AttestationError::Unsupported`].
    fn issue(&self, custom_data: &[u8]) -> AttestationResult<Evidence>;
}

/// Issuers keyed by evidence type, with a primary and an optional fallback
pub struct IssuerRegistry {
    issuers: HashMap<String, Arc<dyn Issuer>>,
    primary: String,
    fallback: Option<String>,
}

impl IssuerRegistry {
    /// Create an empty registry that issues with `primary`
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            issuers: HashMap::new(),
            primary: primary.into(),
            fallback: None,
        }
    }

    /// Issuer used when the primary reports the platform as unsupported
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Register an issuer under its evidence type, replacing any previous one
    pub fn register(&mut self, issuer: Arc<dyn Issuer>) {
        self.issuers
            .insert(issuer.evidence_type().to_string(), issuer);
    }

    pub fn get(&self, evidence_type: &str) -> Option<Arc<dyn Issuer>> {
        self.issuers.get(evidence_type).cloned()
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn fallback(&self) -> Option<&str> {
        self.fallback.as_deref()
    }

    /// Issue evidence with a specific backend, bypassing fallback
    pub fn issue_with(&self, evidence_type: &str, custom_data: &[u8]) -> AttestationResult<Evidence> {
        let issuer = self
            .get(evidence_type)
            .ok_or_else(|| AttestationError::IssuerNotFound(evidence_type.to_string()))?;
        issuer.issue(custom_data)
    }

    /// Issue evidence with the primary backend.
    ///
    /// Only [`AttestationError::Unsupported`] from the primary triggers the fallback
    /// issuer; the original error is then logged and dropped. Any other failure is
    /// returned as [`AttestationError::IssuanceFailed`].
    pub fn issue(&self, custom_data: &[u8]) -> AttestationResult<Evidence> {
        debug!(evidence_type = %self.primary, "issuing attestation evidence");

        match self.issue_with(&self.primary, custom_data) {
            Ok(evidence) => Ok(evidence),
            Err(AttestationError::Unsupported(reason)) => {
                let Some(fallback) = self.fallback.as_deref() else {
                    return Err(AttestationError::Unsupported(reason));
                };
                warn!(
                    primary = %self.primary,
                    fallback = %fallback,
                    reason = %reason,
                    "hardware attestation unsupported, using fallback issuer"
                );
                self.issue_with(fallback, custom_data)
            }
            Err(err @ AttestationError::IssuerNotFound(_)) => Err(err),
            Err(err @ AttestationError::IssuanceFailed(_)) => Err(err),
            Err(err) => Err(AttestationError::IssuanceFailed(err.to_string())),
        }
    }
}

impl Default for IssuerRegistry {
    /// DCAP as primary, simulation as fallback
    fn default() -> Self {
        let mut registry = IssuerRegistry::new(DCAP_EVIDENCE_TYPE).with_fallback(SIMULATION_EVIDENCE_TYPE);
        registry.register(Arc::new(DcapIssuer::default()));
        registry.register(Arc::new(SimulationIssuer::default()));
        registry
    }
}
