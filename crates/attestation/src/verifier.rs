//! Evidence verifiers and the type-dispatching verifier registry

use crate::dcap::DcapVerifier;
use crate::error::{AttestationError, AttestationResult};
use crate::evidence::{statement_digest, Evidence, ValidationValues};
use crate::simulation::SimulationVerifier;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Checks evidence of one backend against expected validation values
pub trait Verifier: Send + Sync {
    /// Evidence type this verifier understands
    fn evidence_type(&self) -> &str;

    /// Verify that `evidence` binds `expected.statement` and was produced by the code
    /// identified by `expected.measurement`
    fn verify(&self, evidence: &Evidence, expected: &ValidationValues) -> AttestationResult<()>;
}

/// Verifiers keyed by evidence type
#[derive(Default, Clone)]
pub struct VerifierRegistry {
    verifiers: HashMap<String, Arc<dyn Verifier>>,
}

impl VerifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in verifiers and, if `allow_simulation`, simulated reports.
    ///
    /// The DCAP verifier has no trusted PCK root and rejects every quote until one
    /// configured with [`DcapVerifier::with_trusted_root`] is registered in its place.
    pub fn with_builtin(allow_simulation: bool) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DcapVerifier::new()));
        if allow_simulation {
            registry.register(Arc::new(SimulationVerifier::new()));
        }
        registry
    }

    /// Register a verifier under its evidence type, replacing any previous one
    pub fn register(&mut self, verifier: Arc<dyn Verifier>) {
        self.verifiers
            .insert(verifier.evidence_type().to_string(), verifier);
    }

    pub fn contains(&self, evidence_type: &str) -> bool {
        self.verifiers.contains_key(evidence_type)
    }

    /// Verify evidence with the verifier registered for its type
    pub fn verify(&self, evidence: &Evidence, expected: &ValidationValues) -> AttestationResult<()> {
        let verifier = self
            .verifiers
            .get(&evidence.evidence_type)
            .ok_or_else(|| AttestationError::VerifierNotFound(evidence.evidence_type.clone()))?;

        debug!(evidence_type = %evidence.evidence_type, "verifying attestation evidence");
        verifier.verify(evidence, expected)
    }
}

impl std::fmt::Debug for VerifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.verifiers.keys().collect();
        types.sort();
        f.debug_struct("VerifierRegistry")
            .field("evidence_types", &types)
            .finish()
    }
}

/// Check that a verified report binds the expected statement and measurement.
///
/// The statement is checked first so a replayed report for another statement is
/// reported as such even when it also comes from a different enclave.
pub(crate) fn check_binding(
    report_data: &[u8],
    mrenclave: &[u8],
    expected: &ValidationValues,
) -> AttestationResult<()> {
    let digest = statement_digest(&expected.statement);
    if report_data.len() < digest.len() || report_data[..digest.len()] != digest {
        return Err(AttestationError::StatementMismatch);
    }

    let expected_measurement = expected.measurement_bytes()?;
    if expected_measurement != mrenclave {
        return Err(AttestationError::measurement_mismatch(
            &expected_measurement,
            mrenclave,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::statement_report_data;

    struct AcceptAll;

    impl Verifier for AcceptAll {
        fn evidence_type(&self) -> &str {
            "custom"
        }

        fn verify(&self, _evidence: &Evidence, _expected: &ValidationValues) -> AttestationResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unknown_type() {
        let registry = VerifierRegistry::with_builtin(false);
        let evidence = Evidence::new("simulation", vec![]);
        let expected = ValidationValues::new(b"key".to_vec(), "00");

        assert!(matches!(
            registry.verify(&evidence, &expected),
            Err(AttestationError::VerifierNotFound(tag)) if tag == "simulation"
        ));
    }

    #[test]
    fn test_builtin_dcap_rejects_without_root() {
        use crate::report::test_quote::{build, QuoteParts, TestPki};

        let mrenclave = [0x5A; 32];
        let evidence = Evidence::new(
            "sgx-dcap",
            build(&QuoteParts::new(mrenclave, statement_report_data(b"key"))),
        );
        let expected = ValidationValues::new(b"key".to_vec(), hex::encode(mrenclave));

        let mut registry = VerifierRegistry::with_builtin(true);
        assert!(matches!(
            registry.verify(&evidence, &expected),
            Err(AttestationError::ReportInvalid(_))
        ));

        registry.register(Arc::new(
            DcapVerifier::new().with_trusted_root(TestPki::shared().root_der.clone()),
        ));
        registry.verify(&evidence, &expected).unwrap();
    }

    #[test]
    fn test_custom_verifier_dispatch() {
        let mut registry = VerifierRegistry::new();
        registry.register(Arc::new(AcceptAll));

        let evidence = Evidence::new("custom", vec![1]);
        let expected = ValidationValues::new(b"key".to_vec(), "00");
        assert!(registry.verify(&evidence, &expected).is_ok());
        assert!(registry.contains("custom"));
        assert!(!registry.contains("sgx-dcap"));
    }

    #[test]
    fn test_check_binding() {
        let report_data = statement_report_data(b"key");
        let mrenclave = [0x42u8; 32];
        let good = ValidationValues::new(b"key".to_vec(), hex::encode(mrenclave));

        assert!(check_binding(&report_data, &mrenclave, &good).is_ok());

        let wrong_statement = ValidationValues::new(b"other".to_vec(), hex::encode(mrenclave));
        assert!(matches!(
            check_binding(&report_data, &mrenclave, &wrong_statement),
            Err(AttestationError::StatementMismatch)
        ));

        let wrong_measurement = ValidationValues::new(b"key".to_vec(), hex::encode([0x43u8; 32]));
        assert!(matches!(
            check_binding(&report_data, &mrenclave, &wrong_measurement),
            Err(AttestationError::MeasurementMismatch { .. })
        ));

        let bad_hex = ValidationValues::new(b"key".to_vec(), "zz");
        assert!(matches!(
            check_binding(&report_data, &mrenclave, &bad_hex),
            Err(AttestationError::InvalidValidationValues(_))
        ));
    }
}
