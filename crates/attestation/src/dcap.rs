//! SGX DCAP backend
//!
//! Quotes are obtained through the `/dev/attestation` pseudo-filesystem exposed by
//! SGX library OSes: writing 64 bytes to `user_report_data` and reading `quote` back
//! yields an ECDSA quote over the running enclave's report.

use crate::error::{AttestationError, AttestationResult};
use crate::evidence::{Evidence, ValidationValues};
use crate::issuer::Issuer;
use crate::pck;
use crate::report::{statement_report_data, QuoteSignature, SgxQuote, REPORT_DATA_SIZE};
use crate::verifier::{check_binding, Verifier};
use p256::ecdsa::{signature::Verifier as _, Signature, VerifyingKey};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Evidence type tag for SGX DCAP quotes
pub const DCAP_EVIDENCE_TYPE: &str = "sgx-dcap";

/// Default mount point of the attestation pseudo-filesystem
pub const DEFAULT_ATTESTATION_DEVICE: &str = "/dev/attestation";

/// Issues DCAP quotes through the attestation pseudo-filesystem
#[derive(Debug, Clone)]
pub struct DcapIssuer {
    device_root: PathBuf,
}

impl DcapIssuer {
    pub fn new(device_root: impl Into<PathBuf>) -> Self {
        Self {
            device_root: device_root.into(),
        }
    }

    fn request_quote(&self, report_data: &[u8; REPORT_DATA_SIZE]) -> AttestationResult<Vec<u8>> {
        fs::write(self.device_root.join("user_report_data"), report_data).map_err(|e| {
            AttestationError::IssuanceFailed(format!("cannot write user report data: {}", e))
        })?;

        let quote = fs::read(self.device_root.join("quote"))
            .map_err(|e| AttestationError::IssuanceFailed(format!("cannot read quote: {}", e)))?;

        if quote.is_empty() {
            return Err(AttestationError::IssuanceFailed(
                "quoting enclave returned an empty quote".to_string(),
            ));
        }
        Ok(quote)
    }
}

impl Default for DcapIssuer {
    fn default() -> Self {
        Self::new(DEFAULT_ATTESTATION_DEVICE)
    }
}

impl Issuer for DcapIssuer {
    fn evidence_type(&self) -> &str {
        DCAP_EVIDENCE_TYPE
    }

    fn issue(&self, custom_data: &[u8]) -> AttestationResult<Evidence> {
        if !self.device_root.is_dir() {
            return Err(AttestationError::Unsupported(format!(
                "{} not available",
                self.device_root.display()
            )));
        }

        let report_data = statement_report_data(custom_data);
        let quote = self.request_quote(&report_data)?;
        debug!(quote_len = quote.len(), "obtained DCAP quote");

        Ok(Evidence::new(DCAP_EVIDENCE_TYPE, quote))
    }
}

/// Verifies DCAP quotes
///
/// The QE report must be signed by a PCK key whose certificate chain ends in one of
/// the configured root certificates, and must bind the attestation key that signed the
/// ISV report. Without a configured root every quote is rejected.
#[derive(Debug, Clone, Default)]
pub struct DcapVerifier {
    require_non_debug: bool,
    trusted_roots: Vec<Vec<u8>>,
}

impl DcapVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject quotes from enclaves launched in debug mode
    pub fn require_non_debug(mut self) -> Self {
        self.require_non_debug = true;
        self
    }

    /// Trust PCK chains ending in this DER encoded root certificate
    pub fn with_trusted_root(mut self, root_der: Vec<u8>) -> Self {
        self.trusted_roots.push(root_der);
        self
    }

    /// Trust PCK chains ending in this PEM encoded root certificate
    pub fn with_trusted_root_pem(self, pem: &str) -> AttestationResult<Self> {
        Ok(self.with_trusted_root(pck::decode_root_pem(pem)?))
    }

    pub fn has_trusted_root(&self) -> bool {
        !self.trusted_roots.is_empty()
    }

    fn pck_key(&self, signature: &QuoteSignature) -> AttestationResult<VerifyingKey> {
        if self.trusted_roots.is_empty() {
            return Err(AttestationError::ReportInvalid(
                "no trusted PCK root configured".to_string(),
            ));
        }
        if signature.certification_data_type != pck::PCK_CERT_CHAIN {
            return Err(AttestationError::ReportInvalid(format!(
                "unsupported certification data type: {}",
                signature.certification_data_type
            )));
        }

        let chain = pck::parse_chain(&signature.certification_data)?;
        pck::verify_chain(&chain, &self.trusted_roots, SystemTime::now())
    }

    fn verify_signatures(&self, quote: &SgxQuote) -> AttestationResult<()> {
        let signature = &quote.signature;

        let pck_key = self.pck_key(signature)?;
        let qe_signature = Signature::from_slice(&signature.qe_report_signature).map_err(|e| {
            AttestationError::ReportInvalid(format!("malformed QE report signature: {}", e))
        })?;
        pck_key
            .verify(signature.signed_qe_report(), &qe_signature)
            .map_err(|_| {
                AttestationError::ReportInvalid(
                    "QE report signature verification failed".to_string(),
                )
            })?;

        let mut hasher = Sha256::new();
        hasher.update(signature.attestation_key);
        hasher.update(&signature.qe_auth_data);
        let key_binding = hasher.finalize();
        if signature.qe_report.report_data[..32] != key_binding[..] {
            return Err(AttestationError::ReportInvalid(
                "attestation key is not bound to the quoting enclave report".to_string(),
            ));
        }

        let mut sec1_key = Vec::with_capacity(65);
        sec1_key.push(0x04);
        sec1_key.extend_from_slice(&signature.attestation_key);
        let attestation_key = VerifyingKey::from_sec1_bytes(&sec1_key).map_err(|e| {
            AttestationError::ReportInvalid(format!("invalid attestation key: {}", e))
        })?;

        let isv_signature = Signature::from_slice(&signature.isv_report_signature).map_err(|e| {
            AttestationError::ReportInvalid(format!("malformed report signature: {}", e))
        })?;
        attestation_key
            .verify(quote.signed_region(), &isv_signature)
            .map_err(|_| {
                AttestationError::ReportInvalid("report signature verification failed".to_string())
            })
    }
}

impl Verifier for DcapVerifier {
    fn evidence_type(&self) -> &str {
        DCAP_EVIDENCE_TYPE
    }

    fn verify(&self, evidence: &Evidence, expected: &ValidationValues) -> AttestationResult<()> {
        let quote = SgxQuote::parse(&evidence.data)?;
        self.verify_signatures(&quote)?;

        if self.require_non_debug && quote.report_body.is_debug() {
            warn!("rejecting quote from debug enclave");
            return Err(AttestationError::ReportInvalid(
                "debug enclaves are not accepted".to_string(),
            ));
        }

        check_binding(
            &quote.report_body.report_data,
            &quote.report_body.mrenclave,
            expected,
        )
    }
}

/// DCAP quotes are already in evidence form
pub fn identity_converter(attestation: &[u8]) -> AttestationResult<Vec<u8>> {
    Ok(attestation.to_vec())
}
