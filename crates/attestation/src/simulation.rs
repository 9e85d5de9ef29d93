//! Simulation backend for platforms without SGX
//!
//! Simulated reports carry the same statement binding as hardware quotes but no
//! signature; they prove nothing about the platform and are only accepted by
//! registries that explicitly opt in.

use crate::error::AttestationResult;
use crate::evidence::{Evidence, ValidationValues};
use crate::issuer::Issuer;
use crate::report::{statement_report_data, SimulatedReport, MEASUREMENT_SIZE};
use crate::verifier::{check_binding, Verifier};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Evidence type tag for simulated reports
pub const SIMULATION_EVIDENCE_TYPE: &str = "simulation";

/// Measurement reported by the default simulated enclave
pub fn simulated_measurement() -> [u8; MEASUREMENT_SIZE] {
    Sha256::digest(b"pcc-simulation-enclave-v1").into()
}

/// Issues unsigned simulated reports
#[derive(Debug, Clone)]
pub struct SimulationIssuer {
    measurement: [u8; MEASUREMENT_SIZE],
}

impl SimulationIssuer {
    pub fn new(measurement: [u8; MEASUREMENT_SIZE]) -> Self {
        Self { measurement }
    }

    pub fn measurement(&self) -> &[u8; MEASUREMENT_SIZE] {
        &self.measurement
    }
}

impl Default for SimulationIssuer {
    fn default() -> Self {
        Self::new(simulated_measurement())
    }
}

impl Issuer for SimulationIssuer {
    fn evidence_type(&self) -> &str {
        SIMULATION_EVIDENCE_TYPE
    }

    fn issue(&self, custom_data: &[u8]) -> AttestationResult<Evidence> {
        let report = SimulatedReport::new(self.measurement, statement_report_data(custom_data));
        debug!(
            mrenclave = %hex::encode(self.measurement),
            "issued simulated attestation report"
        );
        Ok(Evidence::new(SIMULATION_EVIDENCE_TYPE, report.to_bytes()?))
    }
}

/// Verifies simulated reports
#[derive(Debug, Clone, Default)]
pub struct SimulationVerifier;

impl SimulationVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl Verifier for SimulationVerifier {
    fn evidence_type(&self) -> &str {
        SIMULATION_EVIDENCE_TYPE
    }

    fn verify(&self, evidence: &Evidence, expected: &ValidationValues) -> AttestationResult<()> {
        let report = SimulatedReport::from_bytes(&evidence.data)?;
        check_binding(&report.report_data, &report.mrenclave, expected)
    }
}
