//! Normalization of backend-native attestation blobs into evidence

use crate::dcap::{identity_converter, DCAP_EVIDENCE_TYPE};
use crate::error::{AttestationError, AttestationResult};
use crate::evidence::Evidence;
use std::collections::HashMap;

/// Maps a backend-native attestation blob to evidence data
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    pub evidence_type: &'static str,
    pub convert: fn(&[u8]) -> AttestationResult<Vec<u8>>,
}

impl Converter {
    pub const fn new(
        evidence_type: &'static str,
        convert: fn(&[u8]) -> AttestationResult<Vec<u8>>,
    ) -> Self {
        Self {
            evidence_type,
            convert,
        }
    }
}

/// Converters keyed by attestation type
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<&'static str, Converter>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the DCAP pass-through converter
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Converter::new(DCAP_EVIDENCE_TYPE, identity_converter));
        registry
    }

    pub fn register(&mut self, converter: Converter) {
        self.converters.insert(converter.evidence_type, converter);
    }

    /// Convert a native blob of the given type into serialized evidence
    pub fn convert(&self, attestation_type: &str, attestation: &[u8]) -> AttestationResult<Vec<u8>> {
        let converter = self
            .converters
            .get(attestation_type)
            .ok_or_else(|| AttestationError::ConverterNotFound(attestation_type.to_string()))?;

        let data = (converter.convert)(attestation)?;
        Evidence::new(converter.evidence_type, data).to_bytes()
    }

    /// Convert a `{type, data}` attestation envelope into serialized evidence
    pub fn convert_envelope(&self, envelope: &[u8]) -> AttestationResult<Vec<u8>> {
        let attestation = Evidence::from_bytes(envelope)?;
        self.convert(&attestation.evidence_type, &attestation.data)
    }
}
