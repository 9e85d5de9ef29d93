//! PCK certificate chains carried in DCAP quotes
//!
//! The quoting enclave report is signed by the platform's PCK key. Its certificate
//! travels in the quote's certification data as a PEM chain ordered leaf first, ending
//! in the root CA. A chain is only trusted when its last certificate is one of the
//! configured root certificates.

use crate::error::{AttestationError, AttestationResult};
use p256::ecdsa::{signature::Verifier as _, DerSignature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use std::time::SystemTime;
use x509_cert::der::asn1::ObjectIdentifier;
use x509_cert::der::{DecodePem, Encode};
use x509_cert::Certificate;

/// Certification data type of a PEM encoded PCK certificate chain
pub const PCK_CERT_CHAIN: u16 = 5;

/// ecdsa-with-SHA256
pub const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");

const PEM_END: &str = "-----END CERTIFICATE-----";

fn invalid(msg: impl Into<String>) -> AttestationError {
    AttestationError::ReportInvalid(msg.into())
}

/// Split PEM certification data into certificates, leaf first
pub fn parse_chain(data: &[u8]) -> AttestationResult<Vec<Certificate>> {
    let text = std::str::from_utf8(data)
        .map_err(|_| invalid("certification data is not PEM text"))?
        .trim_end_matches('\0');

    let mut chain = Vec::new();
    let mut rest = text;
    while let Some(end) = rest.find(PEM_END) {
        let (block, tail) = rest.split_at(end + PEM_END.len());
        let cert = Certificate::from_pem(block.trim())
            .map_err(|e| invalid(format!("malformed PCK certificate: {}", e)))?;
        chain.push(cert);
        rest = tail;
    }

    if chain.is_empty() {
        return Err(invalid("no certificate in certification data"));
    }
    Ok(chain)
}

/// DER encoding of a PEM root certificate, as pinned by [`verify_chain`]
pub fn decode_root_pem(pem: &str) -> AttestationResult<Vec<u8>> {
    Certificate::from_pem(pem.trim())
        .and_then(|cert| cert.to_der())
        .map_err(|e| invalid(format!("malformed root certificate: {}", e)))
}

fn public_key(cert: &Certificate) -> AttestationResult<VerifyingKey> {
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| invalid(format!("cannot encode public key: {}", e)))?;
    VerifyingKey::from_public_key_der(&spki)
        .map_err(|e| invalid(format!("certificate key is not P-256: {}", e)))
}

fn check_signed_by(cert: &Certificate, issuer_key: &VerifyingKey) -> AttestationResult<()> {
    if cert.signature_algorithm.oid != ECDSA_WITH_SHA256 {
        return Err(invalid(format!(
            "unsupported certificate signature algorithm: {}",
            cert.signature_algorithm.oid
        )));
    }

    let tbs = cert
        .tbs_certificate
        .to_der()
        .map_err(|e| invalid(format!("cannot encode certificate: {}", e)))?;
    let signature = DerSignature::try_from(cert.signature.raw_bytes())
        .map_err(|e| invalid(format!("malformed certificate signature: {}", e)))?;
    issuer_key
        .verify(&tbs, &signature)
        .map_err(|_| invalid("certificate signature verification failed"))
}

fn check_validity(cert: &Certificate, now: SystemTime) -> AttestationResult<()> {
    let validity = &cert.tbs_certificate.validity;
    if now < validity.not_before.to_system_time() || now > validity.not_after.to_system_time() {
        return Err(invalid(format!(
            "certificate {} is not valid at this time",
            cert.tbs_certificate.subject
        )));
    }
    Ok(())
}

/// Validate `chain` up to one of `trusted_roots` (DER) and return the leaf key
pub fn verify_chain(
    chain: &[Certificate],
    trusted_roots: &[Vec<u8>],
    now: SystemTime,
) -> AttestationResult<VerifyingKey> {
    let (leaf, root) = match (chain.first(), chain.last()) {
        (Some(leaf), Some(root)) => (leaf, root),
        _ => return Err(invalid("empty PCK certificate chain")),
    };

    let root_der = root
        .to_der()
        .map_err(|e| invalid(format!("cannot encode root certificate: {}", e)))?;
    if !trusted_roots.iter().any(|trusted| *trusted == root_der) {
        return Err(invalid("PCK certificate chain does not end in a trusted root"));
    }

    for cert in chain {
        check_validity(cert, now)?;
    }
    for pair in chain.windows(2) {
        let (cert, issuer) = (&pair[0], &pair[1]);
        if cert.tbs_certificate.issuer != issuer.tbs_certificate.subject {
            return Err(invalid(format!(
                "certificate {} is not issued by {}",
                cert.tbs_certificate.subject, issuer.tbs_certificate.subject
            )));
        }
        check_signed_by(cert, &public_key(issuer)?)?;
    }
    check_signed_by(root, &public_key(root)?)?;

    public_key(leaf)
}
