//! Attestation report structures

use crate::error::{AttestationError, AttestationResult};
use crate::evidence::statement_digest;
use serde::{Deserialize, Serialize};

/// Size of the user-controlled report data field
pub const REPORT_DATA_SIZE: usize = 64;
/// Size of MRENCLAVE / MRSIGNER
pub const MEASUREMENT_SIZE: usize = 32;

/// Size of the SGX quote header
pub const QUOTE_HEADER_SIZE: usize = 48;
/// Size of an SGX enclave report body
pub const REPORT_BODY_SIZE: usize = 384;
/// Quote version emitted by the DCAP quoting enclave
pub const QUOTE_VERSION_3: u16 = 3;
/// Attestation key type for ECDSA-256 with P-256
pub const ATTESTATION_KEY_TYPE_ECDSA_P256: u16 = 2;

const SIGNED_REGION_SIZE: usize = QUOTE_HEADER_SIZE + REPORT_BODY_SIZE;
const ECDSA_SIGNATURE_SIZE: usize = 64;
const ECDSA_KEY_SIZE: usize = 64;

/// Report data binding a statement: SHA-256 in the first half, zero padded
pub fn statement_report_data(statement: &[u8]) -> [u8; REPORT_DATA_SIZE] {
    let mut report_data = [0u8; REPORT_DATA_SIZE];
    report_data[..32].copy_from_slice(&statement_digest(statement));
    report_data
}

/// Helper module for serializing/deserializing fixed-size arrays as hex
mod hex_array {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S, const N: usize>(data: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(data))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        struct HexVisitor<const N: usize>;

        impl<'de, const N: usize> Visitor<'de> for HexVisitor<N> {
            type Value = [u8; N];

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "a hex string of {} bytes", N)
            }

            fn visit_str<E>(self, v: &str) -> Result<[u8; N], E>
            where
                E: de::Error,
            {
                let bytes = hex::decode(v).map_err(de::Error::custom)?;
                if bytes.len() != N {
                    return Err(de::Error::custom(format!(
                        "expected {} bytes, got {}",
                        N,
                        bytes.len()
                    )));
                }
                let mut arr = [0u8; N];
                arr.copy_from_slice(&bytes);
                Ok(arr)
            }
        }

        deserializer.deserialize_str(HexVisitor::<N>)
    }
}

/// Software report produced by the simulation backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedReport {
    /// Report version
    pub version: u16,
    /// MRENCLAVE claimed by the simulated enclave
    #[serde(with = "hex_array")]
    pub mrenclave: [u8; MEASUREMENT_SIZE],
    /// MRSIGNER claimed by the simulated enclave
    #[serde(with = "hex_array")]
    pub mrsigner: [u8; MEASUREMENT_SIZE],
    /// ISV Product ID
    pub isv_prod_id: u16,
    /// ISV Security Version Number
    pub isv_svn: u16,
    /// Report data (user-provided data bound to report)
    #[serde(with = "hex_array")]
    pub report_data: [u8; REPORT_DATA_SIZE],
    /// Seconds since the unix epoch when the report was generated
    pub timestamp: u64,
}

impl SimulatedReport {
    /// Current simulated report format version
    pub const CURRENT_VERSION: u16 = 1;

    pub fn new(mrenclave: [u8; MEASUREMENT_SIZE], report_data: [u8; REPORT_DATA_SIZE]) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Self {
            version: Self::CURRENT_VERSION,
            mrenclave,
            mrsigner: [0u8; MEASUREMENT_SIZE],
            isv_prod_id: 1,
            isv_svn: 1,
            report_data,
            timestamp,
        }
    }

    pub fn to_bytes(&self) -> AttestationResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> AttestationResult<Self> {
        let report: Self = serde_json::from_slice(data).map_err(|e| {
            AttestationError::ReportInvalid(format!("cannot decode simulated report: {}", e))
        })?;
        if report.version != Self::CURRENT_VERSION {
            return Err(AttestationError::ReportInvalid(format!(
                "unsupported simulated report version: {}",
                report.version
            )));
        }
        Ok(report)
    }
}

/// SGX quote header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteHeader {
    pub version: u16,
    pub attestation_key_type: u16,
    pub qe_svn: u16,
    pub pce_svn: u16,
    pub qe_vendor_id: [u8; 16],
    pub user_data: [u8; 20],
}

/// SGX enclave report body (shared by the ISV enclave and the quoting enclave)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportBody {
    pub cpu_svn: [u8; 16],
    pub attributes: [u8; 16],
    pub mrenclave: [u8; MEASUREMENT_SIZE],
    pub mrsigner: [u8; MEASUREMENT_SIZE],
    pub isv_prod_id: u16,
    pub isv_svn: u16,
    pub report_data: [u8; REPORT_DATA_SIZE],
}

impl ReportBody {
    /// Parse a 384-byte report body
    pub fn parse(bytes: &[u8]) -> AttestationResult<Self> {
        if bytes.len() != REPORT_BODY_SIZE {
            return Err(AttestationError::ReportInvalid(format!(
                "report body must be {} bytes, got {}",
                REPORT_BODY_SIZE,
                bytes.len()
            )));
        }

        Ok(Self {
            cpu_svn: read_array(bytes, 0),
            attributes: read_array(bytes, 48),
            mrenclave: read_array(bytes, 64),
            mrsigner: read_array(bytes, 128),
            isv_prod_id: read_u16(bytes, 256),
            isv_svn: read_u16(bytes, 258),
            report_data: read_array(bytes, 320),
        })
    }

    /// Debug enclaves expose their memory to the host
    pub fn is_debug(&self) -> bool {
        self.attributes[0] & 0x02 != 0
    }
}

/// ECDSA signature section of a v3 quote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSignature {
    /// Signature over header and ISV report body (`r || s`)
    pub isv_report_signature: [u8; ECDSA_SIGNATURE_SIZE],
    /// Attestation public key (`x || y`)
    pub attestation_key: [u8; ECDSA_KEY_SIZE],
    /// Quoting enclave report
    pub qe_report: ReportBody,
    /// Signature over the raw QE report by the PCK key
    pub qe_report_signature: [u8; ECDSA_SIGNATURE_SIZE],
    /// QE authentication data
    pub qe_auth_data: Vec<u8>,
    /// Certification data type (5 = PCK certificate chain)
    pub certification_data_type: u16,
    /// Certification data
    pub certification_data: Vec<u8>,
    qe_report_raw: Vec<u8>,
}

/// SGX ECDSA quote (version 3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SgxQuote {
    pub header: QuoteHeader,
    pub report_body: ReportBody,
    pub signature: QuoteSignature,
    signed_region: Vec<u8>,
}

impl SgxQuote {
    /// Parse a raw quote as returned by the quoting enclave
    pub fn parse(bytes: &[u8]) -> AttestationResult<Self> {
        if bytes.len() < SIGNED_REGION_SIZE + 4 {
            return Err(AttestationError::ReportInvalid(format!(
                "quote too short: {} bytes",
                bytes.len()
            )));
        }

        let header = QuoteHeader {
            version: read_u16(bytes, 0),
            attestation_key_type: read_u16(bytes, 2),
            qe_svn: read_u16(bytes, 8),
            pce_svn: read_u16(bytes, 10),
            qe_vendor_id: read_array(bytes, 12),
            user_data: read_array(bytes, 28),
        };

        if header.version != QUOTE_VERSION_3 {
            return Err(AttestationError::ReportInvalid(format!(
                "unsupported quote version: {}",
                header.version
            )));
        }
        if header.attestation_key_type != ATTESTATION_KEY_TYPE_ECDSA_P256 {
            return Err(AttestationError::ReportInvalid(format!(
                "unsupported attestation key type: {}",
                header.attestation_key_type
            )));
        }

        let report_body = ReportBody::parse(&bytes[QUOTE_HEADER_SIZE..SIGNED_REGION_SIZE])?;

        let signature_len = read_u32(bytes, SIGNED_REGION_SIZE) as usize;
        let signature_data = &bytes[SIGNED_REGION_SIZE + 4..];
        if signature_data.len() < signature_len {
            return Err(AttestationError::ReportInvalid(format!(
                "signature data truncated: expected {} bytes, got {}",
                signature_len,
                signature_data.len()
            )));
        }
        let signature = QuoteSignature::parse(&signature_data[..signature_len])?;

        Ok(Self {
            header,
            report_body,
            signature,
            signed_region: bytes[..SIGNED_REGION_SIZE].to_vec(),
        })
    }

    /// Header and ISV report body, as covered by the ISV report signature
    pub fn signed_region(&self) -> &[u8] {
        &self.signed_region
    }
}

impl QuoteSignature {
    fn parse(bytes: &[u8]) -> AttestationResult<Self> {
        let mut offset = 0;

        let fixed = ECDSA_SIGNATURE_SIZE * 2 + ECDSA_KEY_SIZE + REPORT_BODY_SIZE + 2;
        if bytes.len() < fixed {
            return Err(AttestationError::ReportInvalid(
                "quote signature data too short".to_string(),
            ));
        }

        let isv_report_signature = read_array(bytes, offset);
        offset += ECDSA_SIGNATURE_SIZE;
        let attestation_key = read_array(bytes, offset);
        offset += ECDSA_KEY_SIZE;
        let qe_report_raw = bytes[offset..offset + REPORT_BODY_SIZE].to_vec();
        let qe_report = ReportBody::parse(&qe_report_raw)?;
        offset += REPORT_BODY_SIZE;
        let qe_report_signature = read_array(bytes, offset);
        offset += ECDSA_SIGNATURE_SIZE;

        let auth_len = read_u16(bytes, offset) as usize;
        offset += 2;
        if bytes.len() < offset + auth_len + 6 {
            return Err(AttestationError::ReportInvalid(
                "QE authentication data truncated".to_string(),
            ));
        }
        let qe_auth_data = bytes[offset..offset + auth_len].to_vec();
        offset += auth_len;

        let certification_data_type = read_u16(bytes, offset);
        offset += 2;
        let cert_len = read_u32(bytes, offset) as usize;
        offset += 4;
        if bytes.len() < offset + cert_len {
            return Err(AttestationError::ReportInvalid(
                "certification data truncated".to_string(),
            ));
        }
        let certification_data = bytes[offset..offset + cert_len].to_vec();

        Ok(Self {
            isv_report_signature,
            attestation_key,
            qe_report,
            qe_report_signature,
            qe_auth_data,
            certification_data_type,
            certification_data,
            qe_report_raw,
        })
    }

    /// QE report body as covered by the QE report signature
    pub fn signed_qe_report(&self) -> &[u8] {
        &self.qe_report_raw
    }
}

// Callers check bounds before reading.
fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes[offset..offset + N]);
    arr
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(read_array(bytes, offset))
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(read_array(bytes, offset))
}

/// Builds well-formed quotes signed by a throwaway attestation key and certified by a
/// test PCK hierarchy
#[cfg(test)]
pub(crate) mod test_quote {
    use super::*;
    use crate::pck::{ECDSA_WITH_SHA256, PCK_CERT_CHAIN};
    use p256::ecdsa::{signature::Signer, DerSignature, Signature, SigningKey, VerifyingKey};
    use p256::pkcs8::EncodePublicKey;
    use sha2::{Digest, Sha256};
    use std::str::FromStr;
    use std::sync::OnceLock;
    use std::time::Duration;
    use x509_cert::der::asn1::BitString;
    use x509_cert::der::pem::LineEnding;
    use x509_cert::der::{Decode, Encode, EncodePem};
    use x509_cert::name::Name;
    use x509_cert::serial_number::SerialNumber;
    use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
    use x509_cert::time::Validity;
    use x509_cert::{Certificate, TbsCertificate, Version};

    const ROOT_NAME: &str = "CN=Test SGX Root CA,O=Test";
    const PLATFORM_NAME: &str = "CN=Test SGX PCK Platform CA,O=Test";
    const PCK_NAME: &str = "CN=Test SGX PCK Certificate,O=Test";

    /// Root, platform CA and PCK leaf valid for one hour
    pub struct TestPki {
        pub root_der: Vec<u8>,
        /// Leaf first, root last
        pub chain_pem: String,
        pub pck_key: SigningKey,
    }

    fn certificate(
        serial: u8,
        subject: &str,
        subject_key: &VerifyingKey,
        issuer: &str,
        issuer_key: &SigningKey,
    ) -> Certificate {
        let algorithm = AlgorithmIdentifierOwned {
            oid: ECDSA_WITH_SHA256,
            parameters: None,
        };
        let spki = subject_key.to_public_key_der().unwrap();
        let tbs_certificate = TbsCertificate {
            version: Version::V3,
            serial_number: SerialNumber::new(&[serial]).unwrap(),
            signature: algorithm.clone(),
            issuer: Name::from_str(issuer).unwrap(),
            validity: Validity::from_now(Duration::from_secs(3600)).unwrap(),
            subject: Name::from_str(subject).unwrap(),
            subject_public_key_info: SubjectPublicKeyInfoOwned::from_der(spki.as_bytes()).unwrap(),
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: None,
        };

        let signature: DerSignature = issuer_key.sign(&tbs_certificate.to_der().unwrap());
        Certificate {
            tbs_certificate,
            signature_algorithm: algorithm,
            signature: BitString::from_bytes(signature.as_bytes()).unwrap(),
        }
    }

    impl TestPki {
        pub fn generate() -> Self {
            let root_key = SigningKey::random(&mut rand::rngs::OsRng);
            let platform_key = SigningKey::random(&mut rand::rngs::OsRng);
            let pck_key = SigningKey::random(&mut rand::rngs::OsRng);

            let root = certificate(1, ROOT_NAME, root_key.verifying_key(), ROOT_NAME, &root_key);
            let platform = certificate(
                2,
                PLATFORM_NAME,
                platform_key.verifying_key(),
                ROOT_NAME,
                &root_key,
            );
            let pck = certificate(3, PCK_NAME, pck_key.verifying_key(), PLATFORM_NAME, &platform_key);

            let chain_pem = [&pck, &platform, &root]
                .iter()
                .map(|cert| cert.to_pem(LineEnding::LF).unwrap())
                .collect::<String>();

            Self {
                root_der: root.to_der().unwrap(),
                chain_pem,
                pck_key,
            }
        }

        /// Hierarchy shared by every test quote
        pub fn shared() -> &'static TestPki {
            static PKI: OnceLock<TestPki> = OnceLock::new();
            PKI.get_or_init(TestPki::generate)
        }
    }

    pub struct QuoteParts {
        pub mrenclave: [u8; MEASUREMENT_SIZE],
        pub report_data: [u8; REPORT_DATA_SIZE],
        pub qe_auth_data: Vec<u8>,
        /// Write an all-zero QE report signature instead of signing with the PCK key
        pub zero_qe_signature: bool,
    }

    impl QuoteParts {
        pub fn new(mrenclave: [u8; MEASUREMENT_SIZE], report_data: [u8; REPORT_DATA_SIZE]) -> Self {
            Self {
                mrenclave,
                report_data,
                qe_auth_data: vec![0xAB; 32],
                zero_qe_signature: false,
            }
        }
    }

    fn report_body(mrenclave: &[u8; 32], report_data: &[u8; 64]) -> Vec<u8> {
        let mut body = vec![0u8; REPORT_BODY_SIZE];
        body[64..96].copy_from_slice(mrenclave);
        body[128..160].copy_from_slice(&[0x11; 32]);
        body[256..258].copy_from_slice(&1u16.to_le_bytes());
        body[258..260].copy_from_slice(&2u16.to_le_bytes());
        body[320..384].copy_from_slice(report_data);
        body
    }

    pub fn build(parts: &QuoteParts) -> Vec<u8> {
        build_with(parts, TestPki::shared())
    }

    pub fn build_with(parts: &QuoteParts, pki: &TestPki) -> Vec<u8> {
        let attestation_key = SigningKey::random(&mut rand::rngs::OsRng);
        let point = attestation_key.verifying_key().to_encoded_point(false);
        let raw_key = &point.as_bytes()[1..];

        let mut quote = Vec::new();
        quote.extend_from_slice(&QUOTE_VERSION_3.to_le_bytes());
        quote.extend_from_slice(&ATTESTATION_KEY_TYPE_ECDSA_P256.to_le_bytes());
        quote.extend_from_slice(&[0u8; 4]);
        quote.extend_from_slice(&7u16.to_le_bytes());
        quote.extend_from_slice(&9u16.to_le_bytes());
        quote.extend_from_slice(&[0x93; 16]);
        quote.extend_from_slice(&[0u8; 20]);
        quote.extend_from_slice(&report_body(&parts.mrenclave, &parts.report_data));

        let isv_signature: Signature = attestation_key.sign(&quote);

        let mut qe_report_data = [0u8; REPORT_DATA_SIZE];
        let mut hasher = Sha256::new();
        hasher.update(raw_key);
        hasher.update(&parts.qe_auth_data);
        qe_report_data[..32].copy_from_slice(&hasher.finalize());
        let qe_report = report_body(&[0x22; 32], &qe_report_data);
        let qe_signature = if parts.zero_qe_signature {
            [0u8; 64].to_vec()
        } else {
            let signature: Signature = pki.pck_key.sign(&qe_report);
            signature.to_bytes().to_vec()
        };

        let mut signature_data = Vec::new();
        signature_data.extend_from_slice(&isv_signature.to_bytes());
        signature_data.extend_from_slice(raw_key);
        signature_data.extend_from_slice(&qe_report);
        signature_data.extend_from_slice(&qe_signature);
        signature_data.extend_from_slice(&(parts.qe_auth_data.len() as u16).to_le_bytes());
        signature_data.extend_from_slice(&parts.qe_auth_data);
        signature_data.extend_from_slice(&PCK_CERT_CHAIN.to_le_bytes());
        // The quoting library NUL-terminates the chain
        let mut cert = pki.chain_pem.clone().into_bytes();
        cert.push(0);
        signature_data.extend_from_slice(&(cert.len() as u32).to_le_bytes());
        signature_data.extend_from_slice(&cert);

        quote.extend_from_slice(&(signature_data.len() as u32).to_le_bytes());
        quote.extend_from_slice(&signature_data);
        quote
    }
}
