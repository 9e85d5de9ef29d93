//! PCC Attestation
//!
//! This crate produces and verifies portable evidence that a given enclave, running the
//! expected code, is bound to some statement (typically the enclave's public keys).
//!
//! # Backends
//!
//! - `sgx-dcap`: SGX ECDSA quotes obtained through the `/dev/attestation` interface,
//!   verified up to a configured PCK root certificate
//! - `simulation`: software reports for platforms without SGX support
//!
//! The simulation backend is never chosen directly; the [`IssuerRegistry`] only reaches it
//! when the hardware issuer reports [`AttestationError::Unsupported`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   Evidence {type, data}   ┌──────────────────────┐
//! │    IssuerRegistry    │ ────────────────────────▶ │   VerifierRegistry   │
//! │  ┌────────────────┐  │                           │  ┌────────────────┐  │
//! │  │ sgx-dcap       │  │                           │  │ sgx-dcap       │  │
//! │  ├────────────────┤  │                           │  ├────────────────┤  │
//! │  │ simulation     │  │                           │  │ simulation     │  │
//! │  └────────────────┘  │                           │  └────────────────┘  │
//! └──────────────────────┘                           └──────────┬───────────┘
//!                                                               │
//!                                              ValidationValues {statement, measurement}
//! ```

pub mod converter;
pub mod dcap;
pub mod error;
pub mod evidence;
pub mod issuer;
pub mod pck;
pub mod report;
pub mod simulation;
pub mod verifier;

pub use converter::{Converter, ConverterRegistry};
pub use dcap::{DcapIssuer, DcapVerifier, DCAP_EVIDENCE_TYPE};
pub use error::{AttestationError, AttestationResult};
pub use evidence::{Evidence, Statement, ValidationValues};
pub use issuer::{Issuer, IssuerRegistry};
pub use simulation::{SimulationIssuer, SimulationVerifier, SIMULATION_EVIDENCE_TYPE};
pub use verifier::{Verifier, VerifierRegistry};
