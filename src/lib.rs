//! # pcc-rs
//!
//! Attestation and confidentiality layer for chaincode running inside SGX enclaves.
//!
//! The workspace is split along the trust boundary:
//!
//! - [`pcc_attestation`]: issuing and verifying portable enclave evidence
//! - [`pcc_crypto`]: request/response envelopes keyed by the enclave's attested keys
//! - [`pcc_validation`]: ledger-side validator chain accepting only attested responses
//!
//! This crate ties them together for applications: configuration, logging and a
//! [`ConfidentialClient`] driving a [`LedgerGateway`].
//!
//! ## Example
//!
//! ```no_run
//! use pcc_rs::{init_logging, ConfidentialClient, LedgerGateway, PccConfig};
//! use std::sync::Arc;
//!
//! # async fn run(gateway: Arc<dyn LedgerGateway>) -> pcc_rs::PccResult<()> {
//! let config = PccConfig::from_file("pcc.toml")?;
//! init_logging(&config.logging)?;
//!
//! let client = ConfidentialClient::new(gateway, &config)?;
//! let result = client
//!     .invoke("transfer", &["alice".into(), "bob".into(), "10".into()])
//!     .await?;
//! println!("{}", String::from_utf8_lossy(&result));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logging;

pub use client::{ConfidentialClient, LedgerGateway, RegistryKeySource, INVOKE_FUNCTION};
pub use config::{AttestationSettings, PccConfig};
pub use error::{PccError, PccResult};
pub use logging::{init_logging, LogConfig, LogFormat};

pub use pcc_attestation;
pub use pcc_crypto;
pub use pcc_validation;
