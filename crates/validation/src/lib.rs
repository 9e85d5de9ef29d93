//! PCC Validation
//!
//! Ledger-side validation for confidential chaincode. The [`ValidatorChain`] plugin
//! runs the ledger's default endorsement validation and then a custom
//! [`TransactionValidator`]; the provided [`AttestedEndorsementValidator`] accepts a
//! transaction only if its response signature traces back to an enclave whose
//! attestation evidence verifies against the registered measurement.
//!
//! ```text
//! received ──▶ preconditions ──▶ default validator ──▶ custom validator ──▶ accepted
//!                   │                    │                    │
//!                   └── Structural       └── short-circuit    └── ExecutionFailure /
//!                                                                 EndorsementPolicy
//! ```

pub mod chain;
pub mod endorsement;
pub mod error;
pub mod model;
pub mod plugin;
pub mod state;

pub use chain::{convert_or_panic, ValidatorChain, ValidatorChainFactory};
pub use endorsement::{AttestedEndorsementValidator, DEFAULT_REGISTRY_NAMESPACE};
pub use error::{TxValidationError, ValidationError, ValidationResult};
pub use model::{Block, BlockData, BlockHeader, ContextDatum, Dependency};
pub use plugin::{
    TransactionValidator, TransactionValidatorFactory, ValidationPlugin, ValidationPluginFactory,
};
pub use state::{State, StateFetcher};
