//! Validation plugin interfaces exposed to the ledger

use crate::error::{TxValidationError, ValidationResult};
use crate::model::{Block, ContextDatum, Dependency};
use crate::state::StateFetcher;
use std::sync::Arc;

/// A per-namespace validation plugin driven by the ledger's commit pipeline
#[cfg_attr(test, mockall::automock)]
pub trait ValidationPlugin: Send + Sync {
    /// Wire the plugin to ledger services; called once before any validation
    fn init(&mut self, dependencies: &[Dependency]) -> ValidationResult<()>;

    /// Validate the action at `action_position` of transaction `tx_position`
    fn validate(
        &self,
        block: &Block,
        namespace: &str,
        tx_position: usize,
        action_position: usize,
        context: &[ContextDatum],
    ) -> ValidationResult<()>;
}

/// Creates uninitialized plugin instances
#[cfg_attr(test, mockall::automock)]
pub trait ValidationPluginFactory: Send + Sync {
    fn new_plugin(&self) -> Box<dyn ValidationPlugin>;
}

/// Validates a single serialized transaction against opaque policy bytes
#[cfg_attr(test, mockall::automock)]
pub trait TransactionValidator: Send + Sync {
    fn validate(&self, tx_data: &[u8], policy: &[u8]) -> Result<(), TxValidationError>;
}

/// Builds the custom transaction validator once a state fetcher is available
pub type TransactionValidatorFactory =
    Arc<dyn Fn(Arc<dyn StateFetcher>) -> Box<dyn TransactionValidator> + Send + Sync>;
