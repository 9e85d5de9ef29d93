//! Validator chain: default endorsement validation followed by a custom validator

use crate::error::{TxValidationError, ValidationError, ValidationResult};
use crate::model::{Block, ContextDatum, Dependency};
use crate::plugin::{
    TransactionValidator, TransactionValidatorFactory, ValidationPlugin, ValidationPluginFactory,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Runs the default validator and, only if it accepts, the custom transaction validator.
///
/// The chain keeps no per-transaction state; `validate` may be called concurrently.
pub struct ValidatorChain {
    default_factory: Option<Arc<dyn ValidationPluginFactory>>,
    custom_factory: Option<TransactionValidatorFactory>,
    default_validator: Option<Box<dyn ValidationPlugin>>,
    custom_validator: Option<Box<dyn TransactionValidator>>,
}

impl ValidatorChain {
    /// Uninitialized chain; validators are created in [`ValidationPlugin::init`]
    pub fn new(
        default_factory: Arc<dyn ValidationPluginFactory>,
        custom_factory: TransactionValidatorFactory,
    ) -> Self {
        Self {
            default_factory: Some(default_factory),
            custom_factory: Some(custom_factory),
            default_validator: None,
            custom_validator: None,
        }
    }

    /// Chain over already constructed validators
    pub fn from_validators(
        default_validator: Box<dyn ValidationPlugin>,
        custom_validator: Box<dyn TransactionValidator>,
    ) -> Self {
        Self {
            default_factory: None,
            custom_factory: None,
            default_validator: Some(default_validator),
            custom_validator: Some(custom_validator),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.default_validator.is_some() && self.custom_validator.is_some()
    }
}

impl ValidationPlugin for ValidatorChain {
    fn init(&mut self, dependencies: &[Dependency]) -> ValidationResult<()> {
        let state_fetcher = dependencies
            .iter()
            .find_map(Dependency::as_state_fetcher)
            .ok_or_else(|| {
                ValidationError::Configuration("state fetcher dependency not provided".to_string())
            })?;

        if let Some(factory) = &self.custom_factory {
            self.custom_validator = Some(factory(state_fetcher));
        }
        if let Some(factory) = &self.default_factory {
            self.default_validator = Some(factory.new_plugin());
        }

        let default_validator = self.default_validator.as_mut().ok_or_else(|| {
            ValidationError::Configuration("no default validator available".to_string())
        })?;
        default_validator.init(dependencies).map_err(|e| {
            ValidationError::Configuration(format!("error while creating default validator: {}", e))
        })?;

        if self.custom_validator.is_none() {
            return Err(ValidationError::Configuration(
                "no custom validator available".to_string(),
            ));
        }
        Ok(())
    }

    fn validate(
        &self,
        block: &Block,
        namespace: &str,
        tx_position: usize,
        action_position: usize,
        context: &[ContextDatum],
    ) -> ValidationResult<()> {
        let policy = match context.first() {
            Some(ContextDatum::SerializedPolicy(policy)) => policy,
            Some(_) => {
                return Err(ValidationError::Structural(
                    "first context datum is not a serialized policy".to_string(),
                ))
            }
            None => {
                return Err(ValidationError::Structural(
                    "expected policy bytes in context data".to_string(),
                ))
            }
        };

        let data = block
            .data
            .as_ref()
            .ok_or_else(|| ValidationError::Structural("empty block".to_string()))?;
        let tx_data = data.data.get(tx_position).ok_or_else(|| {
            ValidationError::Structural(format!(
                "block has only {} transactions, but requested tx at position {}",
                data.data.len(),
                tx_position
            ))
        })?;
        let header = block
            .header
            .as_ref()
            .ok_or_else(|| ValidationError::Structural("no block header".to_string()))?;

        let (Some(default_validator), Some(custom_validator)) =
            (&self.default_validator, &self.custom_validator)
        else {
            return Err(ValidationError::Configuration(
                "validator chain not initialized".to_string(),
            ));
        };

        if let Err(err) =
            default_validator.validate(block, namespace, tx_position, action_position, context)
        {
            debug!(
                block = header.number,
                namespace = %namespace,
                tx = tx_position,
                error = %err,
                "default validation rejected transaction"
            );
            return convert_or_panic(Err(err.into()));
        }

        let result = custom_validator.validate(tx_data, policy);
        debug!(
            block = header.number,
            namespace = %namespace,
            tx = tx_position,
            result = ?result,
            "custom validation finished"
        );
        convert_or_panic(result)
    }
}

/// Map a validator outcome onto the plugin error space.
///
/// # Panics
///
/// On [`TxValidationError::Unclassified`]; validators must classify their failures.
pub fn convert_or_panic(result: Result<(), TxValidationError>) -> ValidationResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(TxValidationError::ExecutionFailure(reason)) => {
            Err(ValidationError::ExecutionFailure(reason))
        }
        Err(TxValidationError::EndorsementPolicy(reason)) => {
            Err(ValidationError::EndorsementPolicy(reason))
        }
        Err(TxValidationError::Unclassified(reason)) => {
            error!(
                reason = %reason,
                "programming error: validator returned an unclassified error"
            );
            panic!(
                "programming error: expected execution or endorsement policy failure, got: {}",
                reason
            );
        }
    }
}

/// Produces [`ValidatorChain`] plugins for the ledger
#[derive(Clone)]
pub struct ValidatorChainFactory {
    default_factory: Arc<dyn ValidationPluginFactory>,
    custom_factory: TransactionValidatorFactory,
}

impl ValidatorChainFactory {
    pub fn new(
        default_factory: Arc<dyn ValidationPluginFactory>,
        custom_factory: TransactionValidatorFactory,
    ) -> Self {
        Self {
            default_factory,
            custom_factory,
        }
    }
}

impl ValidationPluginFactory for ValidatorChainFactory {
    fn new_plugin(&self) -> Box<dyn ValidationPlugin> {
        Box::new(ValidatorChain::new(
            Arc::clone(&self.default_factory),
            Arc::clone(&self.custom_factory),
        ))
    }
}
