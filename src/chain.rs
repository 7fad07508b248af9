//! The limit and deduplicate steps wrapped around every submitted operation.

use std::{collections::BTreeMap, sync::Arc};

use gaffer_chain::OperationChain;
use serde_json::{json, Value};

use crate::{error::BuildError, operation::Operation, stores::Settings};

pub const LIMIT_CLASS: &str = "uk.gov.gchq.gaffer.operation.impl.Limit";
pub const TO_SET_CLASS: &str = "uk.gov.gchq.gaffer.operation.impl.output.ToSet";

/// Produces the steps appended after the user's operation in every chain
pub trait OperationFactory: Send + Sync {
    /// Caps the number of results
    fn limit_operation(&self, options: Option<&BTreeMap<String, String>>) -> Value;

    /// Removes duplicate results
    fn deduplicate_operation(&self, options: Option<&BTreeMap<String, String>>) -> Value;
}

/// [`OperationFactory`] that reads the result limit from the settings store
/// each time a chain is built
#[derive(Clone)]
pub struct SettingsOperationFactory {
    settings: Arc<dyn Settings>,
}

impl SettingsOperationFactory {
    pub fn new(settings: Arc<dyn Settings>) -> Self {
        SettingsOperationFactory { settings }
    }
}

fn with_options(mut operation: Value, options: Option<&BTreeMap<String, String>>) -> Value {
    if let (Some(options), Some(fields)) = (options, operation.as_object_mut()) {
        fields.insert("options".to_string(), json!(options));
    }
    operation
}

impl OperationFactory for SettingsOperationFactory {
    fn limit_operation(&self, options: Option<&BTreeMap<String, String>>) -> Value {
        with_options(
            json!({
                "class": LIMIT_CLASS,
                "resultLimit": self.settings.result_limit(),
                "truncate": true,
            }),
            options,
        )
    }

    fn deduplicate_operation(&self, options: Option<&BTreeMap<String, String>>) -> Value {
        with_options(json!({ "class": TO_SET_CLASS }), options)
    }
}

/// Wraps `operation` with the limit and deduplicate steps; the chain carries
/// the operation's options
pub fn assemble_chain(
    operation: &Operation,
    factory: &dyn OperationFactory,
) -> Result<OperationChain, BuildError> {
    let options = operation.options.as_ref();
    let operations = vec![
        serde_json::to_value(operation)?,
        factory.limit_operation(options),
        factory.deduplicate_operation(options),
    ];
    Ok(OperationChain::new(operations, operation.options.clone()))
}
