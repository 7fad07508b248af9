//! Compiles user-defined filters into predicate filter functions.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{coercion::ValueCoercion, descriptor::FilterDescriptor};

/// A predicate applied to the selected properties of an element
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterFunction {
    pub predicate: Predicate,
    pub selection: Vec<String>,
}

/// Predicate class plus its arguments, flattened into one JSON object
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Predicate {
    pub class: String,
    #[serde(flatten)]
    pub arguments: BTreeMap<String, Value>,
}

impl Predicate {
    pub fn new(class: impl Into<String>) -> Predicate {
        Predicate {
            class: class.into(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Predicate {
        self.arguments.insert(name.into(), value);
        self
    }
}

/// Compiles a user-defined filter into a filter function.
///
/// Only arguments the predicate declares are considered, and of those only the
/// ones the user supplied. Declared classes the coercion knows become plain
/// literals; anything else is sent as class-tagged JSON.
pub fn compile_filter(filter: &FilterDescriptor, coercion: &dyn ValueCoercion) -> FilterFunction {
    let arguments = filter
        .available_function_parameters
        .iter()
        .filter_map(|(name, declared_class)| {
            let supplied = filter.parameters.get(name)?;
            let value = if coercion.is_known_type(declared_class) {
                coercion.to_literal(&supplied.value_class, &supplied.parts)
            } else {
                coercion.to_tagged_json(&supplied.value_class, &supplied.parts)
            };
            Some((name.clone(), value))
        })
        .collect();

    FilterFunction {
        predicate: Predicate {
            class: filter.predicate.clone(),
            arguments,
        },
        selection: vec![filter.property.clone()],
    }
}
