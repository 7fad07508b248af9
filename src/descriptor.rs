//! What the query page knows about the operation, filters and named views the
//! user picked. These mirror the JSON the UI keeps in its stores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coercion::ValueParts;

/// An operation the user can run, with flags describing which inputs it takes
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    pub class: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub named_op: bool,
    #[serde(default)]
    pub input: bool,
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub in_out_flag: bool,
    /// `Some` (even when empty) when the operation accepts parameters
    #[serde(default)]
    pub parameters: Option<BTreeMap<String, ParameterDescriptor>>,
}

/// A named parameter of an operation or named view
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    pub value_class: String,
    #[serde(default)]
    pub parts: ValueParts,
    #[serde(default)]
    pub required: bool,
}

/// A value the user supplied for one argument of a filter predicate
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedValue {
    pub value_class: String,
    #[serde(default)]
    pub parts: ValueParts,
}

/// A user-defined filter on one property of an element group
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    /// Predicate class, e.g. `uk.gov.gchq.koryphe.impl.predicate.IsMoreThan`
    pub predicate: String,
    pub property: String,
    #[serde(default)]
    pub pre_aggregation: bool,
    /// Arguments the user filled in, by name
    #[serde(default)]
    pub parameters: BTreeMap<String, TypedValue>,
    /// Arguments the predicate accepts, by name, with their declared class
    #[serde(default)]
    pub available_function_parameters: BTreeMap<String, String>,
}

/// A server-side view picked by name, with the parameters the user filled in
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedViewSelection {
    pub name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterDescriptor>,
}

/// Which edges of a seed to follow
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeDirection {
    #[default]
    Either,
    Incoming,
    Outgoing,
}
