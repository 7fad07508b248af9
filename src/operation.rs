//! Assembles the single operation at the head of every chain from a snapshot
//! of the query page.

use std::collections::BTreeMap;

use serde::{ser::SerializeSeq, Serialize, Serializer};
use serde_json::Value;

use crate::{
    coercion::ValueCoercion,
    config::TimeConfig,
    descriptor::{EdgeDirection, NamedViewSelection, OperationDescriptor, ParameterDescriptor},
    error::BuildError,
    view::{build_view, DateRangeState, View, ViewState},
};

pub const ENTITY_SEED_CLASS: &str = "uk.gov.gchq.gaffer.operation.data.EntitySeed";
pub const NAMED_VIEW_CLASS: &str = "uk.gov.gchq.gaffer.data.elementdefinition.view.NamedView";

/// The stores' state at the moment the user pressed execute
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuerySnapshot {
    pub operation: OperationDescriptor,
    pub seeds: Vec<Value>,
    pub view: ViewState,
    pub date_range: DateRangeState,
    pub direction: EdgeDirection,
    pub options: Option<BTreeMap<String, String>>,
}

/// `{ "class": EntitySeed, "vertex": ... }`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntitySeed {
    class: &'static str,
    pub vertex: Value,
}

impl EntitySeed {
    pub fn new(vertex: Value) -> EntitySeed {
        EntitySeed {
            class: ENTITY_SEED_CLASS,
            vertex,
        }
    }
}

/// A reference to a view stored on the server
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NamedViewReference {
    class: &'static str,
    pub name: String,
    pub parameters: BTreeMap<String, Value>,
}

/// Named views followed by the ad-hoc view, serialized as one array
#[derive(Clone, Debug, PartialEq)]
pub struct NamedViews {
    pub references: Vec<NamedViewReference>,
    pub adhoc: View,
}

impl Serialize for NamedViews {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.references.len() + 1))?;
        for reference in &self.references {
            seq.serialize_element(reference)?;
        }
        seq.serialize_element(&self.adhoc)?;
        seq.end()
    }
}

/// The view part of an operation: a lone ad-hoc view under `view`, or named
/// views plus the ad-hoc view under `views`. Never both.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum OperationView {
    #[serde(rename = "view")]
    Single(View),
    #[serde(rename = "views")]
    Named(NamedViews),
}

/// The operation the user asked to run
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<EntitySeed>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, Value>>,
    #[serde(flatten)]
    pub view: Option<OperationView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_incoming_out_going: Option<EdgeDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
}

/// Coerces parameters, keeping required ones unconditionally and optional ones
/// only when they coerce to something other than `""` or `null`
pub fn compile_parameters(
    parameters: &BTreeMap<String, ParameterDescriptor>,
    coercion: &dyn ValueCoercion,
) -> BTreeMap<String, Value> {
    parameters
        .iter()
        .filter_map(|(name, parameter)| {
            let value = coercion.to_literal(&parameter.value_class, &parameter.parts);
            let is_empty = value.is_null() || value.as_str() == Some("");
            (parameter.required || !is_empty).then(|| (name.clone(), value))
        })
        .collect()
}

fn compile_named_view(
    selection: &NamedViewSelection,
    coercion: &dyn ValueCoercion,
) -> NamedViewReference {
    NamedViewReference {
        class: NAMED_VIEW_CLASS,
        name: selection.name.clone(),
        parameters: compile_parameters(&selection.parameters, coercion),
    }
}

/// Builds operations from [`QuerySnapshot`]s
pub struct OperationBuilder<'a> {
    coercion: &'a dyn ValueCoercion,
    time: Option<&'a TimeConfig>,
}

impl<'a> OperationBuilder<'a> {
    pub fn new(coercion: &'a dyn ValueCoercion, time: Option<&'a TimeConfig>) -> Self {
        OperationBuilder { coercion, time }
    }

    /// Each flag on the descriptor independently decides whether its field is
    /// present; chain options are attached whenever any are configured.
    pub fn build(&self, snapshot: &QuerySnapshot) -> Result<Operation, BuildError> {
        let descriptor = &snapshot.operation;

        let operation_name = descriptor.named_op.then(|| descriptor.name.clone());

        let input = descriptor.input.then(|| {
            snapshot
                .seeds
                .iter()
                .cloned()
                .map(EntitySeed::new)
                .collect()
        });

        let parameters = descriptor
            .parameters
            .as_ref()
            .map(|parameters| compile_parameters(parameters, self.coercion));

        let view = if descriptor.view {
            Some(self.build_operation_view(snapshot)?)
        } else {
            None
        };

        let include_incoming_out_going = descriptor.in_out_flag.then_some(snapshot.direction);

        let options = snapshot
            .options
            .as_ref()
            .filter(|options| !options.is_empty())
            .cloned();

        let operation = Operation {
            class: descriptor.class.clone(),
            operation_name,
            input,
            parameters,
            view,
            include_incoming_out_going,
            options,
        };
        tracing::debug!(class = %operation.class, "built operation");
        Ok(operation)
    }

    fn build_operation_view(&self, snapshot: &QuerySnapshot) -> Result<OperationView, BuildError> {
        let adhoc = build_view(&snapshot.view, &snapshot.date_range, self.time, self.coercion)?;
        if snapshot.view.named_views.is_empty() {
            return Ok(OperationView::Single(adhoc));
        }
        let references = snapshot
            .view
            .named_views
            .iter()
            .map(|selection| compile_named_view(selection, self.coercion))
            .collect();
        Ok(OperationView::Named(NamedViews { references, adhoc }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{json, Value};
    use speculoos::prelude::*;

    use super::{compile_parameters, OperationBuilder, QuerySnapshot};
    use crate::{
        coercion::{TypeRegistry, ValueParts},
        config::{TimeConfig, TimeFilter},
        descriptor::{EdgeDirection, NamedViewSelection, OperationDescriptor, ParameterDescriptor},
        view::{DateRangeState, ViewState},
    };

    fn parameter(class: &str, raw: &str, required: bool) -> ParameterDescriptor {
        ParameterDescriptor {
            value_class: class.to_string(),
            parts: ValueParts::single(raw),
            required,
        }
    }

    fn build(snapshot: &QuerySnapshot) -> Value {
        let registry = TypeRegistry::default();
        let time = TimeConfig {
            filter: TimeFilter {
                class: "java.lang.Long".to_string(),
                start_property: "startDate".to_string(),
                end_property: "endDate".to_string(),
            },
        };
        let operation = OperationBuilder::new(&registry, Some(&time))
            .build(snapshot)
            .unwrap();
        serde_json::to_value(operation).unwrap()
    }

    fn get_elements() -> OperationDescriptor {
        OperationDescriptor {
            class: "uk.gov.gchq.gaffer.operation.impl.get.GetElements".to_string(),
            input: true,
            view: true,
            in_out_flag: true,
            ..Default::default()
        }
    }

    #[rstest]
    #[case::no_options(None, json!({ "class": "GetAllElements" }))]
    #[case::empty_options(Some(BTreeMap::new()), json!({ "class": "GetAllElements" }))]
    #[case::with_options(
        Some(BTreeMap::from([("gaffer.federatedstore.operation.graphIds".to_string(), "a,b".to_string())])),
        json!({ "class": "GetAllElements", "options": { "gaffer.federatedstore.operation.graphIds": "a,b" } })
    )]
    fn it_builds_only_the_class_when_nothing_is_accepted(
        #[case] options: Option<BTreeMap<String, String>>,
        #[case] expected: Value,
    ) {
        let snapshot = QuerySnapshot {
            operation: OperationDescriptor {
                class: "GetAllElements".to_string(),
                ..Default::default()
            },
            seeds: vec![json!("A")],
            options,
            ..Default::default()
        };

        assert_eq!(build(&snapshot), expected);
    }

    #[test]
    fn it_wraps_seeds_in_upload_order() {
        let snapshot = QuerySnapshot {
            operation: OperationDescriptor {
                class: "uk.gov.gchq.gaffer.operation.impl.get.GetAdjacentIds".to_string(),
                input: true,
                ..Default::default()
            },
            seeds: vec![json!("A"), json!(3)],
            ..Default::default()
        };

        assert_eq!(
            build(&snapshot)["input"],
            json!([
                { "class": "uk.gov.gchq.gaffer.operation.data.EntitySeed", "vertex": "A" },
                { "class": "uk.gov.gchq.gaffer.operation.data.EntitySeed", "vertex": 3 }
            ])
        );
    }

    #[test]
    fn it_names_named_operations() {
        let snapshot = QuerySnapshot {
            operation: OperationDescriptor {
                class: "uk.gov.gchq.gaffer.named.operation.NamedOperation".to_string(),
                name: "two-hop".to_string(),
                named_op: true,
                parameters: Some(BTreeMap::new()),
                ..Default::default()
            },
            ..Default::default()
        };

        assert_eq!(
            build(&snapshot),
            json!({
                "class": "uk.gov.gchq.gaffer.named.operation.NamedOperation",
                "operationName": "two-hop",
                "parameters": {}
            })
        );
    }

    #[test]
    fn it_keeps_required_parameters_even_when_empty() {
        let parameters = BTreeMap::from([
            ("required-empty".to_string(), parameter("java.lang.String", "", true)),
            ("required-null".to_string(), parameter("java.lang.Long", "", true)),
            ("optional-empty".to_string(), parameter("java.lang.String", "", false)),
            ("optional-null".to_string(), parameter("java.lang.Long", " ", false)),
            ("optional-set".to_string(), parameter("java.lang.Long", "12", false)),
        ]);

        let compiled = compile_parameters(&parameters, &TypeRegistry::default());

        assert_eq!(
            compiled,
            BTreeMap::from([
                ("required-empty".to_string(), json!("")),
                ("required-null".to_string(), Value::Null),
                ("optional-set".to_string(), json!(12)),
            ])
        );
    }

    #[test]
    fn it_sends_a_single_view_without_named_views() {
        let snapshot = QuerySnapshot {
            operation: get_elements(),
            seeds: vec![json!("A")],
            view: ViewState {
                entities: vec!["person".to_string()],
                ..Default::default()
            },
            direction: EdgeDirection::Outgoing,
            ..Default::default()
        };

        let operation = build(&snapshot);

        assert_that!(operation.get("views")).is_none();
        assert_eq!(
            operation["view"],
            json!({ "globalElements": [{ "groupBy": [] }], "entities": { "person": {} }, "edges": {} })
        );
        assert_eq!(operation["includeIncomingOutGoing"], json!("OUTGOING"));
    }

    #[test]
    fn it_puts_named_views_before_the_adhoc_view() {
        let snapshot = QuerySnapshot {
            operation: get_elements(),
            view: ViewState {
                edges: vec!["knows".to_string()],
                named_views: vec![
                    NamedViewSelection {
                        name: "recent".to_string(),
                        parameters: BTreeMap::from([
                            ("days".to_string(), parameter("java.lang.Integer", "7", false)),
                            ("unused".to_string(), parameter("java.lang.String", "", false)),
                        ]),
                    },
                    NamedViewSelection {
                        name: "trusted".to_string(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            date_range: DateRangeState {
                start: Some(10),
                end: None,
            },
            ..Default::default()
        };

        let operation = build(&snapshot);

        assert_that!(operation.get("view")).is_none();
        let views = operation["views"].as_array().unwrap();
        assert_eq!(views.len(), 3);
        assert_eq!(
            views[0],
            json!({
                "class": "uk.gov.gchq.gaffer.data.elementdefinition.view.NamedView",
                "name": "recent",
                "parameters": { "days": 7 }
            })
        );
        assert_eq!(views[1]["name"], json!("trusted"));
        assert_eq!(views[2]["edges"], json!({ "knows": {} }));
        assert_eq!(views[2]["globalElements"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn it_builds_the_same_operation_twice() {
        let snapshot = QuerySnapshot {
            operation: OperationDescriptor {
                parameters: Some(BTreeMap::from([(
                    "limit".to_string(),
                    parameter("java.lang.Long", "5", true),
                )])),
                named_op: true,
                name: "op".to_string(),
                ..get_elements()
            },
            seeds: vec![json!("A")],
            view: ViewState {
                entities: vec!["person".to_string()],
                named_views: vec![NamedViewSelection {
                    name: "recent".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            date_range: DateRangeState {
                start: Some(1),
                end: Some(2),
            },
            ..Default::default()
        };

        assert_eq!(build(&snapshot), build(&snapshot));
    }
}
