//! Compiles the user's group selections, filters and date range into the
//! ad-hoc view sent with an operation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    coercion::{ValueCoercion, ValueParts},
    config::TimeConfig,
    descriptor::{FilterDescriptor, NamedViewSelection},
    error::BuildError,
    filter::{compile_filter, FilterFunction, Predicate},
};

pub const IS_MORE_THAN_CLASS: &str = "uk.gov.gchq.koryphe.impl.predicate.IsMoreThan";
pub const IS_LESS_THAN_CLASS: &str = "uk.gov.gchq.koryphe.impl.predicate.IsLessThan";

/// Filters applied to one element group, split around aggregation.
/// A list is only present once a filter has been added to it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_aggregation_filter_functions: Option<Vec<FilterFunction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_aggregation_filter_functions: Option<Vec<FilterFunction>>,
}

impl ElementView {
    fn push(&mut self, filter: FilterFunction, pre_aggregation: bool) {
        let list = if pre_aggregation {
            &mut self.pre_aggregation_filter_functions
        } else {
            &mut self.post_aggregation_filter_functions
        };
        list.get_or_insert_with(Vec::new).push(filter);
    }
}

/// A definition applied to every group in the view
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalElementDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_aggregation_filter_functions: Option<Vec<FilterFunction>>,
}

impl GlobalElementDefinition {
    /// `{ "groupBy": [] }`: aggregate every element of a group together
    pub fn without_group_by() -> Self {
        GlobalElementDefinition {
            group_by: Some(Vec::new()),
            pre_aggregation_filter_functions: None,
        }
    }

    pub fn pre_aggregation(filter: FilterFunction) -> Self {
        GlobalElementDefinition {
            group_by: None,
            pre_aggregation_filter_functions: Some(vec![filter]),
        }
    }
}

/// An ad-hoc view
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub global_elements: Vec<GlobalElementDefinition>,
    pub entities: BTreeMap<String, ElementView>,
    pub edges: BTreeMap<String, ElementView>,
}

/// Everything the view store holds for the next query
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub entities: Vec<String>,
    pub edges: Vec<String>,
    pub entity_filters: BTreeMap<String, Vec<FilterDescriptor>>,
    pub edge_filters: BTreeMap<String, Vec<FilterDescriptor>>,
    pub named_views: Vec<NamedViewSelection>,
}

/// Bounds chosen in the date-range picker, in the units of the time filter class
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeState {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl DateRangeState {
    pub fn is_set(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

/// Builds one entry per selected group, even when the group has no filters,
/// with each filter appended in order to its pre- or post-aggregation list
pub fn compile_element_views(
    groups: &[String],
    filters: &BTreeMap<String, Vec<FilterDescriptor>>,
    coercion: &dyn ValueCoercion,
) -> BTreeMap<String, ElementView> {
    groups
        .iter()
        .map(|group| {
            let mut view = ElementView::default();
            for filter in filters.get(group).into_iter().flatten() {
                view.push(compile_filter(filter, coercion), filter.pre_aggregation);
            }
            (group.clone(), view)
        })
        .collect()
}

fn date_bound_filter(
    predicate_class: &str,
    property: &str,
    bound: i64,
    time: &TimeConfig,
    coercion: &dyn ValueCoercion,
) -> GlobalElementDefinition {
    let value = coercion.to_tagged_json(&time.filter.class, &ValueParts::single(bound));
    GlobalElementDefinition::pre_aggregation(FilterFunction {
        predicate: Predicate::new(predicate_class)
            .with_argument("orEqualTo", true.into())
            .with_argument("value", value),
        selection: vec![property.to_string()],
    })
}

/// Compiles the ad-hoc view.
///
/// `globalElements` always starts with the group-by-disabling entry; a start
/// bound and then an end bound are appended after it as their own entries.
pub fn build_view(
    state: &ViewState,
    dates: &DateRangeState,
    time: Option<&TimeConfig>,
    coercion: &dyn ValueCoercion,
) -> Result<View, BuildError> {
    let mut global_elements = vec![GlobalElementDefinition::without_group_by()];

    if dates.is_set() {
        let time = time.ok_or(BuildError::MissingTimeConfig)?;
        if let Some(start) = dates.start {
            global_elements.push(date_bound_filter(
                IS_MORE_THAN_CLASS,
                &time.filter.start_property,
                start,
                time,
                coercion,
            ));
        }
        if let Some(end) = dates.end {
            global_elements.push(date_bound_filter(
                IS_LESS_THAN_CLASS,
                &time.filter.end_property,
                end,
                time,
                coercion,
            ));
        }
    }

    Ok(View {
        global_elements,
        entities: compile_element_views(&state.entities, &state.entity_filters, coercion),
        edges: compile_element_views(&state.edges, &state.edge_filters, coercion),
    })
}
