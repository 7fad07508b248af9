//! Turns typed parameter input (a Java class name plus the raw fragments the
//! user typed) into JSON values the REST service understands.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Raw user input for one typed value.
///
/// Simple types carry a single fragment; composite types carry one fragment
/// per named field (e.g. `type`, `subType`, `value`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueParts {
    Fields(BTreeMap<String, Value>),
    Single(Value),
}

impl ValueParts {
    pub fn single(value: impl Into<Value>) -> ValueParts {
        ValueParts::Single(value.into())
    }
}

impl Default for ValueParts {
    fn default() -> Self {
        ValueParts::Fields(BTreeMap::new())
    }
}

/// Conversion from typed user input into literal or class-tagged JSON values
pub trait ValueCoercion: Send + Sync {
    /// Whether `class` converts to a plain JSON literal without a type tag
    fn is_known_type(&self, class: &str) -> bool;

    /// Converts `parts` into the plain value for `class`
    fn to_literal(&self, class: &str, parts: &ValueParts) -> Value;

    /// Converts `parts` into `{ "<class>": value }`, the typed JSON form the
    /// service uses when a field's type cannot be inferred from the value
    fn to_tagged_json(&self, class: &str, parts: &ValueParts) -> Value {
        let mut tagged = Map::new();
        tagged.insert(class.to_string(), self.to_literal(class, parts));
        Value::Object(tagged)
    }
}

/// How a known class is represented in JSON
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Text,
    Integer,
    Decimal,
    Boolean,
}

/// [`ValueCoercion`] backed by a table of known classes
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    known: BTreeMap<String, ScalarKind>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let known = [
            ("java.lang.String", ScalarKind::Text),
            ("java.lang.Long", ScalarKind::Integer),
            ("java.lang.Integer", ScalarKind::Integer),
            ("java.lang.Short", ScalarKind::Integer),
            ("java.lang.Double", ScalarKind::Decimal),
            ("java.lang.Float", ScalarKind::Decimal),
            ("java.lang.Boolean", ScalarKind::Boolean),
        ]
        .into_iter()
        .map(|(class, kind)| (class.to_string(), kind))
        .collect();
        TypeRegistry { known }
    }
}

impl TypeRegistry {
    /// Registers (or replaces) a known class
    pub fn register(&mut self, class: impl Into<String>, kind: ScalarKind) -> &mut Self {
        self.known.insert(class.into(), kind);
        self
    }

    fn coerce_scalar(class: &str, kind: ScalarKind, raw: &Value) -> Value {
        match (kind, raw) {
            (_, Value::Null) => Value::Null,
            (ScalarKind::Text, Value::String(_)) => raw.clone(),
            (ScalarKind::Text, other) => Value::String(other.to_string()),
            (ScalarKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => raw.clone(),
            (ScalarKind::Decimal, Value::Number(_)) => raw.clone(),
            (ScalarKind::Boolean, Value::Bool(_)) => raw.clone(),
            (_, Value::String(s)) if s.trim().is_empty() => Value::Null,
            (ScalarKind::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Self::unparseable(class, raw),
            },
            (ScalarKind::Decimal, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Self::unparseable(class, raw)),
            (ScalarKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Self::unparseable(class, raw),
            },
            _ => Self::unparseable(class, raw),
        }
    }

    fn unparseable(class: &str, raw: &Value) -> Value {
        tracing::warn!(%class, %raw, "value does not match its declared class, leaving it unset");
        Value::Null
    }

    fn coerce_custom(raw: &Value) -> Value {
        match raw {
            // composite values are sometimes typed in as JSON text
            Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| raw.clone()),
            _ => raw.clone(),
        }
    }
}

impl ValueCoercion for TypeRegistry {
    fn is_known_type(&self, class: &str) -> bool {
        self.known.contains_key(class)
    }

    fn to_literal(&self, class: &str, parts: &ValueParts) -> Value {
        match (self.known.get(class).copied(), parts) {
            (Some(kind), ValueParts::Single(raw)) => Self::coerce_scalar(class, kind, raw),
            (Some(ScalarKind::Text), ValueParts::Fields(fields)) if fields.is_empty() => {
                Value::String(String::new())
            }
            (Some(kind), ValueParts::Fields(fields)) if fields.len() <= 1 => fields
                .values()
                .next()
                .map(|raw| Self::coerce_scalar(class, kind, raw))
                .unwrap_or(Value::Null),
            (None, ValueParts::Single(raw)) => Self::coerce_custom(raw),
            (_, ValueParts::Fields(fields)) => Value::Object(
                fields
                    .iter()
                    .map(|(name, raw)| (name.clone(), Self::coerce_custom(raw)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::{json, Value};
    use speculoos::prelude::*;
    use tracing_test::traced_test;

    use super::{ScalarKind, TypeRegistry, ValueCoercion, ValueParts};

    #[rstest]
    #[case::string("java.lang.String", json!("abc"), json!("abc"))]
    #[case::empty_string("java.lang.String", json!(""), json!(""))]
    #[case::long("java.lang.Long", json!("42"), json!(42))]
    #[case::long_already_numeric("java.lang.Long", json!(7), json!(7))]
    #[case::blank_long("java.lang.Long", json!("  "), Value::Null)]
    #[case::double("java.lang.Double", json!("2.5"), json!(2.5))]
    #[case::boolean("java.lang.Boolean", json!("TRUE"), json!(true))]
    #[case::custom_json("uk.gov.gchq.gaffer.types.TypeSubTypeValue", json!("{\"type\":\"t\"}"), json!({"type": "t"}))]
    #[case::custom_text("com.example.Thing", json!("plain"), json!("plain"))]
    fn it_converts_single_fragments(
        #[case] class: &str,
        #[case] raw: Value,
        #[case] expected: Value,
    ) {
        let registry = TypeRegistry::default();
        assert_that!(registry.to_literal(class, &ValueParts::Single(raw))).is_equal_to(expected);
    }

    #[test]
    fn it_keeps_named_fields_of_composite_types() {
        let registry = TypeRegistry::default();
        let parts: ValueParts =
            serde_json::from_value(json!({"type": "t", "subType": "s", "value": "v"})).unwrap();
        assert_that!(registry.to_literal("uk.gov.gchq.gaffer.types.TypeSubTypeValue", &parts))
            .is_equal_to(json!({"type": "t", "subType": "s", "value": "v"}));
    }

    #[test]
    fn it_treats_missing_input_as_empty() {
        let registry = TypeRegistry::default();
        assert_that!(registry.to_literal("java.lang.String", &ValueParts::default()))
            .is_equal_to(json!(""));
        assert_that!(registry.to_literal("java.lang.Long", &ValueParts::default()))
            .is_equal_to(Value::Null);
    }

    #[test]
    fn it_tags_values_with_their_class() {
        let registry = TypeRegistry::default();
        assert_that!(registry.to_tagged_json("java.lang.Long", &ValueParts::single(1_500_000_000_000_i64)))
            .is_equal_to(json!({"java.lang.Long": 1_500_000_000_000_i64}));
    }

    #[test]
    fn it_knows_registered_classes() {
        let mut registry = TypeRegistry::default();
        assert_that!(registry.is_known_type("java.util.Date")).is_false();
        registry.register("java.util.Date", ScalarKind::Integer);
        assert_that!(registry.is_known_type("java.util.Date")).is_true();
        assert_that!(registry.is_known_type("java.lang.String")).is_true();
    }

    #[test]
    #[traced_test]
    fn it_warns_about_unparseable_numbers() {
        let registry = TypeRegistry::default();
        let value = registry.to_literal("java.lang.Integer", &ValueParts::single("twelve"));
        assert_that!(value).is_equal_to(Value::Null);
        assert!(logs_contain("does not match its declared class"));
    }
}
