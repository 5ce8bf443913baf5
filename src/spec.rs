//! Compiler input: anything that can describe a schema before compilation.
use indexmap::IndexMap;
use serde_json::Value;

use crate::branch::CaseKey;
use crate::builder::{FieldBuilder, Reusable};
use crate::conditional::ConditionalBuilder;
use crate::ir::ConstraintNode;

#[derive(Debug, Clone)]
pub enum SchemaSpec {
    /// `"string:3-32!"`
    Dsl(String),
    /// Object literal; fields keep declaration order.
    Object(IndexMap<String, SchemaSpec>),
    /// One-element array literal: every item matches the inner spec.
    Array(Box<SchemaSpec>),
    Field(Box<FieldBuilder>),
    /// Already compiled; used as-is.
    Node(ConstraintNode),
    Match { path: String, cases: Vec<(CaseKey, SchemaSpec)> },
    IfField { field: String, then: Box<SchemaSpec>, otherwise: Option<Box<SchemaSpec>> },
    Conditional(Box<ConditionalBuilder>),
    /// JSON that has no schema meaning; rejected at compile time.
    Unsupported(Value),
}

impl SchemaSpec {
    pub fn object<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SchemaSpec>,
    {
        SchemaSpec::Object(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn array_of(items: impl Into<SchemaSpec>) -> Self {
        SchemaSpec::Array(Box::new(items.into()))
    }
}

/// Pick the field's schema by the stringified value at `path` in the
/// enclosing record. `_default` catches everything else.
pub fn match_field<I, K, V>(path: impl Into<String>, cases: I) -> SchemaSpec
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<CaseKey>,
    V: Into<SchemaSpec>,
{
    SchemaSpec::Match {
        path: path.into(),
        cases: cases.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
}

/// `then` when `field` is truthy in the enclosing record, else `otherwise`
/// (or no constraint at all).
pub fn if_field(field: impl Into<String>, then: impl Into<SchemaSpec>, otherwise: Option<SchemaSpec>) -> SchemaSpec {
    SchemaSpec::IfField {
        field: field.into(),
        then: Box::new(then.into()),
        otherwise: otherwise.map(Box::new),
    }
}

impl From<&str> for SchemaSpec {
    fn from(s: &str) -> Self {
        SchemaSpec::Dsl(s.to_string())
    }
}

impl From<String> for SchemaSpec {
    fn from(s: String) -> Self {
        SchemaSpec::Dsl(s)
    }
}

impl From<FieldBuilder> for SchemaSpec {
    fn from(b: FieldBuilder) -> Self {
        SchemaSpec::Field(Box::new(b))
    }
}

impl From<ConstraintNode> for SchemaSpec {
    fn from(n: ConstraintNode) -> Self {
        SchemaSpec::Node(n)
    }
}

impl From<ConditionalBuilder> for SchemaSpec {
    fn from(b: ConditionalBuilder) -> Self {
        SchemaSpec::Conditional(Box::new(b))
    }
}

impl From<&Reusable> for SchemaSpec {
    fn from(r: &Reusable) -> Self {
        r.spec()
    }
}

impl From<Value> for SchemaSpec {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => SchemaSpec::Dsl(s),
            Value::Object(map) => SchemaSpec::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
            Value::Array(mut items) if items.len() == 1 => SchemaSpec::Array(Box::new(items.remove(0).into())),
            other => SchemaSpec::Unsupported(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_literals_map_onto_specs() {
        let spec = SchemaSpec::from(json!({"a": "string", "b": ["number"], "c": {"d": "integer"}}));
        let SchemaSpec::Object(fields) = spec else { panic!("expected object") };
        assert!(matches!(fields["a"], SchemaSpec::Dsl(_)));
        assert!(matches!(fields["b"], SchemaSpec::Array(_)));
        assert!(matches!(fields["c"], SchemaSpec::Object(_)));
    }

    #[test]
    fn non_schema_json_is_unsupported() {
        assert!(matches!(SchemaSpec::from(json!(5)), SchemaSpec::Unsupported(_)));
        assert!(matches!(SchemaSpec::from(json!(["a", "b"])), SchemaSpec::Unsupported(_)));
        assert!(crate::grammar::compile(json!({"x": 5})).is_err());
    }

    #[test]
    fn conditionals_nest_inside_object_literals() {
        let inner = crate::conditional::when(|d| d["a"] == json!(1)).then("string!").otherwise("number");
        let outer = SchemaSpec::object([("x", SchemaSpec::from(inner))]);
        let SchemaSpec::Object(fields) = &outer else { panic!("expected object") };
        assert!(matches!(fields["x"], SchemaSpec::Conditional(_)));
        assert!(crate::grammar::compile(outer).is_ok());
    }
}
