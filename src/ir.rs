//! Canonical constraint tree.
//!
//! Produced by the grammar compiler, read by the validator and the JSON Schema
//! emitter. Nodes are plain values; once compiled they are shared behind an
//! `Arc` and nothing downstream mutates them.
pub mod format;

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use regex::Regex;
use serde_json::Value;

use crate::branch::Branch;

pub use format::Format;

pub type Bound = OrderedFloat<f64>;

// ------------------------------- Node ------------------------------------ //

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintNode {
    pub base_type: BaseType,
    pub constraint: Option<Constraint>, // at most one clause per node
    pub required: bool,
    pub enum_values: Vec<Literal>,      // mutually exclusive with `constraint`
    pub pattern: Option<Pattern>,
    pub shape: Shape,
    pub meta: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Primitive,
    Object,
    Array,
    Union,
    Conditional,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Primitive,
    Object { fields: IndexMap<String, ConstraintNode> },
    Array { items: Option<Box<ConstraintNode>> },
    Union { members: Vec<ConstraintNode> },
    Conditional(Branch),
}

impl ConstraintNode {
    pub fn new(base_type: BaseType) -> Self {
        let shape = match base_type {
            BaseType::Object => Shape::Object { fields: IndexMap::new() },
            BaseType::Array => Shape::Array { items: None },
            _ => Shape::Primitive,
        };
        Self {
            base_type,
            constraint: None,
            required: false,
            enum_values: Vec::new(),
            pattern: None,
            shape,
            meta: Metadata::default(),
        }
    }

    pub fn object(fields: IndexMap<String, ConstraintNode>) -> Self {
        Self { shape: Shape::Object { fields }, ..Self::new(BaseType::Object) }
    }

    pub fn array(items: Option<ConstraintNode>) -> Self {
        Self {
            shape: Shape::Array { items: items.map(Box::new) },
            ..Self::new(BaseType::Array)
        }
    }

    pub fn union(members: Vec<ConstraintNode>) -> Self {
        Self { shape: Shape::Union { members }, ..Self::new(BaseType::Any) }
    }

    pub fn conditional(branch: Branch) -> Self {
        Self { shape: Shape::Conditional(branch), ..Self::new(BaseType::Any) }
    }

    pub fn kind(&self) -> Kind {
        match &self.shape {
            Shape::Primitive => Kind::Primitive,
            Shape::Object { .. } => Kind::Object,
            Shape::Array { .. } => Kind::Array,
            Shape::Union { .. } => Kind::Union,
            Shape::Conditional(_) => Kind::Conditional,
        }
    }

    pub fn is_enum(&self) -> bool {
        !self.enum_values.is_empty()
    }

    /// Label used in rendered messages, falling back to the field path.
    pub fn display_label(&self, path: &str) -> String {
        match (&self.meta.label, path) {
            (Some(label), _) => label.clone(),
            (None, "") => "value".to_string(),
            (None, p) => p.to_string(),
        }
    }
}

// ------------------------------- Types ----------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
    Any,
    Format(Format),
}

/// What a constraint clause bounds for a given base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Length,
    Value,
    Items,
    Properties,
}

impl BaseType {
    pub fn name(&self) -> &'static str {
        match self {
            BaseType::String => "string",
            BaseType::Number => "number",
            BaseType::Integer => "integer",
            BaseType::Boolean => "boolean",
            BaseType::Object => "object",
            BaseType::Array => "array",
            BaseType::Null => "null",
            BaseType::Any => "any",
            BaseType::Format(f) => f.name(),
        }
    }

    /// `None` for types that take no constraint clause.
    pub fn measure(&self) -> Option<Measure> {
        match self {
            BaseType::String | BaseType::Format(_) => Some(Measure::Length),
            BaseType::Number | BaseType::Integer => Some(Measure::Value),
            BaseType::Array => Some(Measure::Items),
            BaseType::Object => Some(Measure::Properties),
            BaseType::Boolean | BaseType::Null | BaseType::Any => None,
        }
    }

    pub fn accepts_null(&self) -> bool {
        matches!(self, BaseType::Null | BaseType::Any)
    }

    /// JSON-level type match only; formats are checked separately.
    pub fn matches_json(&self, v: &Value) -> bool {
        match self {
            BaseType::String | BaseType::Format(_) => v.is_string(),
            BaseType::Number => v.is_number(),
            BaseType::Integer => is_integral(v),
            BaseType::Boolean => v.is_boolean(),
            BaseType::Object => v.is_object(),
            BaseType::Array => v.is_array(),
            BaseType::Null => v.is_null(),
            BaseType::Any => true,
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn is_integral(v: &Value) -> bool {
    match v {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|x| x.is_finite() && x.fract() == 0.0)
        }
        _ => false,
    }
}

// ----------------------------- Constraints ------------------------------- //

/// Inclusive unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    Range { min: Option<Bound>, max: Option<Bound> },
    Gt(Bound),
    Gte(Bound),
    Lt(Bound),
    Lte(Bound),
    Eq(Bound),
    ExactLength(u64),
}

/// Which rule a measured value broke. `keyword()` is what lands on the error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Violation {
    Min { limit: f64, exclusive: bool },
    Max { limit: f64, exclusive: bool },
    Equal { limit: f64 },
    Length { limit: u64 },
}

impl Constraint {
    pub fn check(&self, measured: f64) -> Option<Violation> {
        match *self {
            Constraint::Range { min, max } => {
                if let Some(min) = min.filter(|m| measured < m.0) {
                    return Some(Violation::Min { limit: min.0, exclusive: false });
                }
                max.filter(|m| measured > m.0)
                    .map(|max| Violation::Max { limit: max.0, exclusive: false })
            }
            Constraint::Gt(b) => (measured <= b.0).then_some(Violation::Min { limit: b.0, exclusive: true }),
            Constraint::Gte(b) => (measured < b.0).then_some(Violation::Min { limit: b.0, exclusive: false }),
            Constraint::Lt(b) => (measured >= b.0).then_some(Violation::Max { limit: b.0, exclusive: true }),
            Constraint::Lte(b) => (measured > b.0).then_some(Violation::Max { limit: b.0, exclusive: false }),
            Constraint::Eq(b) => (measured != b.0).then_some(Violation::Equal { limit: b.0 }),
            Constraint::ExactLength(n) => (measured != n as f64).then_some(Violation::Length { limit: n }),
        }
    }
}

impl Violation {
    pub fn keyword(&self) -> &'static str {
        match self {
            Violation::Min { .. } => "min",
            Violation::Max { .. } => "max",
            Violation::Equal { .. } => "equal",
            Violation::Length { .. } => "length",
        }
    }

    /// Rule suffix for the message key (`string.min`, `number.gt`, ...).
    pub fn rule(&self) -> &'static str {
        match self {
            Violation::Min { exclusive: true, .. } => "gt",
            Violation::Min { .. } => "min",
            Violation::Max { exclusive: true, .. } => "lt",
            Violation::Max { .. } => "max",
            Violation::Equal { .. } => "equal",
            Violation::Length { .. } => "length",
        }
    }

    pub fn limit(&self) -> f64 {
        match *self {
            Violation::Min { limit, .. } | Violation::Max { limit, .. } | Violation::Equal { limit } => limit,
            Violation::Length { limit } => limit as f64,
        }
    }

    pub fn exclusive(&self) -> bool {
        matches!(self, Violation::Min { exclusive: true, .. } | Violation::Max { exclusive: true, .. })
    }
}

// ------------------------------- Literals -------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    String(String),
    Number(Bound),
    Boolean(bool),
}

impl Literal {
    /// Strict: `"true"` never matches `true`.
    pub fn matches(&self, v: &Value) -> bool {
        match (self, v) {
            (Literal::String(a), Value::String(b)) => a == b,
            (Literal::Number(a), Value::Number(b)) => b.as_f64() == Some(a.0),
            (Literal::Boolean(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Literal::String(s) => Value::from(s.clone()),
            Literal::Number(n) => json_num_pref_i64(n.0),
            Literal::Boolean(b) => Value::from(*b),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => f.write_str(s),
            Literal::Number(n) => f.write_str(&crate::branch::format_number(n.0)),
            Literal::Boolean(b) => write!(f, "{b}"),
        }
    }
}

// Helper: prefer emitting integers when exact
pub fn json_num_pref_i64(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

// ------------------------------- Pattern --------------------------------- //

/// Compiled regex that compares by source text.
#[derive(Debug, Clone)]
pub struct Pattern(pub Regex);

impl Pattern {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.0.is_match(s)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

// ------------------------------- Metadata -------------------------------- //

/// Rendering-only data; never consulted for type matching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub label: Option<String>,
    pub description: Option<String>,
    /// keyword -> message key or literal text
    pub messages: IndexMap<String, String>,
    pub customs: Vec<CustomValidator>,
}

pub type SyncCheck = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;
pub type AsyncCheck = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

#[derive(Clone)]
pub enum CustomCheck {
    Sync(SyncCheck),
    Async(AsyncCheck),
}

/// `Err(message)` from the check becomes a `custom` error; the message is
/// looked up through the message service like any other key.
#[derive(Clone)]
pub struct CustomValidator {
    pub check: CustomCheck,
}

impl PartialEq for CustomValidator {
    fn eq(&self, other: &Self) -> bool {
        match (&self.check, &other.check) {
            (CustomCheck::Sync(a), CustomCheck::Sync(b)) => Arc::ptr_eq(a, b),
            (CustomCheck::Async(a), CustomCheck::Async(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.check {
            CustomCheck::Sync(_) => "sync",
            CustomCheck::Async(_) => "async",
        };
        f.debug_struct("CustomValidator").field("mode", &mode).finish()
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn b(x: f64) -> Bound {
        OrderedFloat(x)
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let c = Constraint::Range { min: Some(b(18.0)), max: Some(b(120.0)) };
        assert_eq!(c.check(17.0).map(|v| v.keyword()), Some("min"));
        assert!(c.check(18.0).is_none());
        assert!(c.check(120.0).is_none());
        assert_eq!(c.check(121.0).map(|v| v.keyword()), Some("max"));
    }

    #[test]
    fn comparison_operators_map_to_min_max_keywords() {
        let gt = Constraint::Gt(b(0.0));
        let v = gt.check(0.0).unwrap();
        assert_eq!(v.keyword(), "min");
        assert_eq!(v.rule(), "gt");
        assert!(v.exclusive());
        assert!(gt.check(0.0001).is_none());

        let lt = Constraint::Lt(b(10.0));
        assert_eq!(lt.check(10.0).unwrap().rule(), "lt");
        assert!(Constraint::Lte(b(10.0)).check(10.0).is_none());

        let eq = Constraint::Eq(b(100.0));
        assert!(eq.check(100.0).is_none());
        assert_eq!(eq.check(99.0).unwrap().keyword(), "equal");
        assert_eq!(eq.check(101.0).unwrap().keyword(), "equal");
    }

    #[test]
    fn literals_match_strictly_by_json_type() {
        assert!(Literal::Boolean(true).matches(&json!(true)));
        assert!(!Literal::Boolean(true).matches(&json!("true")));
        assert!(Literal::Number(b(1.0)).matches(&json!(1)));
        assert!(!Literal::String("1".into()).matches(&json!(1)));
    }

    #[test]
    fn integer_accepts_integral_floats_only() {
        assert!(BaseType::Integer.matches_json(&json!(5)));
        assert!(BaseType::Integer.matches_json(&json!(5.0)));
        assert!(!BaseType::Integer.matches_json(&json!(5.5)));
        assert!(!BaseType::Integer.matches_json(&json!("5")));
    }

    #[test]
    fn kind_follows_shape() {
        assert_eq!(ConstraintNode::new(BaseType::String).kind(), Kind::Primitive);
        assert_eq!(ConstraintNode::new(BaseType::Array).kind(), Kind::Array);
        assert_eq!(ConstraintNode::object(IndexMap::new()).kind(), Kind::Object);
        assert_eq!(ConstraintNode::union(vec![]).kind(), Kind::Union);
    }
}
