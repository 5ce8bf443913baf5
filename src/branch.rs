//! `match` / `if` selectors: pick a constraint node from a sibling field of
//! the record being validated.
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::conditional::ConditionalSpec;
use crate::error::SchemaError;
use crate::grammar::Compiler;
use crate::ir::ConstraintNode;
use crate::spec::SchemaSpec;

/// Reserved fallback key of a `match`.
pub const DEFAULT_CASE: &str = "_default";

#[derive(Debug, Clone, PartialEq)]
pub enum Branch {
    Match(MatchSpec),
    If(IfSpec),
    Conditional(Arc<ConditionalSpec>),
}

impl Branch {
    /// Every node this branch could hand to the validator.
    pub fn nodes(&self) -> Box<dyn Iterator<Item = &ConstraintNode> + '_> {
        match self {
            Branch::Match(m) => Box::new(m.cases.values()),
            Branch::If(i) => Box::new(std::iter::once(i.then.as_ref()).chain(i.otherwise.as_deref())),
            Branch::Conditional(c) => Box::new(c.nodes()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchSpec {
    pub ref_path: String,
    /// stringified case key -> node, in declaration order
    pub cases: IndexMap<String, ConstraintNode>,
}

impl MatchSpec {
    /// `None` means the field is unconstrained for this record.
    pub fn select(&self, record: &Value) -> Option<&ConstraintNode> {
        let key = stringify(resolve_path(record, &self.ref_path));
        self.cases.get(&key).or_else(|| self.cases.get(DEFAULT_CASE))
    }
}

/// Truthiness switch on a sibling field.
#[derive(Debug, Clone, PartialEq)]
pub struct IfSpec {
    pub field: String,
    pub then: Box<ConstraintNode>,
    pub otherwise: Option<Box<ConstraintNode>>,
}

impl IfSpec {
    pub fn select(&self, record: &Value) -> Option<&ConstraintNode> {
        if is_truthy(resolve_path(record, &self.field)) {
            Some(&self.then)
        } else {
            self.otherwise.as_deref()
        }
    }
}

// ------------------------------- Compile --------------------------------- //

/// Case key, stringified the same way field values are at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseKey(pub String);

impl From<&str> for CaseKey {
    fn from(s: &str) -> Self {
        CaseKey(s.to_string())
    }
}

impl From<String> for CaseKey {
    fn from(s: String) -> Self {
        CaseKey(s)
    }
}

impl From<bool> for CaseKey {
    fn from(b: bool) -> Self {
        CaseKey(b.to_string())
    }
}

impl From<i64> for CaseKey {
    fn from(n: i64) -> Self {
        CaseKey(n.to_string())
    }
}

impl From<i32> for CaseKey {
    fn from(n: i32) -> Self {
        CaseKey(n.to_string())
    }
}

impl From<f64> for CaseKey {
    fn from(n: f64) -> Self {
        CaseKey(format_number(n))
    }
}

pub fn compile_match(
    compiler: &Compiler,
    ref_path: &str,
    cases: &[(CaseKey, SchemaSpec)],
    path: &str,
) -> Result<MatchSpec, SchemaError> {
    check_ref_path(ref_path, path)?;
    let mut compiled = IndexMap::with_capacity(cases.len());
    for (key, spec) in cases {
        let node = compiler.compile_at(spec, &format!("{path}<{}>", key.0))?;
        if compiled.insert(key.0.clone(), node).is_some() {
            return Err(SchemaError::grammar(path, &key.0, "duplicate match case"));
        }
    }
    tracing::debug!(ref_path, cases = compiled.len(), "compiled match");
    Ok(MatchSpec { ref_path: ref_path.to_string(), cases: compiled })
}

pub fn compile_if(
    compiler: &Compiler,
    field: &str,
    then: &SchemaSpec,
    otherwise: Option<&SchemaSpec>,
    path: &str,
) -> Result<IfSpec, SchemaError> {
    check_ref_path(field, path)?;
    let then = compiler.compile_at(then, path)?;
    let otherwise = otherwise.map(|s| compiler.compile_at(s, path)).transpose()?;
    Ok(IfSpec {
        field: field.to_string(),
        then: Box::new(then),
        otherwise: otherwise.map(Box::new),
    })
}

fn check_ref_path(ref_path: &str, path: &str) -> Result<(), SchemaError> {
    if ref_path.is_empty() || ref_path.split('.').any(str::is_empty) {
        return Err(SchemaError::grammar(path, ref_path, "malformed field reference"));
    }
    Ok(())
}

// ------------------------------- Runtime --------------------------------- //

/// Dotted lookup; a missing or non-object intermediate resolves to `None`.
pub fn resolve_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |cur, seg| cur.as_object()?.get(seg))
}

/// Text used for case lookup. Absent values stringify to `undefined`.
pub fn stringify(v: Option<&Value>) -> String {
    match v {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                format_number(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Some(other) => other.to_string(),
    }
}

/// Integral values print without a fraction (`1.0` -> `1`).
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

/// JavaScript truthiness.
pub fn is_truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|x| x != 0.0 && !x.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
