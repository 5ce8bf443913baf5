//! Function-based conditional chains:
//! `when(p) -> [and|or]* -> [message|then] -> [else_when ...] -> otherwise?`
//!
//! The builder records the call sequence; `build()` compiles the `then` /
//! `otherwise` schemas into a [`ConditionalSpec`], which is immutable and
//! evaluates without keeping state between calls.
pub mod eval;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::RuntimeConfig;
use crate::error::{SchemaError, ValidationResult};
use crate::grammar::Compiler;
use crate::ir::ConstraintNode;
use crate::messages::Catalog;
use crate::spec::SchemaSpec;
use crate::validator::Validator;

pub use eval::Selection;

// ------------------------------ Predicates ------------------------------- //

/// What a predicate closure may return. `None` / `Err` are treated like a
/// thrown predicate: the condition evaluates to `false`.
pub trait PredicateOutcome {
    fn into_outcome(self) -> anyhow::Result<bool>;
}

impl PredicateOutcome for bool {
    fn into_outcome(self) -> anyhow::Result<bool> {
        Ok(self)
    }
}

impl PredicateOutcome for Option<bool> {
    fn into_outcome(self) -> anyhow::Result<bool> {
        self.ok_or_else(|| anyhow::anyhow!("predicate produced no value"))
    }
}

impl PredicateOutcome for anyhow::Result<bool> {
    fn into_outcome(self) -> anyhow::Result<bool> {
        self
    }
}

#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Value) -> anyhow::Result<bool> + Send + Sync>);

impl Predicate {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: PredicateOutcome,
    {
        Predicate(Arc::new(move |v| f(v).into_outcome()))
    }

    pub fn eval(&self, data: &Value) -> bool {
        match (self.0)(data) {
            Ok(b) => b,
            Err(error) => {
                tracing::debug!(%error, "predicate failed; treating as false");
                false
            }
        }
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

// --------------------------------- Spec ---------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOp {
    Root,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedCondition {
    pub op: CombineOp,
    pub predicate: Predicate,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    If,
    ElseIf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Throw,
}

/// One `when`/`else_when` entry. `S` is `SchemaSpec` while building and
/// `ConstraintNode` once compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionEntry<S> {
    pub kind: ConditionKind,
    /// `combined[0].op` is always `Root`
    pub combined: Vec<CombinedCondition>,
    pub then: Option<S>,
    pub message: Option<String>,
    pub action: Option<Action>,
}

impl<S> ConditionEntry<S> {
    fn open(kind: ConditionKind, predicate: Predicate) -> Self {
        Self {
            kind,
            combined: vec![CombinedCondition { op: CombineOp::Root, predicate, message: None }],
            then: None,
            message: None,
            action: None,
        }
    }
}

/// `Undefined` and `Null` both skip validation when nothing matched.
#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch<S> {
    Undefined,
    Null,
    Schema(S),
}

impl<S> Default for ElseBranch<S> {
    fn default() -> Self {
        ElseBranch::Undefined
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalSpec {
    pub entries: Vec<ConditionEntry<ConstraintNode>>,
    pub else_branch: ElseBranch<Box<ConstraintNode>>,
}

impl ConditionalSpec {
    pub fn nodes(&self) -> impl Iterator<Item = &ConstraintNode> {
        let else_node = match &self.else_branch {
            ElseBranch::Schema(node) => Some(node.as_ref()),
            _ => None,
        };
        self.entries.iter().filter_map(|e| e.then.as_ref()).chain(else_node)
    }

    pub fn select(&self, data: &Value) -> Selection<'_> {
        eval::select(self, data)
    }

    pub fn validate(&self, data: &Value) -> Result<ValidationResult, SchemaError> {
        self.validate_with(data, &RuntimeConfig::default())
    }

    pub fn validate_with(&self, data: &Value, config: &RuntimeConfig) -> Result<ValidationResult, SchemaError> {
        let catalog = Catalog::from_config(config);
        Validator::new(config, &catalog).validate_conditional(self, data)
    }

    pub async fn validate_async(&self, data: &Value) -> Result<(), SchemaError> {
        let config = RuntimeConfig::default();
        let catalog = Catalog::from_config(&config);
        Validator::new(&config, &catalog)
            .validate_conditional_async(self, data)
            .await?
            .into_result()
    }

    pub fn assert(&self, data: &Value) -> Result<(), SchemaError> {
        self.validate(data)?.into_result()
    }

    pub fn check(&self, data: &Value) -> bool {
        self.validate(data).is_ok_and(|r| r.valid)
    }
}

// -------------------------------- Builder -------------------------------- //

/// Chainable; misuse is recorded and reported by `build()` and every
/// validation entry point.
#[derive(Debug, Clone, Default)]
pub struct ConditionalBuilder {
    entries: Vec<ConditionEntry<SchemaSpec>>,
    else_branch: ElseBranch<SchemaSpec>,
    closed: bool,
    error: Option<String>,
}

/// Start a chain with its first condition.
pub fn when<F, R>(predicate: F) -> ConditionalBuilder
where
    F: Fn(&Value) -> R + Send + Sync + 'static,
    R: PredicateOutcome,
{
    ConditionalBuilder::new().when(predicate)
}

impl ConditionalBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when<F, R>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: PredicateOutcome,
    {
        if self.guard_open("when") && !self.entries.is_empty() {
            self.fail("`when` may only start a chain; use `else_when` for further branches");
        } else if self.error.is_none() {
            self.entries.push(ConditionEntry::open(ConditionKind::If, Predicate::new(predicate)));
        }
        self
    }

    pub fn else_when<F, R>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: PredicateOutcome,
    {
        if self.guard_open("else_when") && self.guard_entry("else_when") {
            self.entries.push(ConditionEntry::open(ConditionKind::ElseIf, Predicate::new(predicate)));
        }
        self
    }

    pub fn and<F, R>(self, predicate: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: PredicateOutcome,
    {
        self.combine(CombineOp::And, "and", Predicate::new(predicate))
    }

    pub fn or<F, R>(self, predicate: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: PredicateOutcome,
    {
        self.combine(CombineOp::Or, "or", Predicate::new(predicate))
    }

    /// Attach `text` to the latest condition and as the entry's fallback;
    /// the entry now fails validation when it triggers.
    pub fn message(mut self, text: impl Into<String>) -> Self {
        if self.guard_open("message") && self.guard_entry("message") {
            let text = text.into();
            if let Some(entry) = self.entries.last_mut() {
                if let Some(last) = entry.combined.last_mut() {
                    last.message = Some(text.clone());
                }
                entry.message = Some(text);
                entry.action = Some(Action::Throw);
            }
        }
        self
    }

    pub fn then(mut self, spec: impl Into<SchemaSpec>) -> Self {
        if self.guard_open("then") && self.guard_entry("then") {
            let has_then = self.entries.last().is_some_and(|e| e.then.is_some());
            if has_then {
                self.fail("an entry may have at most one `then`");
            } else if let Some(entry) = self.entries.last_mut() {
                entry.then = Some(spec.into());
            }
        }
        self
    }

    pub fn otherwise(mut self, spec: impl Into<SchemaSpec>) -> Self {
        if self.guard_open("otherwise") && self.guard_entry("otherwise") {
            self.else_branch = ElseBranch::Schema(spec.into());
            self.closed = true;
        }
        self
    }

    /// `else(null)`: explicitly skip validation when nothing matched.
    pub fn otherwise_null(mut self) -> Self {
        if self.guard_open("otherwise_null") && self.guard_entry("otherwise_null") {
            self.else_branch = ElseBranch::Null;
            self.closed = true;
        }
        self
    }

    pub fn build(&self) -> Result<ConditionalSpec, SchemaError> {
        self.build_at(&Compiler::default(), "")
    }

    pub(crate) fn build_at(&self, compiler: &Compiler, path: &str) -> Result<ConditionalSpec, SchemaError> {
        if let Some(error) = &self.error {
            return Err(SchemaError::Sequence(error.clone()));
        }
        if self.entries.is_empty() {
            return Err(SchemaError::Sequence("conditional chain has no `when`".to_string()));
        }
        let entries = self
            .entries
            .iter()
            .map(|entry| {
                let then = entry.then.as_ref().map(|s| compiler.compile_at(s, path)).transpose()?;
                Ok(ConditionEntry {
                    kind: entry.kind,
                    combined: entry.combined.clone(),
                    then,
                    message: entry.message.clone(),
                    action: entry.action,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        let else_branch = match &self.else_branch {
            ElseBranch::Undefined => ElseBranch::Undefined,
            ElseBranch::Null => ElseBranch::Null,
            ElseBranch::Schema(s) => ElseBranch::Schema(Box::new(compiler.compile_at(s, path)?)),
        };
        Ok(ConditionalSpec { entries, else_branch })
    }

    pub fn validate(&self, data: &Value) -> Result<ValidationResult, SchemaError> {
        self.build()?.validate(data)
    }

    pub async fn validate_async(&self, data: &Value) -> Result<(), SchemaError> {
        self.build()?.validate_async(data).await
    }

    pub fn assert(&self, data: &Value) -> Result<(), SchemaError> {
        self.build()?.assert(data)
    }

    pub fn check(&self, data: &Value) -> bool {
        self.build().is_ok_and(|spec| spec.check(data))
    }

    fn combine(mut self, op: CombineOp, name: &str, predicate: Predicate) -> Self {
        if self.guard_open(name) && self.guard_entry(name) {
            if let Some(entry) = self.entries.last_mut() {
                entry.combined.push(CombinedCondition { op, predicate, message: None });
            }
        }
        self
    }

    fn guard_open(&mut self, call: &str) -> bool {
        if self.error.is_some() {
            return false;
        }
        if self.closed {
            self.fail(&format!("`{call}` after `otherwise`"));
            return false;
        }
        true
    }

    fn guard_entry(&mut self, call: &str) -> bool {
        if self.entries.is_empty() {
            self.fail(&format!("`{call}` requires a preceding `when`"));
            return false;
        }
        true
    }

    fn fail(&mut self, reason: &str) {
        if self.error.is_none() {
            self.error = Some(reason.to_string());
        }
    }
}
