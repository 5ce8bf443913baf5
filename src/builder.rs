//! Chained field builder and reusable schema fragments.
//!
//! Every call returns a new value; nothing is shared with the receiver, so a
//! base builder can be extended in several directions.
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::error::SchemaError;
use crate::grammar::Compiler;
use crate::ir::{BaseType, ConstraintNode, CustomCheck, CustomValidator, Kind, Pattern};
use crate::spec::SchemaSpec;

#[derive(Debug, Clone)]
pub struct FieldBuilder {
    base: String,
    label: Option<String>,
    description: Option<String>,
    pattern: Option<String>,
    messages: IndexMap<String, String>,
    customs: Vec<CustomValidator>,
    required: Option<bool>,
}

/// Start a builder from a DSL string.
pub fn field(base: impl Into<String>) -> FieldBuilder {
    FieldBuilder {
        base: base.into(),
        label: None,
        description: None,
        pattern: None,
        messages: IndexMap::new(),
        customs: Vec::new(),
        required: None,
    }
}

impl FieldBuilder {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn pattern(mut self, regex: impl Into<String>) -> Self {
        self.pattern = Some(regex.into());
        self
    }

    /// Replace the message for `keyword` (`required`, `min`, `pattern`, ...).
    /// `text` is looked up as a message key first and used verbatim otherwise.
    pub fn message(mut self, keyword: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.insert(keyword.into(), text.into());
        self
    }

    pub fn messages<I, K, V>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.messages.extend(messages.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// `Err(text)` fails the field; `text` goes through message lookup.
    pub fn custom<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.customs.push(CustomValidator { check: CustomCheck::Sync(Arc::new(check)) });
        self
    }

    /// Only usable through the async validation entry points.
    pub fn custom_async<F, Fut>(mut self, check: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let check = CustomCheck::Async(Arc::new(move |v| check(v).boxed()));
        self.customs.push(CustomValidator { check });
        self
    }

    pub fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = Some(false);
        self
    }

    pub(crate) fn compile(&self, compiler: &Compiler, path: &str) -> Result<ConstraintNode, SchemaError> {
        let mut node = compiler.compile_at(&SchemaSpec::Dsl(self.base.clone()), path)?;
        if let Some(src) = &self.pattern {
            if !matches!(node.base_type, BaseType::String | BaseType::Format(_) | BaseType::Any) {
                return Err(SchemaError::grammar(path, src, format!("`{}` cannot take a pattern", node.base_type)));
            }
            if node.kind() != Kind::Primitive {
                return Err(SchemaError::grammar(path, src, "only primitive types take a pattern"));
            }
            let regex = Regex::new(src).map_err(|e| SchemaError::grammar(path, src, e.to_string()))?;
            node.pattern = Some(Pattern(regex));
        }
        if let Some(required) = self.required {
            node.required = required;
        }
        if self.label.is_some() {
            node.meta.label = self.label.clone();
        }
        if self.description.is_some() {
            node.meta.description = self.description.clone();
        }
        node.meta.messages.extend(self.messages.iter().map(|(k, v)| (k.clone(), v.clone())));
        node.meta.customs.extend(self.customs.iter().cloned());
        Ok(node)
    }
}

// ------------------------------- Reusable -------------------------------- //

/// Factory producing a fresh spec per use.
#[derive(Clone)]
pub struct Reusable {
    factory: Arc<dyn Fn() -> SchemaSpec + Send + Sync>,
}

impl Reusable {
    pub fn spec(&self) -> SchemaSpec {
        (self.factory)()
    }
}

impl fmt::Debug for Reusable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reusable(..)")
    }
}

pub fn reusable<F, S>(factory: F) -> Reusable
where
    F: Fn() -> S + Send + Sync + 'static,
    S: Into<SchemaSpec>,
{
    Reusable { factory: Arc::new(move || factory().into()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Constraint;

    #[test]
    fn builder_metadata_lands_on_node() {
        let b = field("string:3-32")
            .label("Username")
            .pattern("^[a-z]+$")
            .message("pattern", "lowercase only")
            .required();
        let node = Compiler::default().compile(b).unwrap();
        assert!(node.required);
        assert_eq!(node.meta.label.as_deref(), Some("Username"));
        assert_eq!(node.meta.messages["pattern"], "lowercase only");
        assert!(node.pattern.as_ref().is_some_and(|p| p.is_match("abc")));
        assert!(matches!(node.constraint, Some(Constraint::Range { .. })));
    }

    #[test]
    fn builders_do_not_share_state() {
        let base = field("string").label("Name");
        let a = base.clone().custom(|_| Ok(()));
        let b = base.clone().required();
        let c = Compiler::default();
        assert_eq!(c.compile(base).unwrap().meta.customs.len(), 0);
        assert_eq!(c.compile(a).unwrap().meta.customs.len(), 1);
        assert!(c.compile(b).unwrap().required);
    }

    #[test]
    fn bad_patterns_fail_compilation() {
        let c = Compiler::default();
        assert!(matches!(c.compile(field("string").pattern("(")), Err(SchemaError::Grammar { .. })));
        assert!(matches!(c.compile(field("number").pattern("^1$")), Err(SchemaError::Grammar { .. })));
    }

    #[test]
    fn unions_reject_patterns() {
        let c = Compiler::default();
        let err = c.compile(field("types:string|number").pattern("^a")).unwrap_err();
        assert!(matches!(err, SchemaError::Grammar { .. }));
        assert!(c.compile(field("any").pattern("^a")).is_ok());
    }

    #[test]
    fn reusable_yields_fresh_specs() {
        let email = reusable(|| field("email!").label("Email"));
        let c = Compiler::default();
        let a = c.compile(&email).unwrap();
        let b = c.compile(&email).unwrap();
        assert_eq!(a, b);
        assert!(a.required);
    }
}
