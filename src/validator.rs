//! Walks a compiled tree against a JSON value and collects field errors.
//!
//! One depth-first pass in declaration order. Branch nodes resolve against
//! the enclosing record and hand the selected node back to the same walk, so
//! a branch never reports an error of its own. Async custom validators are
//! recorded in document order during the walk and awaited one by one
//! afterwards.
pub mod leaf;
pub mod path;

use serde_json::{Value, json};

use crate::branch::Branch;
use crate::conditional::{ConditionalSpec, Selection};
use crate::config::RuntimeConfig;
use crate::error::{SchemaError, ValidationError, ValidationResult};
use crate::ir::{AsyncCheck, ConstraintNode, CustomCheck, Shape, json_num_pref_i64};
use crate::messages::{MessageService, Params};

use leaf::Failure;
pub use path::FieldPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Sync,
    Async,
}

struct Deferred {
    path: String,
    label: String,
    key_override: Option<String>,
    check: AsyncCheck,
    value: Value,
}

enum Slot {
    Ready(ValidationError),
    Deferred(Deferred),
}

/// Errors in document order, with async checks left as placeholders.
struct Sink {
    slots: Vec<Slot>,
    abort_early: bool,
    mode: Mode,
}

impl Sink {
    fn new(mode: Mode, abort_early: bool) -> Self {
        Self { slots: Vec::new(), abort_early, mode }
    }

    fn scratch(&self) -> Self {
        Self::new(self.mode, self.abort_early)
    }

    fn has_errors(&self) -> bool {
        self.slots.iter().any(|s| matches!(s, Slot::Ready(_)))
    }

    /// Nothing more is recorded once an abort-early sink holds an error.
    fn is_full(&self) -> bool {
        self.abort_early && self.has_errors()
    }

    fn push(&mut self, error: ValidationError) {
        if !self.is_full() {
            self.slots.push(Slot::Ready(error));
        }
    }

    fn defer(&mut self, deferred: Deferred) {
        if !self.is_full() {
            self.slots.push(Slot::Deferred(deferred));
        }
    }

    fn absorb(&mut self, other: Sink) {
        for slot in other.slots {
            match slot {
                Slot::Ready(e) => self.push(e),
                Slot::Deferred(d) => self.defer(d),
            }
        }
    }

    fn into_errors(self) -> Vec<ValidationError> {
        self.slots
            .into_iter()
            .filter_map(|s| match s {
                Slot::Ready(e) => Some(e),
                Slot::Deferred(_) => None,
            })
            .collect()
    }
}

pub struct Validator<'a> {
    config: &'a RuntimeConfig,
    messages: &'a dyn MessageService,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a RuntimeConfig, messages: &'a dyn MessageService) -> Self {
        Self { config, messages }
    }

    /// Synchronous pass. Fails with `AsyncNotSupported` if any reachable
    /// node carries an async custom validator.
    pub fn validate(&self, node: &ConstraintNode, data: &Value) -> Result<ValidationResult, SchemaError> {
        if let Some(path) = first_async_path(node, &FieldPath::root()) {
            return Err(SchemaError::AsyncNotSupported { path: path.to_string() });
        }
        let mut sink = Sink::new(Mode::Sync, self.config.abort_early);
        self.walk(node, Some(data), None, &FieldPath::root(), &mut sink)?;
        Ok(self.finish(sink.into_errors()))
    }

    pub async fn validate_async(&self, node: &ConstraintNode, data: &Value) -> Result<ValidationResult, SchemaError> {
        let mut sink = Sink::new(Mode::Async, self.config.abort_early);
        self.walk(node, Some(data), None, &FieldPath::root(), &mut sink)?;
        let errors = self.resolve(sink).await;
        Ok(self.finish(errors))
    }

    pub fn validate_conditional(&self, spec: &ConditionalSpec, data: &Value) -> Result<ValidationResult, SchemaError> {
        if let Some(path) = spec.nodes().find_map(|n| first_async_path(n, &FieldPath::root())) {
            return Err(SchemaError::AsyncNotSupported { path: path.to_string() });
        }
        let mut sink = Sink::new(Mode::Sync, self.config.abort_early);
        self.apply(spec.select(data), None, Some(data), None, &FieldPath::root(), &mut sink)?;
        Ok(self.finish(sink.into_errors()))
    }

    pub async fn validate_conditional_async(
        &self,
        spec: &ConditionalSpec,
        data: &Value,
    ) -> Result<ValidationResult, SchemaError> {
        let mut sink = Sink::new(Mode::Async, self.config.abort_early);
        self.apply(spec.select(data), None, Some(data), None, &FieldPath::root(), &mut sink)?;
        let errors = self.resolve(sink).await;
        Ok(self.finish(errors))
    }

    fn finish(&self, errors: Vec<ValidationError>) -> ValidationResult {
        tracing::debug!(errors = errors.len(), "validation finished");
        ValidationResult::from_errors(errors)
    }

    /// Await deferred checks in slot order.
    async fn resolve(&self, sink: Sink) -> Vec<ValidationError> {
        let abort_early = sink.abort_early;
        let mut errors = Vec::new();
        for slot in sink.slots {
            if abort_early && !errors.is_empty() {
                break;
            }
            match slot {
                Slot::Ready(e) => errors.push(e),
                Slot::Deferred(d) => {
                    if let Err(text) = (d.check)(d.value).await {
                        let key = custom_key(d.key_override.as_deref(), &text);
                        let mut params = Params::new();
                        params.insert("label".into(), Value::from(d.label));
                        errors.push(self.error_with(d.path, "custom", &key, params));
                    }
                }
            }
        }
        errors
    }

    // ------------------------------- Walk -------------------------------- //

    /// `record` is the object holding `value`; `None` at the root.
    fn walk(
        &self,
        node: &ConstraintNode,
        value: Option<&Value>,
        record: Option<&Value>,
        path: &FieldPath,
        sink: &mut Sink,
    ) -> Result<(), SchemaError> {
        if sink.is_full() {
            return Ok(());
        }

        if let Shape::Conditional(branch) = &node.shape {
            let context = record.or(value).unwrap_or(&Value::Null);
            let selection = select_branch(branch, context);
            return self.apply(selection, Some(node), value, record, path, sink);
        }

        let present = value.filter(|v| !v.is_null() || accepts_null(node));
        let Some(v) = present else {
            if node.required {
                sink.push(self.error(node, path, "required", "required", Params::new()));
            }
            return Ok(());
        };

        let own_ok = match &node.shape {
            Shape::Union { members } => self.check_union(node, members, v, record, path, sink)?,
            _ => {
                let failures = leaf::check(node, v);
                if failures.first() == Some(&Failure::Type) {
                    sink.push(self.type_error(node, path));
                    return Ok(());
                }
                for failure in &failures {
                    sink.push(self.failure_error(node, path, failure));
                }
                failures.is_empty()
            }
        };

        match (&node.shape, v) {
            (Shape::Object { fields }, Value::Object(map)) => {
                for (name, child) in fields {
                    self.walk(child, map.get(name), Some(v), &path.key(name), sink)?;
                }
                if !self.config.allow_unknown_fields && !fields.is_empty() {
                    for name in map.keys().filter(|k| !fields.contains_key(*k)) {
                        let child_path = path.key(name);
                        let mut params = Params::new();
                        params.insert("label".into(), Value::from(child_path.to_string()));
                        sink.push(self.error_with(child_path.to_string(), "unknown", "unknown", params));
                    }
                }
            }
            (Shape::Array { items: Some(items) }, Value::Array(list)) => {
                for (i, item) in list.iter().enumerate() {
                    self.walk(items, Some(item), record, &path.index(i), sink)?;
                }
            }
            _ => {}
        }

        if own_ok {
            self.run_customs(node, v, path, sink)?;
        }
        Ok(())
    }

    fn apply(
        &self,
        selection: Selection<'_>,
        holder: Option<&ConstraintNode>,
        value: Option<&Value>,
        record: Option<&Value>,
        path: &FieldPath,
        sink: &mut Sink,
    ) -> Result<(), SchemaError> {
        match selection {
            Selection::Pass => Ok(()),
            Selection::Validate(selected) => self.walk(selected, value, record, path, sink),
            Selection::Fail { message } => {
                let label = holder.map_or_else(|| default_label(path), |n| n.display_label(&path.to_string()));
                let mut params = Params::new();
                params.insert("label".into(), Value::from(label));
                sink.push(self.error_with(path.to_string(), "conditional", &message, params));
                Ok(())
            }
        }
    }

    /// First member without errors wins. Otherwise report the first member
    /// whose type fits, or a single type error naming every member.
    fn check_union(
        &self,
        node: &ConstraintNode,
        members: &[ConstraintNode],
        v: &Value,
        record: Option<&Value>,
        path: &FieldPath,
        sink: &mut Sink,
    ) -> Result<bool, SchemaError> {
        let mut fallback: Option<Sink> = None;
        for member in members {
            let mut scratch = sink.scratch();
            self.walk(member, Some(v), record, path, &mut scratch)?;
            if !scratch.has_errors() {
                sink.absorb(scratch);
                return Ok(true);
            }
            if fallback.is_none() && type_fits(member, v) {
                fallback = Some(scratch);
            }
        }
        match fallback {
            Some(scratch) => sink.absorb(scratch),
            None => {
                let types = members.iter().map(describe).collect::<Vec<_>>().join(", ");
                let mut params = Params::new();
                params.insert("types".into(), Value::from(types));
                sink.push(self.error(node, path, "type", "union", params));
            }
        }
        Ok(false)
    }

    fn run_customs(&self, node: &ConstraintNode, v: &Value, path: &FieldPath, sink: &mut Sink) -> Result<(), SchemaError> {
        let key_override = node.meta.messages.get("custom").map(String::as_str);
        for custom in &node.meta.customs {
            if sink.is_full() {
                break;
            }
            match &custom.check {
                CustomCheck::Sync(check) => {
                    if let Err(text) = check(v) {
                        let key = custom_key(key_override, &text);
                        sink.push(self.error(node, path, "custom", &key, Params::new()));
                    }
                }
                CustomCheck::Async(check) => match sink.mode {
                    Mode::Sync => return Err(SchemaError::AsyncNotSupported { path: path.to_string() }),
                    Mode::Async => sink.defer(Deferred {
                        path: path.to_string(),
                        label: node.display_label(&path.to_string()),
                        key_override: key_override.map(str::to_string),
                        check: check.clone(),
                        value: v.clone(),
                    }),
                },
            }
        }
        Ok(())
    }

    // ----------------------------- Rendering ----------------------------- //

    fn type_error(&self, node: &ConstraintNode, path: &FieldPath) -> ValidationError {
        let mut params = Params::new();
        params.insert("type".into(), Value::from(node.base_type.name()));
        self.error(node, path, "type", "type", params)
    }

    fn failure_error(&self, node: &ConstraintNode, path: &FieldPath, failure: &Failure) -> ValidationError {
        let mut params = Params::new();
        match failure {
            Failure::Type => return self.type_error(node, path),
            Failure::Format(format) => {
                params.insert("format".into(), Value::from(format.name()));
                self.error(node, path, "format", "format", params)
            }
            Failure::Enum => {
                let allowed = node.enum_values.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                params.insert("allowed".into(), Value::from(allowed));
                params.insert("values".into(), Value::Array(node.enum_values.iter().map(|l| l.to_json()).collect()));
                self.error(node, path, "enum", "enum", params)
            }
            Failure::Clause { measure, violation } => {
                params.insert("limit".into(), json_num_pref_i64(violation.limit()));
                if matches!(violation.keyword(), "min" | "max") {
                    params.insert("exclusive".into(), json!(violation.exclusive()));
                }
                let key = format!("{}.{}", leaf::measure_prefix(*measure), violation.rule());
                self.error(node, path, violation.keyword(), &key, params)
            }
            Failure::Pattern => {
                if let Some(p) = &node.pattern {
                    params.insert("pattern".into(), Value::from(p.as_str()));
                }
                self.error(node, path, "pattern", "pattern", params)
            }
        }
    }

    /// Node-level message overrides replace `default_key`; `label` is filled in.
    fn error(
        &self,
        node: &ConstraintNode,
        path: &FieldPath,
        keyword: &str,
        default_key: &str,
        mut params: Params,
    ) -> ValidationError {
        let rendered_path = path.to_string();
        let key = match keyword {
            "custom" => default_key,
            _ => node.meta.messages.get(keyword).map_or(default_key, String::as_str),
        };
        params.insert("label".into(), Value::from(node.display_label(&rendered_path)));
        self.error_with(rendered_path, keyword, key, params)
    }

    fn error_with(&self, path: String, keyword: &str, key: &str, params: Params) -> ValidationError {
        let message = self.messages.get_message(key, &params, &self.config.locale);
        let mut params = params;
        params.remove("label");
        ValidationError { path, message, keyword: keyword.to_string(), params }
    }
}

// ------------------------------- Helpers --------------------------------- //

fn select_branch<'n>(branch: &'n Branch, context: &Value) -> Selection<'n> {
    let picked = match branch {
        Branch::Match(m) => m.select(context),
        Branch::If(i) => i.select(context),
        Branch::Conditional(c) => return c.select(context),
    };
    picked.map_or(Selection::Pass, Selection::Validate)
}

fn accepts_null(node: &ConstraintNode) -> bool {
    match &node.shape {
        Shape::Union { members } => members.iter().any(accepts_null),
        _ => node.base_type.accepts_null(),
    }
}

fn type_fits(node: &ConstraintNode, v: &Value) -> bool {
    match &node.shape {
        Shape::Union { members } => members.iter().any(|m| type_fits(m, v)),
        Shape::Conditional(_) => true,
        _ => node.base_type.matches_json(v),
    }
}

fn describe(node: &ConstraintNode) -> String {
    match &node.shape {
        Shape::Union { members } => members.iter().map(describe).collect::<Vec<_>>().join(" | "),
        _ => node.base_type.name().to_string(),
    }
}

fn default_label(path: &FieldPath) -> String {
    if path.is_root() { "value".to_string() } else { path.to_string() }
}

/// An explicit `custom` override wins over the validator's own text; an
/// empty text falls back to the generic key.
fn custom_key(key_override: Option<&str>, text: &str) -> String {
    match key_override {
        Some(k) => k.to_string(),
        None if text.is_empty() => "custom".to_string(),
        None => text.to_string(),
    }
}

fn first_async_path(node: &ConstraintNode, path: &FieldPath) -> Option<FieldPath> {
    if node.meta.customs.iter().any(|c| matches!(c.check, CustomCheck::Async(_))) {
        return Some(path.clone());
    }
    match &node.shape {
        Shape::Primitive => None,
        Shape::Object { fields } => fields.iter().find_map(|(k, f)| first_async_path(f, &path.key(k))),
        Shape::Array { items } => items.as_deref().and_then(|i| first_async_path(i, &path.items())),
        Shape::Union { members } => members.iter().find_map(|m| first_async_path(m, path)),
        Shape::Conditional(branch) => branch.nodes().find_map(|n| first_async_path(n, path)),
    }
}
