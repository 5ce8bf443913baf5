//! Compiled schema bundled with its runtime configuration.
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::RuntimeConfig;
use crate::error::{SchemaError, ValidationResult};
use crate::grammar::Compiler;
use crate::ir::ConstraintNode;
use crate::messages::{Catalog, MessageService};
use crate::spec::SchemaSpec;
use crate::validator::Validator;

/// Cheap to clone; the tree is shared.
#[derive(Clone)]
pub struct Schema {
    root: Arc<ConstraintNode>,
    config: Arc<RuntimeConfig>,
    catalog: Arc<Catalog>,
    /// Replaces `catalog` when set.
    messages: Option<Arc<dyn MessageService>>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("custom_messages", &self.messages.is_some())
            .finish()
    }
}

impl Schema {
    pub fn compile(spec: impl Into<SchemaSpec>) -> Result<Self, SchemaError> {
        Self::compile_with(&Compiler::default(), spec)
    }

    pub fn compile_with(compiler: &Compiler, spec: impl Into<SchemaSpec>) -> Result<Self, SchemaError> {
        Ok(Self::from_node(compiler.compile(spec)?))
    }

    pub fn from_node(node: impl Into<Arc<ConstraintNode>>) -> Self {
        let config = RuntimeConfig::default();
        Self {
            root: node.into(),
            catalog: Arc::new(Catalog::from_config(&config)),
            config: Arc::new(config),
            messages: None,
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.catalog = Arc::new(Catalog::from_config(&config));
        self.config = Arc::new(config);
        self
    }

    pub fn with_messages(mut self, messages: Arc<dyn MessageService>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn node(&self) -> &ConstraintNode {
        &self.root
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Collects every failure. `Err` only for `AsyncNotSupported`.
    pub fn validate(&self, data: &Value) -> Result<ValidationResult, SchemaError> {
        self.validator().validate(&self.root, data)
    }

    /// Runs async custom validators too; failures come back as
    /// `SchemaError::Validation`.
    pub async fn validate_async(&self, data: &Value) -> Result<(), SchemaError> {
        self.validator().validate_async(&self.root, data).await?.into_result()
    }

    pub fn assert(&self, data: &Value) -> Result<(), SchemaError> {
        self.validate(data)?.into_result()
    }

    pub fn check(&self, data: &Value) -> bool {
        self.validate(data).is_ok_and(|r| r.valid)
    }

    pub fn to_json_schema(&self) -> Value {
        crate::json_schema::emit_schema(&self.root)
    }

    fn validator(&self) -> Validator<'_> {
        let messages: &dyn MessageService = match &self.messages {
            Some(m) => m.as_ref(),
            None => self.catalog.as_ref(),
        };
        Validator::new(&self.config, messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Params;
    use serde_json::json;

    struct Shouting;

    impl MessageService for Shouting {
        fn get_message(&self, key: &str, _params: &Params, _locale: &str) -> String {
            key.to_uppercase()
        }
    }

    #[test]
    fn assert_and_check_agree_with_validate() {
        let schema = Schema::compile(json!({"username": "string:3-32!", "age": "number:18-120"})).unwrap();
        let ok = json!({"username": "alice", "age": 30});
        let bad = json!({"username": "al", "age": 10});
        assert!(schema.check(&ok));
        assert!(schema.assert(&ok).is_ok());
        assert!(!schema.check(&bad));
        let err = schema.assert(&bad).unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert_eq!(err.errors()[0].path, "username");
        assert_eq!(err.errors()[1].path, "age");
    }

    #[test]
    fn validation_does_not_mutate_the_tree() {
        let schema = Schema::compile("string:3-32!").unwrap();
        let before = schema.node().clone();
        for v in [json!("ok-value"), json!(1), json!(null)] {
            let _ = schema.validate(&v);
        }
        assert_eq!(schema.node(), &before);
    }

    #[test]
    fn custom_message_service_replaces_catalog() {
        let schema = Schema::compile("string!").unwrap().with_messages(Arc::new(Shouting));
        let r = schema.validate(&json!(null)).unwrap();
        assert_eq!(r.errors[0].message, "REQUIRED");
    }

    #[test]
    fn config_locale_applies() {
        let schema = Schema::compile(json!({"email": "email!"}))
            .unwrap()
            .with_config(RuntimeConfig::default().with_locale("zh-CN"));
        let r = schema.validate(&json!({})).unwrap();
        assert_eq!(r.errors[0].message, "email不能为空");
    }
}
