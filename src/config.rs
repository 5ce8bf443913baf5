//! Runtime configuration, threaded explicitly through `Schema` and
//! `ConditionalSpec`. There is no process-wide state to reset between tests.
use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::SchemaError;

pub const DEFAULT_LOCALE: &str = "en-US";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub locale: String,
    /// Stop at the first error instead of collecting all of them.
    pub abort_early: bool,
    pub allow_unknown_fields: bool,
    /// locale -> message key -> template; wins over the built-in catalog
    pub messages: IndexMap<String, IndexMap<String, String>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            abort_early: false,
            allow_unknown_fields: true,
            messages: IndexMap::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json_str(src: &str) -> Result<Self, SchemaError> {
        crate::path_de::from_str_with_path(src)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        crate::path_de::from_value_with_path(value)
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_abort_early(mut self, abort_early: bool) -> Self {
        self.abort_early = abort_early;
        self
    }

    pub fn with_allow_unknown_fields(mut self, allow: bool) -> Self {
        self.allow_unknown_fields = allow;
        self
    }

    pub fn with_message(mut self, locale: &str, key: &str, template: &str) -> Self {
        self.messages
            .entry(locale.to_string())
            .or_default()
            .insert(key.to_string(), template.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = RuntimeConfig::from_json_str(r#"{"locale":"zh-CN"}"#).unwrap();
        assert_eq!(cfg.locale, "zh-CN");
        assert!(!cfg.abort_early);
        assert!(cfg.allow_unknown_fields);
    }

    #[test]
    fn message_overrides_decode() {
        let cfg = RuntimeConfig::from_json_str(
            r#"{"abortEarly": true, "messages": {"en-US": {"required": "{{#label}} missing"}}}"#,
        )
        .unwrap();
        assert!(cfg.abort_early);
        assert_eq!(cfg.messages["en-US"]["required"], "{{#label}} missing");
    }

    #[test]
    fn bad_config_names_json_path() {
        let err = RuntimeConfig::from_json_str(r#"{"abortEarly": "yes"}"#).unwrap_err();
        assert!(matches!(err, SchemaError::Config(_)));
        assert!(err.to_string().contains("abortEarly"));
    }

    #[test]
    fn decodes_from_parsed_value() {
        let cfg = RuntimeConfig::from_json_value(serde_json::json!({"allowUnknownFields": false})).unwrap();
        assert!(!cfg.allow_unknown_fields);
        assert_eq!(cfg.locale, DEFAULT_LOCALE);

        let err = RuntimeConfig::from_json_value(serde_json::json!({"allowUnknownFields": 1})).unwrap_err();
        assert!(matches!(err, SchemaError::Config(_)));
        assert!(err.to_string().contains("allowUnknownFields"));
    }
}
