//! Locale-aware message lookup with `{{#param}}` interpolation.
//!
//! Keys that are not in any catalog come back verbatim (after interpolation),
//! so a literal message such as `"NOT_FOUND"` passes straight through.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::config::{DEFAULT_LOCALE, RuntimeConfig};

pub type Params = Map<String, Value>;

pub trait MessageService: Send + Sync {
    fn get_message(&self, key: &str, params: &Params, locale: &str) -> String;
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{#(\w+)\}\}").unwrap());

const EN_US: &[(&str, &str)] = &[
    ("required", "{{#label}} is required"),
    ("type", "{{#label}} must be of type {{#type}}"),
    ("union", "{{#label}} must match one of the types [{{#types}}]"),
    ("enum", "{{#label}} must be one of [{{#allowed}}]"),
    ("pattern", "{{#label}} does not match the required pattern"),
    ("format", "{{#label}} must be a valid {{#format}}"),
    ("unknown", "{{#label}} is not allowed"),
    ("custom", "{{#label}} failed custom validation"),
    ("conditional", "{{#label}} failed a conditional check"),
    ("string.min", "{{#label}} length must be at least {{#limit}}"),
    ("string.max", "{{#label}} length must be at most {{#limit}}"),
    ("string.gt", "{{#label}} length must be greater than {{#limit}}"),
    ("string.lt", "{{#label}} length must be less than {{#limit}}"),
    ("string.length", "{{#label}} length must be exactly {{#limit}}"),
    ("number.min", "{{#label}} must be greater than or equal to {{#limit}}"),
    ("number.max", "{{#label}} must be less than or equal to {{#limit}}"),
    ("number.gt", "{{#label}} must be greater than {{#limit}}"),
    ("number.lt", "{{#label}} must be less than {{#limit}}"),
    ("number.equal", "{{#label}} must be equal to {{#limit}}"),
    ("array.min", "{{#label}} must contain at least {{#limit}} items"),
    ("array.max", "{{#label}} must contain at most {{#limit}} items"),
    ("array.gt", "{{#label}} must contain more than {{#limit}} items"),
    ("array.lt", "{{#label}} must contain fewer than {{#limit}} items"),
    ("array.length", "{{#label}} must contain exactly {{#limit}} items"),
    ("object.min", "{{#label}} must have at least {{#limit}} properties"),
    ("object.max", "{{#label}} must have at most {{#limit}} properties"),
    ("object.gt", "{{#label}} must have more than {{#limit}} properties"),
    ("object.lt", "{{#label}} must have fewer than {{#limit}} properties"),
    ("object.length", "{{#label}} must have exactly {{#limit}} properties"),
];

const ZH_CN: &[(&str, &str)] = &[
    ("required", "{{#label}}不能为空"),
    ("type", "{{#label}}必须是{{#type}}类型"),
    ("union", "{{#label}}必须匹配以下类型之一 [{{#types}}]"),
    ("enum", "{{#label}}必须是以下值之一 [{{#allowed}}]"),
    ("pattern", "{{#label}}格式不正确"),
    ("format", "{{#label}}必须是有效的{{#format}}"),
    ("unknown", "{{#label}}是不允许的字段"),
    ("custom", "{{#label}}未通过自定义校验"),
    ("conditional", "{{#label}}未通过条件校验"),
    ("string.min", "{{#label}}长度不能少于{{#limit}}个字符"),
    ("string.max", "{{#label}}长度不能超过{{#limit}}个字符"),
    ("string.gt", "{{#label}}长度必须大于{{#limit}}"),
    ("string.lt", "{{#label}}长度必须小于{{#limit}}"),
    ("string.length", "{{#label}}长度必须是{{#limit}}个字符"),
    ("number.min", "{{#label}}不能小于{{#limit}}"),
    ("number.max", "{{#label}}不能大于{{#limit}}"),
    ("number.gt", "{{#label}}必须大于{{#limit}}"),
    ("number.lt", "{{#label}}必须小于{{#limit}}"),
    ("number.equal", "{{#label}}必须等于{{#limit}}"),
    ("array.min", "{{#label}}至少需要{{#limit}}项"),
    ("array.max", "{{#label}}最多允许{{#limit}}项"),
    ("array.gt", "{{#label}}必须多于{{#limit}}项"),
    ("array.lt", "{{#label}}必须少于{{#limit}}项"),
    ("array.length", "{{#label}}必须正好{{#limit}}项"),
    ("object.min", "{{#label}}至少需要{{#limit}}个属性"),
    ("object.max", "{{#label}}最多允许{{#limit}}个属性"),
    ("object.gt", "{{#label}}必须多于{{#limit}}个属性"),
    ("object.lt", "{{#label}}必须少于{{#limit}}个属性"),
    ("object.length", "{{#label}}必须正好{{#limit}}个属性"),
];

/// Built-in catalog plus per-locale overrides.
#[derive(Debug, Clone)]
pub struct Catalog {
    locales: IndexMap<String, IndexMap<String, String>>,
}

impl Default for Catalog {
    fn default() -> Self {
        let mut locales = IndexMap::new();
        for (locale, table) in [("en-US", EN_US), ("zh-CN", ZH_CN)] {
            let map = table.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
            locales.insert(locale.to_string(), map);
        }
        Self { locales }
    }
}

impl Catalog {
    /// Built-in catalog with `config.messages` layered on top.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let mut catalog = Self::default();
        for (locale, table) in &config.messages {
            for (key, template) in table {
                catalog = catalog.with_message(locale, key, template);
            }
        }
        catalog
    }

    pub fn with_message(mut self, locale: &str, key: &str, template: &str) -> Self {
        self.locales
            .entry(locale.to_string())
            .or_default()
            .insert(key.to_string(), template.to_string());
        self
    }

    fn lookup(&self, key: &str, locale: &str) -> Option<&str> {
        self.locales
            .get(locale)
            .and_then(|t| t.get(key))
            .or_else(|| self.locales.get(DEFAULT_LOCALE).and_then(|t| t.get(key)))
            .map(String::as_str)
    }
}

impl MessageService for Catalog {
    fn get_message(&self, key: &str, params: &Params, locale: &str) -> String {
        let template = self.lookup(key, locale).unwrap_or(key);
        interpolate(template, params)
    }
}

/// Replace every `{{#name}}` with the param's text; unknown names are left as-is.
pub fn interpolate(template: &str, params: &Params) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| match params.get(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: Value) -> Params {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn interpolates_label_and_limit() {
        let c = Catalog::default();
        let msg = c.get_message("string.min", &params(json!({"label": "username", "limit": 3})), "en-US");
        assert_eq!(msg, "username length must be at least 3");
    }

    #[test]
    fn missing_key_returns_verbatim() {
        let c = Catalog::default();
        assert_eq!(c.get_message("NOT_FOUND", &Params::new(), "en-US"), "NOT_FOUND");
        assert_eq!(
            c.get_message("{{#label}} is odd", &params(json!({"label": "n"})), "en-US"),
            "n is odd"
        );
    }

    #[test]
    fn unknown_locale_falls_back_to_default() {
        let c = Catalog::default();
        let msg = c.get_message("required", &params(json!({"label": "email"})), "fr-FR");
        assert_eq!(msg, "email is required");
        let zh = c.get_message("required", &params(json!({"label": "邮箱"})), "zh-CN");
        assert_eq!(zh, "邮箱不能为空");
    }

    #[test]
    fn config_overrides_win() {
        let cfg = RuntimeConfig::default().with_message("en-US", "required", "{{#label}} missing");
        let c = Catalog::from_config(&cfg);
        let msg = c.get_message("required", &params(json!({"label": "x"})), "en-US");
        assert_eq!(msg, "x missing");
    }
}
