use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    /// Malformed DSL string; fails compilation.
    #[error("grammar error at `{}`: {reason} (near `{token}`)", display_path(.path))]
    Grammar { path: String, token: String, reason: String },

    #[error("unknown type `{name}` at `{}`", display_path(.path))]
    UnknownType { path: String, name: String },

    /// Conditional builder called out of order.
    #[error("conditional sequence error: {0}")]
    Sequence(String),

    #[error("{0}")]
    Validation(ValidationFailure),

    /// An async custom validator reached the synchronous entry point.
    #[error("custom validator at `{}` is asynchronous; use validate_async", display_path(.path))]
    AsyncNotSupported { path: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SchemaError {
    pub(crate) fn grammar(path: &str, token: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Grammar {
            path: path.to_string(),
            token: token.into(),
            reason: reason.into(),
        }
    }

    pub fn is_compile_time(&self) -> bool {
        matches!(
            self,
            SchemaError::Grammar { .. } | SchemaError::UnknownType { .. } | SchemaError::Sequence(_)
        )
    }

    /// Field-level failures, if this is a validation error.
    pub fn errors(&self) -> &[ValidationError] {
        match self {
            SchemaError::Validation(failure) => &failure.errors,
            _ => &[],
        }
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

// --------------------------- Validation errors --------------------------- //

/// One field-level failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
    pub keyword: String,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub params: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self { valid: errors.is_empty(), errors }
    }

    pub fn into_result(self) -> Result<(), SchemaError> {
        if self.valid {
            Ok(())
        } else {
            Err(SchemaError::Validation(ValidationFailure { errors: self.errors }))
        }
    }
}

/// The full error list behind a thrown validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub errors: Vec<ValidationError>,
}

impl ValidationFailure {
    /// Message of the first failure.
    pub fn message(&self) -> &str {
        self.errors.first().map(|e| e.message.as_str()).unwrap_or("validation failed")
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("validation failed");
        }
        let joined = self.errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ");
        f.write_str(&joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(msg: &str) -> ValidationError {
        ValidationError {
            path: "a".into(),
            message: msg.into(),
            keyword: "custom".into(),
            params: serde_json::Map::new(),
        }
    }

    #[test]
    fn failure_displays_joined_messages() {
        let single = SchemaError::Validation(ValidationFailure { errors: vec![err("NOT_FOUND")] });
        assert_eq!(single.to_string(), "NOT_FOUND");
        let many = ValidationFailure { errors: vec![err("a"), err("b")] };
        assert_eq!(many.to_string(), "a; b");
        assert_eq!(many.message(), "a");
    }

    #[test]
    fn grammar_error_names_token_and_path() {
        let e = SchemaError::grammar("user.age", "3-4-5", "more than one range separator");
        let s = e.to_string();
        assert!(s.contains("user.age"));
        assert!(s.contains("3-4-5"));
        assert!(e.is_compile_time());
    }

    #[test]
    fn result_converts_to_thrown_error() {
        assert!(ValidationResult::from_errors(vec![]).into_result().is_ok());
        let e = ValidationResult::from_errors(vec![err("x")]).into_result().unwrap_err();
        assert_eq!(e.errors().len(), 1);
    }
}
