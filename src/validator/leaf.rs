//! A node's own checks, independent of children and custom validators.
use serde_json::Value;

use crate::ir::{ConstraintNode, Format, Measure, Violation};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Failure {
    /// Wrong JSON type; nothing else is checked.
    Type,
    Format(Format),
    Enum,
    Clause { measure: Measure, violation: Violation },
    Pattern,
}

/// Checks in order: type, format, enum, clause, pattern.
pub(super) fn check(node: &ConstraintNode, v: &Value) -> Vec<Failure> {
    if !node.base_type.matches_json(v) {
        return vec![Failure::Type];
    }
    let mut failures = Vec::new();
    if let (crate::ir::BaseType::Format(format), Value::String(s)) = (node.base_type, v) {
        if !format.check(s) {
            failures.push(Failure::Format(format));
        }
    }
    if node.is_enum() && !node.enum_values.iter().any(|lit| lit.matches(v)) {
        failures.push(Failure::Enum);
    }
    if let (Some(constraint), Some(measure)) = (node.constraint, node.base_type.measure()) {
        if let Some(measured) = measure_of(measure, v) {
            if let Some(violation) = constraint.check(measured) {
                failures.push(Failure::Clause { measure, violation });
            }
        }
    }
    if let (Some(pattern), Value::String(s)) = (&node.pattern, v) {
        if !pattern.is_match(s) {
            failures.push(Failure::Pattern);
        }
    }
    failures
}

/// Character count, item count, property count or the number itself.
pub(super) fn measure_of(measure: Measure, v: &Value) -> Option<f64> {
    match (measure, v) {
        (Measure::Length, Value::String(s)) => Some(s.chars().count() as f64),
        (Measure::Items, Value::Array(a)) => Some(a.len() as f64),
        (Measure::Properties, Value::Object(o)) => Some(o.len() as f64),
        (Measure::Value, Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}

/// Message-key prefix for clause failures.
pub(super) fn measure_prefix(measure: Measure) -> &'static str {
    match measure {
        Measure::Length => "string",
        Measure::Value => "number",
        Measure::Items => "array",
        Measure::Properties => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::compile;
    use serde_json::json;

    #[test]
    fn type_mismatch_short_circuits() {
        let node = compile("email:5-100").unwrap();
        assert_eq!(check(&node, &json!(42)), vec![Failure::Type]);
    }

    #[test]
    fn format_and_length_both_reported() {
        let node = compile("email:20-100").unwrap();
        let failures = check(&node, &json!("nope"));
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0], Failure::Format(Format::Email));
        assert!(matches!(failures[1], Failure::Clause { measure: Measure::Length, .. }));
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        let node = compile("string:2").unwrap();
        assert!(check(&node, &json!("日本")).is_empty());
        assert_eq!(check(&node, &json!("日本語")).len(), 1);
    }

    #[test]
    fn enum_membership_is_strict() {
        let node = compile("1|2|3").unwrap();
        assert!(check(&node, &json!(2)).is_empty());
        assert_eq!(check(&node, &json!(4)), vec![Failure::Enum]);
        assert_eq!(check(&node, &json!("2")), vec![Failure::Type]);
    }
}
