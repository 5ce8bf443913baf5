use serde_json::Value;

use super::{Action, CombineOp, ConditionEntry, ConditionalSpec, ElseBranch};
use crate::ir::ConstraintNode;

/// Outcome of running a conditional chain against one value.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'a> {
    /// A `message` entry triggered.
    Fail { message: String },
    /// Validate the value against this branch.
    Validate(&'a ConstraintNode),
    /// Nothing to check.
    Pass,
}

/// Message key used when a throwing entry somehow has no text.
pub const FALLBACK_MESSAGE: &str = "conditional";

#[derive(Debug, PartialEq)]
enum EntryOutcome {
    NotTriggered,
    Triggered { message: Option<String> },
}

pub(crate) fn select<'a>(spec: &'a ConditionalSpec, data: &Value) -> Selection<'a> {
    for (idx, entry) in spec.entries.iter().enumerate() {
        let EntryOutcome::Triggered { message } = evaluate_entry(entry, data) else {
            continue;
        };
        tracing::trace!(entry = idx, chain_check = uses_chain_check(entry), "conditional entry triggered");
        if entry.action == Some(Action::Throw) {
            let message = message
                .or_else(|| entry.message.clone())
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
            return Selection::Fail { message };
        }
        return match &entry.then {
            Some(node) => Selection::Validate(node),
            None => Selection::Pass,
        };
    }
    tracing::trace!("no conditional entry triggered");
    match &spec.else_branch {
        ElseBranch::Schema(node) => Selection::Validate(node),
        ElseBranch::Null | ElseBranch::Undefined => Selection::Pass,
    }
}

/// Chain-check mode needs exactly: a throwing entry, a message on the root
/// condition, at least one `and`, and no `or`.
fn uses_chain_check<S>(entry: &ConditionEntry<S>) -> bool {
    let root_has_message = entry.combined.first().is_some_and(|c| c.message.is_some());
    let has_and = entry.combined.iter().any(|c| c.op == CombineOp::And);
    let has_or = entry.combined.iter().any(|c| c.op == CombineOp::Or);
    entry.action == Some(Action::Throw) && root_has_message && has_and && !has_or
}

fn evaluate_entry<S>(entry: &ConditionEntry<S>, data: &Value) -> EntryOutcome {
    if uses_chain_check(entry) {
        chain_check(entry, data)
    } else {
        traditional(entry, data)
    }
}

/// The first condition that holds wins, with its own message.
fn chain_check<S>(entry: &ConditionEntry<S>, data: &Value) -> EntryOutcome {
    entry
        .combined
        .iter()
        .find(|c| c.predicate.eval(data))
        .map(|c| EntryOutcome::Triggered {
            message: c.message.clone().or_else(|| entry.message.clone()),
        })
        .unwrap_or(EntryOutcome::NotTriggered)
}

/// `(root AND every and) OR any or`.
fn traditional<S>(entry: &ConditionEntry<S>, data: &Value) -> EntryOutcome {
    let mut result = entry
        .combined
        .iter()
        .filter(|c| c.op != CombineOp::Or)
        .all(|c| c.predicate.eval(data));
    let mut message = None;
    if !result {
        // the `or` that flips the result supplies the message
        if let Some(hit) = entry
            .combined
            .iter()
            .filter(|c| c.op == CombineOp::Or)
            .find(|c| c.predicate.eval(data))
        {
            result = true;
            message = hit.message.clone();
        }
    }
    if !result {
        return EntryOutcome::NotTriggered;
    }
    EntryOutcome::Triggered { message: message.or_else(|| entry.message.clone()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditional::when;
    use crate::ir::BaseType;
    use serde_json::json;

    fn balance_below_100(d: &Value) -> Option<bool> {
        d.get("balance")?.as_f64().map(|b| b < 100.0)
    }

    #[test]
    fn chain_check_first_true_condition_wins() {
        let spec = when(|d| d.is_null())
            .message("NOT_FOUND")
            .and(balance_below_100)
            .message("LOW")
            .build()
            .unwrap();
        assert!(uses_chain_check(&spec.entries[0]));
        assert_eq!(select(&spec, &Value::Null), Selection::Fail { message: "NOT_FOUND".into() });
        assert_eq!(select(&spec, &json!({"balance": 50})), Selection::Fail { message: "LOW".into() });
        assert_eq!(select(&spec, &json!({"balance": 150})), Selection::Pass);
    }

    #[test]
    fn chain_check_falls_back_to_entry_message() {
        // `and` without its own message reports the entry fallback, which is
        // the root's message here
        let spec = when(|d| d.is_null()).message("NOT_FOUND").and(|d| d["locked"] == json!(true)).build().unwrap();
        assert_eq!(
            select(&spec, &json!({"locked": true})),
            Selection::Fail { message: "NOT_FOUND".into() }
        );
    }

    #[test]
    fn or_disables_chain_check() {
        let spec = when(|d| d["a"] == json!(1))
            .message("A")
            .and(|d| d["b"] == json!(1))
            .or(|d| d["c"] == json!(1))
            .message("C")
            .build()
            .unwrap();
        assert!(!uses_chain_check(&spec.entries[0]));
        // a && b holds: fallback message, which the last `message` call set
        assert_eq!(select(&spec, &json!({"a": 1, "b": 1})), Selection::Fail { message: "C".into() });
        // only a: AND part fails and no `or` holds
        assert_eq!(select(&spec, &json!({"a": 1})), Selection::Pass);
        // or flips the result and brings its own message
        assert_eq!(select(&spec, &json!({"c": 1})), Selection::Fail { message: "C".into() });
    }

    #[test]
    fn traditional_and_requires_all() {
        let spec = when(|d| d["age"].as_i64().map(|a| a < 18))
            .and(|d| d["country"] == json!("US"))
            .message("MINOR_US")
            .build()
            .unwrap();
        // root has no message -> traditional mode
        assert!(!uses_chain_check(&spec.entries[0]));
        assert_eq!(
            select(&spec, &json!({"age": 16, "country": "US"})),
            Selection::Fail { message: "MINOR_US".into() }
        );
        assert_eq!(select(&spec, &json!({"age": 16, "country": "FR"})), Selection::Pass);
    }

    #[test]
    fn or_message_wins_when_it_flips_the_result() {
        let spec = when(|d| d["role"] == json!("admin"))
            .message("ADMIN")
            .or(|d| d["role"] == json!("root"))
            .message("ROOT")
            .build()
            .unwrap();
        assert_eq!(select(&spec, &json!({"role": "root"})), Selection::Fail { message: "ROOT".into() });
        // root condition true: entry fallback is the last message set
        assert_eq!(select(&spec, &json!({"role": "admin"})), Selection::Fail { message: "ROOT".into() });
    }

    #[test]
    fn then_else_selection_stops_at_first_entry() {
        let spec = when(|d| d["kind"] == json!("a"))
            .then("string")
            .else_when(|d| d["kind"].is_string())
            .then("number")
            .otherwise("boolean")
            .build()
            .unwrap();
        let pick = |v: Value| match select(&spec, &v) {
            Selection::Validate(n) => Some(n.base_type),
            _ => None,
        };
        assert_eq!(pick(json!({"kind": "a"})), Some(BaseType::String));
        assert_eq!(pick(json!({"kind": "b"})), Some(BaseType::Number));
        assert_eq!(pick(json!({"kind": 1})), Some(BaseType::Boolean));
    }

    #[test]
    fn failing_predicates_count_as_false() {
        let spec = when(|_| -> anyhow::Result<bool> { anyhow::bail!("boom") })
            .message("never")
            .build()
            .unwrap();
        assert_eq!(select(&spec, &json!({})), Selection::Pass);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let spec = when(|d| d.is_null()).message("NOT_FOUND").and(balance_below_100).message("LOW").build().unwrap();
        let data = json!({"balance": 10});
        let first = select(&spec, &data);
        for _ in 0..5 {
            assert_eq!(select(&spec, &data), first);
        }
    }
}
