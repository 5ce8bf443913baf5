//! Constraint clause after the `:`: range, comparison, or bare max.
use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;
use regex::Regex;

use crate::error::SchemaError;
use crate::ir::{Bound, Constraint, Measure};

pub(super) static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").unwrap());
static RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d+(?:\.\d+)?)?-(-?\d+(?:\.\d+)?)?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Gte,
    Lte,
    Gt,
    Lt,
    Eq,
}

// two-char operators first so `>=` never reads as `>` + `=5`
const OPERATORS: &[(&str, Op)] = &[(">=", Op::Gte), ("<=", Op::Lte), (">", Op::Gt), ("<", Op::Lt), ("=", Op::Eq)];

pub fn parse(src: &str, measure: Measure, path: &str) -> Result<Constraint, SchemaError> {
    let src = src.trim();
    if src.is_empty() {
        return Err(SchemaError::grammar(path, src, "empty constraint clause"));
    }

    if let Some((rest, op)) = OPERATORS.iter().find_map(|(tok, op)| src.strip_prefix(*tok).map(|r| (r, *op))) {
        let bound = number(rest.trim(), measure, path)?;
        if op == Op::Lt && measure != Measure::Value && bound.0 == 0.0 {
            return Err(SchemaError::grammar(path, src, "no length is below zero"));
        }
        return Ok(match op {
            Op::Gte => Constraint::Gte(bound),
            Op::Lte => Constraint::Lte(bound),
            Op::Gt => Constraint::Gt(bound),
            Op::Lt => Constraint::Lt(bound),
            Op::Eq if measure == Measure::Value => Constraint::Eq(bound),
            Op::Eq => Constraint::ExactLength(bound.0 as u64),
        });
    }

    if let Some(caps) = RANGE.captures(src) {
        let min = caps.get(1).map(|m| number(m.as_str(), measure, path)).transpose()?;
        let max = caps.get(2).map(|m| number(m.as_str(), measure, path)).transpose()?;
        if min.is_none() && max.is_none() {
            return Err(SchemaError::grammar(path, src, "range needs at least one bound"));
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(SchemaError::grammar(path, src, "range minimum exceeds maximum"));
            }
        }
        return Ok(Constraint::Range { min, max });
    }

    if NUMBER.is_match(src) {
        let max = number(src, measure, path)?;
        return Ok(Constraint::Range { min: None, max: Some(max) });
    }

    let reason = if src.matches('-').count() > 1 {
        "more than one range separator"
    } else {
        "malformed constraint clause"
    };
    Err(SchemaError::grammar(path, src, reason))
}

/// Length-like measures only take non-negative integers.
fn number(tok: &str, measure: Measure, path: &str) -> Result<Bound, SchemaError> {
    if !NUMBER.is_match(tok) {
        return Err(SchemaError::grammar(path, tok, "expected a number"));
    }
    let n: f64 = tok
        .parse()
        .map_err(|_| SchemaError::grammar(path, tok, "expected a number"))?;
    if measure != Measure::Value && (n < 0.0 || n.fract() != 0.0) {
        return Err(SchemaError::grammar(path, tok, "length bounds must be non-negative integers"));
    }
    Ok(OrderedFloat(n))
}
