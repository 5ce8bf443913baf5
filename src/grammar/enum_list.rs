//! `a|b|c` bodies and their literal coercion.
use ordered_float::OrderedFloat;

use super::clause::NUMBER;
use crate::error::SchemaError;
use crate::ir::{BaseType, Literal};

/// Requested member type. `Auto` coerces only when every member agrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumHint {
    Auto,
    String,
    Number,
    Integer,
    Boolean,
}

impl EnumHint {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" | "str" => EnumHint::String,
            "number" => EnumHint::Number,
            "integer" | "int" => EnumHint::Integer,
            "boolean" | "bool" => EnumHint::Boolean,
            _ => return None,
        })
    }

    pub fn for_base(base: BaseType) -> Option<Self> {
        match base {
            BaseType::String | BaseType::Format(_) => Some(EnumHint::String),
            BaseType::Number => Some(EnumHint::Number),
            BaseType::Integer => Some(EnumHint::Integer),
            BaseType::Boolean => Some(EnumHint::Boolean),
            _ => None,
        }
    }
}

pub fn parse(body: &str, hint: EnumHint, path: &str) -> Result<(BaseType, Vec<Literal>), SchemaError> {
    let members: Vec<&str> = body.split('|').map(str::trim).collect();
    if members.len() < 2 {
        return Err(SchemaError::grammar(path, body, "enum needs at least two members"));
    }
    for m in &members {
        if m.is_empty() {
            return Err(SchemaError::grammar(path, body, "empty enum member"));
        }
        if m.contains(['<', '>', '=']) {
            return Err(SchemaError::grammar(path, *m, "comparison operator inside an enum"));
        }
    }

    let hint = match hint {
        EnumHint::Auto if members.iter().all(|m| matches!(*m, "true" | "false")) => EnumHint::Boolean,
        EnumHint::Auto if members.iter().all(|m| NUMBER.is_match(m)) => EnumHint::Number,
        EnumHint::Auto => EnumHint::String,
        other => other,
    };

    let literals = members
        .iter()
        .map(|m| coerce(m, hint, path))
        .collect::<Result<Vec<_>, _>>()?;
    let base = match hint {
        EnumHint::Boolean => BaseType::Boolean,
        EnumHint::Number => BaseType::Number,
        EnumHint::Integer => BaseType::Integer,
        EnumHint::String | EnumHint::Auto => BaseType::String,
    };
    Ok((base, literals))
}

fn coerce(member: &str, hint: EnumHint, path: &str) -> Result<Literal, SchemaError> {
    match hint {
        EnumHint::String | EnumHint::Auto => Ok(Literal::String(member.to_string())),
        EnumHint::Boolean => match member {
            "true" => Ok(Literal::Boolean(true)),
            "false" => Ok(Literal::Boolean(false)),
            _ => Err(SchemaError::grammar(path, member, "not a boolean enum member")),
        },
        EnumHint::Number | EnumHint::Integer => {
            let n = NUMBER
                .is_match(member)
                .then(|| member.parse::<f64>().ok())
                .flatten()
                .ok_or_else(|| SchemaError::grammar(path, member, "not a numeric enum member"))?;
            if hint == EnumHint::Integer && n.fract() != 0.0 {
                return Err(SchemaError::grammar(path, member, "not an integer enum member"));
            }
            Ok(Literal::Number(OrderedFloat(n)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_coerces_only_uniform_members() {
        let (t, v) = parse("true|false", EnumHint::Auto, "f").unwrap();
        assert_eq!(t, BaseType::Boolean);
        assert_eq!(v, vec![Literal::Boolean(true), Literal::Boolean(false)]);

        let (t, _) = parse("1|2|3", EnumHint::Auto, "f").unwrap();
        assert_eq!(t, BaseType::Number);

        let (t, v) = parse("true|1|x", EnumHint::Auto, "f").unwrap();
        assert_eq!(t, BaseType::String);
        assert_eq!(v[0], Literal::String("true".into()));
    }

    #[test]
    fn hinted_coercion_fails_on_bad_member() {
        assert!(parse("true|false|maybe", EnumHint::Boolean, "f").is_err());
        assert!(parse("1|two", EnumHint::Number, "f").is_err());
        assert!(parse("1|2.5", EnumHint::Integer, "f").is_err());
        assert!(parse("1|2.5", EnumHint::Number, "f").is_ok());
    }

    #[test]
    fn string_hint_keeps_text() {
        let (t, v) = parse("1|2", EnumHint::String, "f").unwrap();
        assert_eq!(t, BaseType::String);
        assert_eq!(v[1], Literal::String("2".into()));
    }

    #[test]
    fn conflicting_modifiers_are_rejected() {
        assert!(parse("a|>5", EnumHint::Auto, "f").is_err());
        assert!(parse("a||b", EnumHint::Auto, "f").is_err());
        assert!(parse("a", EnumHint::Auto, "f").is_err());
    }
}
