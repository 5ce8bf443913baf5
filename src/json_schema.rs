//! JSON Schema–ish export of a compiled tree.
//!
//! Branches have no faithful JSON Schema form and are emitted as `x-`
//! extensions.
use serde_json::{Map, Value, json};

use crate::branch::Branch;
use crate::ir::{BaseType, Constraint, ConstraintNode, Measure, Shape, json_num_pref_i64};

pub fn emit_schema(node: &ConstraintNode) -> Value {
    let mut o = match &node.shape {
        Shape::Union { members } => json!({ "anyOf": members.iter().map(emit_schema).collect::<Vec<_>>() }),
        Shape::Conditional(branch) => emit_branch(branch),
        _ => emit_typed(node),
    };

    if let Some(label) = &node.meta.label {
        o["title"] = Value::from(label.clone());
    }
    if let Some(text) = &node.meta.description {
        o["description"] = Value::from(text.clone());
    }
    o
}

fn emit_typed(node: &ConstraintNode) -> Value {
    let mut o = Map::new();
    match node.base_type {
        BaseType::Any => {}
        BaseType::Format(format) => {
            o.insert("type".into(), Value::from("string"));
            if let Some(name) = format.json_schema_format() {
                o.insert("format".into(), Value::from(name));
            }
            if let Some(rx) = format.json_schema_pattern() {
                o.insert("pattern".into(), Value::from(rx));
            }
        }
        other => {
            o.insert("type".into(), Value::from(other.name()));
        }
    }

    if node.is_enum() {
        o.insert("enum".into(), Value::Array(node.enum_values.iter().map(|l| l.to_json()).collect()));
    }
    if let (Some(c), Some(measure)) = (node.constraint, node.base_type.measure()) {
        emit_constraint(&mut o, c, measure);
    }
    if let Some(p) = &node.pattern {
        o.insert("pattern".into(), Value::from(p.as_str()));
    }

    match &node.shape {
        Shape::Object { fields } if !fields.is_empty() => {
            let mut props = Map::new();
            let mut required: Vec<Value> = Vec::new();
            for (k, f) in fields {
                props.insert(k.clone(), emit_schema(f));
                if f.required {
                    required.push(Value::from(k.clone()));
                }
            }
            o.insert("properties".into(), Value::Object(props));
            if !required.is_empty() {
                o.insert("required".into(), Value::Array(required));
            }
        }
        Shape::Array { items: Some(items) } => {
            o.insert("items".into(), emit_schema(items));
        }
        _ => {}
    }
    Value::Object(o)
}

fn emit_constraint(o: &mut Map<String, Value>, c: Constraint, measure: Measure) {
    let (min_key, max_key) = match measure {
        Measure::Length => ("minLength", "maxLength"),
        Measure::Items => ("minItems", "maxItems"),
        Measure::Properties => ("minProperties", "maxProperties"),
        Measure::Value => ("minimum", "maximum"),
    };
    let counted = measure != Measure::Value;
    let mut put = |k: &str, n: f64| {
        o.insert(k.to_string(), json_num_pref_i64(n));
    };

    match c {
        Constraint::Range { min, max } => {
            if let Some(min) = min {
                put(min_key, min.0);
            }
            if let Some(max) = max {
                put(max_key, max.0);
            }
        }
        Constraint::Gte(b) => put(min_key, b.0),
        Constraint::Lte(b) => put(max_key, b.0),
        // counts are integral, so strict bounds shift by one
        Constraint::Gt(b) if counted => put(min_key, b.0 + 1.0),
        Constraint::Lt(b) if counted => put(max_key, (b.0 - 1.0).max(0.0)),
        Constraint::Gt(b) => put("exclusiveMinimum", b.0),
        Constraint::Lt(b) => put("exclusiveMaximum", b.0),
        Constraint::Eq(b) if counted => {
            put(min_key, b.0);
            put(max_key, b.0);
        }
        Constraint::Eq(b) => put("const", b.0),
        Constraint::ExactLength(n) => {
            put(min_key, n as f64);
            put(max_key, n as f64);
        }
    }
}

fn emit_branch(branch: &Branch) -> Value {
    match branch {
        Branch::Match(m) => {
            let cases: Map<String, Value> = m.cases.iter().map(|(k, n)| (k.clone(), emit_schema(n))).collect();
            json!({ "x-match": m.ref_path, "x-cases": cases })
        }
        Branch::If(i) => {
            let mut o = json!({ "x-if": i.field, "then": emit_schema(&i.then) });
            if let Some(otherwise) = &i.otherwise {
                o["else"] = emit_schema(otherwise);
            }
            o
        }
        Branch::Conditional(c) => {
            let arms: Vec<Value> = c.nodes().map(emit_schema).collect();
            let mut o = json!({ "x-conditional": true });
            if !arms.is_empty() {
                o["anyOf"] = Value::Array(arms);
            }
            o
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::field;
    use crate::grammar::compile;
    use crate::spec::match_field;

    #[test]
    fn object_with_required_fields() {
        let node = compile(json!({
            "username": "string:3-32!",
            "age": "integer:>=18",
            "tags": "array:1-10<string:1-20>"
        }))
        .unwrap();
        let s = emit_schema(&node);
        assert_eq!(s["type"], "object");
        assert_eq!(s["required"], json!(["username"]));
        assert_eq!(s["properties"]["username"], json!({"type": "string", "minLength": 3, "maxLength": 32}));
        assert_eq!(s["properties"]["age"], json!({"type": "integer", "minimum": 18}));
        assert_eq!(s["properties"]["tags"]["minItems"], 1);
        assert_eq!(s["properties"]["tags"]["items"]["maxLength"], 20);
    }

    #[test]
    fn comparisons_and_enums() {
        assert_eq!(emit_schema(&compile("number:>0").unwrap()), json!({"type": "number", "exclusiveMinimum": 0}));
        assert_eq!(emit_schema(&compile("number:=100").unwrap()), json!({"type": "number", "const": 100}));
        assert_eq!(emit_schema(&compile("string:>2").unwrap()), json!({"type": "string", "minLength": 3}));
        assert_eq!(
            emit_schema(&compile("active|inactive").unwrap()),
            json!({"type": "string", "enum": ["active", "inactive"]})
        );
    }

    #[test]
    fn formats_unions_and_metadata() {
        let s = emit_schema(&compile(field("email!").label("Email").description("login")).unwrap());
        assert_eq!(s["format"], "email");
        assert_eq!(s["title"], "Email");
        assert_eq!(s["description"], "login");
        let u = emit_schema(&compile("types:string|number").unwrap());
        assert_eq!(u["anyOf"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn branches_use_extensions() {
        let node = compile(match_field("kind", [("a", "string"), ("_default", "number")])).unwrap();
        let s = emit_schema(&node);
        assert_eq!(s["x-match"], "kind");
        assert_eq!(s["x-cases"]["a"]["type"], "string");
    }
}
