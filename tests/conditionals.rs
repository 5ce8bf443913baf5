use schema_dsl::conditional::{ConditionalBuilder, Selection};
use schema_dsl::{Schema, SchemaError, SchemaSpec, if_field, match_field, when};
use serde_json::{Value, json};

fn balance_below(limit: f64) -> impl Fn(&Value) -> Option<bool> + Send + Sync + 'static {
    move |d| d.get("balance")?.as_f64().map(|b| b < limit)
}

#[test]
fn chain_check_reports_first_failing_condition() {
    let account = when(|d| d.is_null())
        .message("ACCOUNT_NOT_FOUND")
        .and(balance_below(100.0))
        .message("INSUFFICIENT_BALANCE");

    let err = account.assert(&Value::Null).unwrap_err();
    assert_eq!(err.to_string(), "ACCOUNT_NOT_FOUND");

    let err = account.assert(&json!({"balance": 50})).unwrap_err();
    assert_eq!(err.to_string(), "INSUFFICIENT_BALANCE");
    assert_eq!(err.errors()[0].keyword, "conditional");

    assert!(account.assert(&json!({"balance": 150})).is_ok());
    assert!(account.check(&json!({"balance": 150})));
}

#[test]
fn or_message_only_when_or_decides() {
    let spec = when(|d| d["age"].as_i64().map(|a| a < 18))
        .message("TOO_YOUNG")
        .or(|d| d["banned"] == json!(true))
        .message("BANNED")
        .build()
        .unwrap();
    assert_eq!(spec.select(&json!({"age": 30, "banned": true})), Selection::Fail { message: "BANNED".into() });
    assert_eq!(spec.select(&json!({"age": 30, "banned": false})), Selection::Pass);
}

#[test]
fn else_when_chain_selects_schema() {
    let contact = when(|d| d["type"] == json!("email"))
        .then("email!")
        .else_when(|d| d["type"] == json!("phone"))
        .then("string:8-15!")
        .otherwise("string");

    let schema = Schema::compile(SchemaSpec::object([
        ("type", SchemaSpec::from("string!")),
        ("contact", contact.into()),
    ]))
    .unwrap();

    assert!(schema.check(&json!({"type": "email", "contact": "a@example.com"})));
    assert!(!schema.check(&json!({"type": "email", "contact": "not-an-email"})));
    assert!(schema.check(&json!({"type": "phone", "contact": "13800138000"})));
    assert!(!schema.check(&json!({"type": "phone", "contact": "123"})));
    assert!(schema.check(&json!({"type": "fax", "contact": "anything"})));
    let r = schema.validate(&json!({"type": "phone"})).unwrap();
    assert_eq!(r.errors.len(), 1);
    assert_eq!(r.errors[0].path, "contact");
    assert_eq!(r.errors[0].keyword, "required");
}

#[test]
fn field_level_message_uses_field_path() {
    let schema = Schema::compile(SchemaSpec::object([
        ("age", SchemaSpec::from("integer!")),
        (
            "guardian",
            when(|d| d["age"].as_i64().map(|a| a < 18))
                .and(|d| d.get("guardian").is_none())
                .message("GUARDIAN_REQUIRED")
                .into(),
        ),
    ]))
    .unwrap();
    let r = schema.validate(&json!({"age": 12})).unwrap();
    assert_eq!(r.errors.len(), 1);
    assert_eq!(r.errors[0].path, "guardian");
    assert_eq!(r.errors[0].message, "GUARDIAN_REQUIRED");
    assert!(schema.check(&json!({"age": 12, "guardian": "mum"})));
    assert!(schema.check(&json!({"age": 30})));
}

#[test]
fn match_default_and_unconstrained_fallthrough() {
    let with_default = Schema::compile(SchemaSpec::object([
        ("kind", SchemaSpec::from("string!")),
        ("value", match_field("kind", [("a", "string!"), ("_default", "number!")])),
    ]))
    .unwrap();
    assert!(with_default.check(&json!({"kind": "a", "value": "x"})));
    assert!(with_default.check(&json!({"kind": "z", "value": 1})));
    assert!(!with_default.check(&json!({"kind": "z", "value": "x"})));

    let without_default = Schema::compile(SchemaSpec::object([
        ("kind", SchemaSpec::from("string!")),
        ("value", match_field("kind", [("a", "string!")])),
    ]))
    .unwrap();
    assert!(without_default.check(&json!({"kind": "z", "value": [1, 2, 3]})));
}

#[test]
fn match_resolves_nested_paths_and_literal_keys() {
    let schema = Schema::compile(SchemaSpec::object([
        ("config", SchemaSpec::from(json!({"engine": "string!", "strict": "boolean"}))),
        ("script", match_field("config.engine", [("v8", "string:1-100!")])),
        ("level", match_field("config.strict", [(true, "integer:1-3!"), (false, "integer")])),
    ]))
    .unwrap();
    assert!(schema.check(&json!({"config": {"engine": "v8", "strict": true}, "script": "x", "level": 2})));
    let r = schema.validate(&json!({"config": {"engine": "v8", "strict": true}})).unwrap();
    let paths: Vec<_> = r.errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["script", "level"]);
}

#[test]
fn branches_never_add_generic_errors() {
    let schema = Schema::compile(SchemaSpec::object([
        ("vip", SchemaSpec::from("any")),
        ("discount", if_field("vip", "number:0-50!", Some("number:=0".into()))),
    ]))
    .unwrap();
    let r = schema.validate(&json!({"vip": true, "discount": 80})).unwrap();
    assert_eq!(r.errors.len(), 1);
    assert_eq!(r.errors[0].keyword, "max");
    assert!(r.errors.iter().all(|e| e.keyword != "if" && e.keyword != "match"));
    assert!(schema.check(&json!({"vip": "yes", "discount": 10})));
    assert!(!schema.check(&json!({"vip": 0, "discount": 10})));
}

#[test]
fn sequence_errors_surface_on_every_entry_point() {
    let bad = ConditionalBuilder::new().and(|_| true).message("x");
    assert!(matches!(bad.build(), Err(SchemaError::Sequence(_))));
    assert!(matches!(bad.validate(&json!({})), Err(SchemaError::Sequence(_))));
    assert!(!bad.check(&json!({})));
    assert!(matches!(Schema::compile(bad), Err(SchemaError::Sequence(_))));
}

#[test]
fn compiled_spec_is_reusable_and_stateless() {
    let spec = when(|d| d["n"].as_i64().map(|n| n > 10)).message("BIG").build().unwrap();
    for _ in 0..3 {
        assert!(spec.check(&json!({"n": 1})));
        assert!(!spec.check(&json!({"n": 11})));
    }
}
