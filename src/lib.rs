//! Compact validation DSL: `"string:3-32!"`, `"array:1-10<string:1-20>"`,
//! object literals, `match` / `if` branches and function-based conditional
//! chains, compiled to an immutable constraint tree and validated against
//! `serde_json::Value`s.
//!
//! ```ignore
//! use schema_dsl::{Schema, match_field};
//! use serde_json::json;
//!
//! let schema = Schema::compile(json!({
//!     "username": "string:3-32!",
//!     "age": "number:18-120",
//!     "tags": "array:1-10<string:1-20>",
//! }))?;
//! assert!(schema.check(&json!({"username": "alice"})));
//! ```
pub mod branch;
pub mod builder;
pub mod cache;
pub mod conditional;
pub mod config;
pub mod error;
pub mod grammar;
pub mod ir;
pub mod json_schema;
pub mod messages;
pub mod path_de;
pub mod registry;
pub mod schema;
pub mod spec;
pub mod validator;

pub use builder::{FieldBuilder, Reusable, field, reusable};
pub use cache::CompileCache;
pub use conditional::{ConditionalBuilder, ConditionalSpec, when};
pub use config::RuntimeConfig;
pub use error::{SchemaError, ValidationError, ValidationResult};
pub use grammar::{Compiler, compile};
pub use ir::ConstraintNode;
pub use messages::{Catalog, MessageService};
pub use registry::{PluginRegistry, TypeRegistry};
pub use schema::Schema;
pub use spec::{SchemaSpec, if_field, match_field};
