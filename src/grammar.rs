//! DSL compiler: `type[:body][!]` strings, object literals and builder
//! handles into [`ConstraintNode`] trees.
//!
//! ```text
//! spec   := name [":" body] ["!"]
//! body   := enum | "types:" spec ("|" spec)+ | clause | array
//! array  := "array" [":" clause] ["<" spec ">"]
//! clause := range | (">"|">="|"<"|"<="|"=") number | number
//! ```
//!
//! Compilation is pure. The only state a [`Compiler`] carries is an optional
//! plugin registry and an optional cache, neither of which changes results.
pub mod clause;
pub mod enum_list;
pub mod type_name;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::branch::{self, Branch};
use crate::cache::CompileCache;
use crate::error::SchemaError;
use crate::ir::{ConstraintNode, Measure};
use crate::registry::TypeRegistry;
use crate::spec::SchemaSpec;

use enum_list::EnumHint;

// DSL literals and caller keys share one cache but never collide
const DSL_PREFIX: &str = "dsl:";
const KEYED_PREFIX: &str = "key:";

#[derive(Clone, Default)]
pub struct Compiler {
    registry: Option<Arc<dyn TypeRegistry>>,
    cache: Option<Arc<CompileCache>>,
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("registry", &self.registry.is_some())
            .field("cache", &self.cache.as_ref().map(|c| c.len()))
            .finish()
    }
}

/// Compile with no registry and no cache.
pub fn compile(spec: impl Into<SchemaSpec>) -> Result<ConstraintNode, SchemaError> {
    Compiler::default().compile(spec)
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: Arc<dyn TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_cache(mut self, cache: Arc<CompileCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<CompileCache>> {
        self.cache.as_ref()
    }

    pub fn compile(&self, spec: impl Into<SchemaSpec>) -> Result<ConstraintNode, SchemaError> {
        self.compile_at(&spec.into(), "")
    }

    /// Compile once per `key`; later calls with the same key return the
    /// cached tree without looking at `spec`.
    pub fn compile_keyed(&self, key: &str, spec: impl Into<SchemaSpec>) -> Result<Arc<ConstraintNode>, SchemaError> {
        let cache_key = format!("{KEYED_PREFIX}{key}");
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&cache_key)) {
            tracing::debug!(key, "compile cache hit");
            return Ok(hit);
        }
        let node = Arc::new(self.compile(spec)?);
        if let Some(cache) = &self.cache {
            cache.insert(cache_key, node.clone());
        }
        Ok(node)
    }

    pub(crate) fn compile_at(&self, spec: &SchemaSpec, path: &str) -> Result<ConstraintNode, SchemaError> {
        match spec {
            SchemaSpec::Dsl(src) => self.compile_dsl(src, path),
            SchemaSpec::Object(fields) => {
                let mut compiled = IndexMap::with_capacity(fields.len());
                for (name, field) in fields {
                    compiled.insert(name.clone(), self.compile_at(field, &join_path(path, name))?);
                }
                Ok(ConstraintNode::object(compiled))
            }
            SchemaSpec::Array(items) => {
                let items = self.compile_at(items, &format!("{path}[]"))?;
                Ok(ConstraintNode::array(Some(items)))
            }
            SchemaSpec::Field(builder) => builder.compile(self, path),
            SchemaSpec::Node(node) => Ok(node.clone()),
            SchemaSpec::Match { path: ref_path, cases } => {
                let spec = branch::compile_match(self, ref_path, cases, path)?;
                Ok(ConstraintNode::conditional(Branch::Match(spec)))
            }
            SchemaSpec::IfField { field, then, otherwise } => {
                let spec = branch::compile_if(self, field, then, otherwise.as_deref(), path)?;
                Ok(ConstraintNode::conditional(Branch::If(spec)))
            }
            SchemaSpec::Conditional(builder) => {
                let spec = builder.build_at(self, path)?;
                Ok(ConstraintNode::conditional(Branch::Conditional(Arc::new(spec))))
            }
            SchemaSpec::Unsupported(value) => {
                Err(SchemaError::grammar(path, value.to_string(), "unsupported schema value"))
            }
        }
    }

    /// DSL leaves go through the cache unless a plugin type was involved.
    fn compile_dsl(&self, src: &str, path: &str) -> Result<ConstraintNode, SchemaError> {
        let cache_key = format!("{DSL_PREFIX}{src}");
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&cache_key)) {
            tracing::debug!(src, "compile cache hit");
            return Ok(hit.as_ref().clone());
        }
        let mut parser = DslParser { compiler: self, used_plugin: false };
        let node = parser.parse(src, path)?;
        if let Some(cache) = &self.cache {
            if parser.used_plugin {
                tracing::debug!(src, "plugin type involved; not caching");
            } else {
                cache.insert(cache_key, Arc::new(node.clone()));
            }
        }
        Ok(node)
    }
}

pub(crate) fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

// ------------------------------- Parser ---------------------------------- //

struct DslParser<'c> {
    compiler: &'c Compiler,
    used_plugin: bool,
}

impl DslParser<'_> {
    fn parse(&mut self, src: &str, path: &str) -> Result<ConstraintNode, SchemaError> {
        let trimmed = src.trim();
        if trimmed.is_empty() {
            return Err(SchemaError::grammar(path, src, "empty type specification"));
        }
        let (body, required) = match trimmed.strip_suffix('!') {
            Some(rest) => (rest.trim_end(), true),
            None => (trimmed, false),
        };
        if required && body.ends_with('!') {
            return Err(SchemaError::grammar(path, trimmed, "`!` may appear only once"));
        }
        let mut node = self.parse_body(body, path)?;
        node.required = required;
        Ok(node)
    }

    fn parse_body(&mut self, body: &str, path: &str) -> Result<ConstraintNode, SchemaError> {
        if let Some(rest) = body.strip_prefix("array") {
            if rest.is_empty() || rest.starts_with([':', '<']) {
                return self.parse_array(rest, path);
            }
        }

        let (name, rest) = match body.split_once(':') {
            Some((name, rest)) => (name.trim(), Some(rest.trim())),
            None => (body.trim(), None),
        };

        let Some(rest) = rest else {
            if name.contains('|') {
                return enum_node(name, EnumHint::Auto, path);
            }
            return self.resolve_type(name, path);
        };
        if rest.is_empty() {
            return Err(SchemaError::grammar(path, body, "missing body after `:`"));
        }

        match name {
            "types" => self.parse_union(rest, path),
            "enum" => {
                // optional `enum:<hint>:a|b`
                // an unrecognised prefix is part of the members (`enum:10:00|11:00`)
                let (hint, members) = rest
                    .split_once(':')
                    .and_then(|(h, members)| EnumHint::from_name(h.trim()).map(|hint| (hint, members)))
                    .unwrap_or((EnumHint::Auto, rest));
                enum_node(members, hint, path)
            }
            _ => {
                let mut node = self.resolve_type(name, path)?;
                if rest.contains('|') {
                    let hint = EnumHint::for_base(node.base_type)
                        .ok_or_else(|| SchemaError::grammar(path, body, format!("`{name}` cannot take an enum")))?;
                    let (_, values) = enum_list::parse(rest, hint, path)?;
                    node.enum_values = values;
                } else {
                    let measure = node
                        .base_type
                        .measure()
                        .ok_or_else(|| SchemaError::grammar(path, rest, format!("`{name}` takes no constraint")))?;
                    node.constraint = Some(clause::parse(rest, measure, path)?);
                }
                Ok(node)
            }
        }
    }

    /// `rest` is what follows the `array` keyword: empty, `:clause...` or `<...>`.
    fn parse_array(&mut self, rest: &str, path: &str) -> Result<ConstraintNode, SchemaError> {
        let (clause_src, inner) = match find_nest_open(rest) {
            Some(open) => {
                let inner = rest[open + 1..]
                    .strip_suffix('>')
                    .ok_or_else(|| SchemaError::grammar(path, rest, "unclosed `<`"))?;
                (&rest[..open], Some(inner))
            }
            None => (rest, None),
        };

        let items = match inner {
            Some(inner) => Some(self.parse(inner, &format!("{path}[]"))?),
            None => None,
        };
        let mut node = ConstraintNode::array(items);
        if let Some(clause_src) = clause_src.strip_prefix(':') {
            node.constraint = Some(clause::parse(clause_src, Measure::Items, path)?);
        } else if !clause_src.is_empty() {
            return Err(SchemaError::grammar(path, clause_src, "expected `:` or `<` after `array`"));
        }
        Ok(node)
    }

    fn parse_union(&mut self, rest: &str, path: &str) -> Result<ConstraintNode, SchemaError> {
        let parts = split_top_level(rest, path)?;
        if parts.len() < 2 {
            return Err(SchemaError::grammar(path, rest, "`types:` needs at least two members"));
        }
        let members = parts
            .into_iter()
            .map(|part| self.parse(part, path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ConstraintNode::union(members))
    }

    fn resolve_type(&mut self, name: &str, path: &str) -> Result<ConstraintNode, SchemaError> {
        if let Some(base) = type_name::lookup(name) {
            return Ok(ConstraintNode::new(base));
        }
        if let Some(registry) = &self.compiler.registry {
            if let Some(node) = registry.resolve(name) {
                tracing::debug!(name, "resolved plugin type");
                self.used_plugin = true;
                return Ok(node);
            }
        }
        if name.is_empty() || name.contains(|c: char| c.is_whitespace() || "<>|=".contains(c)) {
            return Err(SchemaError::grammar(path, name, "malformed type name"));
        }
        Err(SchemaError::UnknownType { path: path.to_string(), name: name.to_string() })
    }
}

fn enum_node(body: &str, hint: EnumHint, path: &str) -> Result<ConstraintNode, SchemaError> {
    let (base, values) = enum_list::parse(body, hint, path)?;
    let mut node = ConstraintNode::new(base);
    node.enum_values = values;
    Ok(node)
}

/// `<` and `>` right after a `:` are comparison operators, not nesting.
fn is_operator_at(src: &str, i: usize) -> bool {
    src[..i].ends_with(':')
}

fn find_nest_open(src: &str) -> Option<usize> {
    src.char_indices().find(|&(i, c)| c == '<' && !is_operator_at(src, i)).map(|(i, _)| i)
}

/// Split on `|` outside of `<...>`.
fn split_top_level<'s>(src: &'s str, path: &str) -> Result<Vec<&'s str>, SchemaError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in src.char_indices() {
        match c {
            '<' | '>' if is_operator_at(src, i) => {}
            '<' => depth += 1,
            '>' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| SchemaError::grammar(path, src, "unbalanced `>`"))?;
            }
            '|' if depth == 0 => {
                parts.push(src[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(SchemaError::grammar(path, src, "unclosed `<`"));
    }
    parts.push(src[start..].trim());
    Ok(parts)
}
