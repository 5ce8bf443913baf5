//! Plugin type names that the grammar compiler does not know natively.
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::ir::ConstraintNode;

pub trait TypeRegistry: Send + Sync {
    fn has(&self, name: &str) -> bool;
    fn resolve(&self, name: &str) -> Option<ConstraintNode>;
}

#[derive(Clone)]
enum Registration {
    Static(ConstraintNode),
    Factory(Arc<dyn Fn() -> ConstraintNode + Send + Sync>),
}

/// In-memory registry. Factories run on every resolve, so a registered type
/// can change shape between compilations.
#[derive(Default)]
pub struct PluginRegistry {
    types: RwLock<IndexMap<String, Registration>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, node: ConstraintNode) {
        let name = name.into();
        tracing::debug!(%name, "registering plugin type");
        self.types.write().insert(name, Registration::Static(node));
    }

    pub fn register_factory<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> ConstraintNode + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(%name, "registering plugin type factory");
        self.types.write().insert(name, Registration::Factory(Arc::new(factory)));
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.types.write().shift_remove(name).is_some()
    }
}

impl TypeRegistry for PluginRegistry {
    fn has(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }

    fn resolve(&self, name: &str) -> Option<ConstraintNode> {
        // clone out of the lock before running a factory
        let registration = self.types.read().get(name).cloned()?;
        Some(match registration {
            Registration::Static(node) => node,
            Registration::Factory(factory) => factory(),
        })
    }
}
