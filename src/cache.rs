//! LRU + TTL cache of compiled trees, keyed by the raw DSL literal or a
//! caller-supplied key. A miss only costs a recompile.
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::ir::ConstraintNode;

pub const DEFAULT_CAPACITY: usize = 512;

struct Entry {
    node: Arc<ConstraintNode>,
    inserted: Instant,
}

pub struct CompileCache {
    entries: Mutex<LruCache<String, Entry>>,
    ttl: Option<Duration>,
}

impl Default for CompileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, None)
    }
}

impl CompileCache {
    /// A zero `capacity` is treated as one.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<ConstraintNode>> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if self.ttl.is_some_and(|ttl| entry.inserted.elapsed() > ttl) {
            entries.pop(key);
            tracing::debug!(key, "compile cache entry expired");
            return None;
        }
        Some(entry.node.clone())
    }

    pub fn insert(&self, key: impl Into<String>, node: Arc<ConstraintNode>) {
        self.entries.lock().put(key.into(), Entry { node, inserted: Instant::now() });
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
