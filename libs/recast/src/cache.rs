use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, RwLock};

use crate::reflect::TypeDesc;
use crate::schema::{self, RecordSchema};

static GLOBAL: LazyLock<Arc<SchemaCache>> = LazyLock::new(|| Arc::new(SchemaCache::new()));

/// Type → resolved schema table, shared by converters.
///
/// Resolution runs outside the lock, so two threads may resolve the same
/// type at once; the first stored result wins and both callers get it.
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: RwLock<HashMap<TypeId, Arc<RecordSchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by converters that were not given one.
    pub fn global() -> Arc<SchemaCache> {
        Arc::clone(&GLOBAL)
    }

    /// Cached schema for `ty`, resolving it on first use.
    pub fn resolve(&self, ty: TypeDesc) -> Arc<RecordSchema> {
        if let Some(schema) = self.get(ty.id) {
            return schema;
        }
        schema::resolve(self, ty, &mut HashSet::new())
    }

    pub fn get(&self, id: TypeId) -> Option<Arc<RecordSchema>> {
        let guard = match self.schemas.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("schema cache read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.get(&id).cloned()
    }

    /// Store `schema` unless another thread got there first; returns the
    /// stored entry either way.
    pub(crate) fn insert(&self, id: TypeId, schema: Arc<RecordSchema>) -> Arc<RecordSchema> {
        let mut guard = match self.schemas.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("schema cache write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        Arc::clone(guard.entry(id).or_insert(schema))
    }

    pub fn len(&self) -> usize {
        let guard = match self.schemas.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("schema cache read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
