//! Process-wide memo of record layouts.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::debug;

use super::{Record, RecordLayout};
use crate::error::Result;

type Erased = Arc<dyn Any + Send + Sync>;

/// Read-mostly table of [`RecordLayout`]s keyed by record type.
///
/// Lookups take the shared lock. A miss takes the exclusive lock and checks
/// again before computing, so concurrent first uses of a type resolve its
/// layout exactly once.
#[derive(Default)]
pub struct MetadataCache {
    layouts: RwLock<HashMap<TypeId, Erased>>,
}

static GLOBAL: OnceLock<Arc<MetadataCache>> = OnceLock::new();

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared instance used when no cache is injected.
    pub fn global() -> Arc<MetadataCache> {
        GLOBAL.get_or_init(|| Arc::new(MetadataCache::new())).clone()
    }

    /// Returns the layout of `T`, computing and caching it on first use.
    pub fn resolve<T: Record>(&self) -> Result<Arc<RecordLayout<T>>> {
        let id = TypeId::of::<T>();
        {
            let layouts = self.layouts.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = layouts.get(&id).and_then(downcast::<T>) {
                return Ok(hit);
            }
        }

        let mut layouts = self.layouts.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = layouts.get(&id).and_then(downcast::<T>) {
            return Ok(hit);
        }
        let layout = Arc::new(RecordLayout::<T>::build()?);
        debug!(
            record = type_name::<T>(),
            fields = layout.fields().len(),
            "resolved record layout"
        );
        layouts.insert(id, layout.clone());
        Ok(layout)
    }

    pub fn contains<T: Record>(&self) -> bool {
        self.layouts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.layouts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached layout.
    pub fn reset(&self) {
        let mut layouts = self.layouts.write().unwrap_or_else(PoisonError::into_inner);
        debug!(entries = layouts.len(), "metadata cache reset");
        layouts.clear();
    }
}

impl std::fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCache")
            .field("entries", &self.len())
            .finish()
    }
}

fn downcast<T: Record>(entry: &Erased) -> Option<Arc<RecordLayout<T>>> {
    Arc::clone(entry).downcast::<RecordLayout<T>>().ok()
}
