//! In-memory collection store for development and tests
//!
//! Documents live in insertion order (`indexmap`) and queries are
//! evaluated locally with [`Query::apply`]. Ids are generated like the
//! hosted store does: opaque 32-character strings.

use crate::core::document::Document;
use crate::core::error::{AppResult, EntityError, StorageError};
use crate::core::query::Query;
use crate::core::service::{
    CollectionService, dedupe_by_id, from_fields, merge_checked, patch_fields, to_fields,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

type Fields = Map<String, Value>;
type CollectionMap = HashMap<String, IndexMap<String, Fields>>;

/// Shared in-memory store holding every collection
///
/// Cheap to clone; clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<CollectionMap>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed accessor for the collection of `T`
    pub fn collection<T: Document>(&self) -> InMemoryCollection<T> {
        InMemoryCollection {
            store: self.clone(),
            _marker: PhantomData,
        }
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.read()
            .map(|c| c.get(collection).map_or(0, IndexMap::len))
            .unwrap_or(0)
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, CollectionMap>> {
        self.collections.read().map_err(|e| {
            StorageError::LockPoisoned {
                message: e.to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, CollectionMap>> {
        self.collections.write().map_err(|e| {
            StorageError::LockPoisoned {
                message: e.to_string(),
            }
            .into()
        })
    }

    fn generate_id() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// [`CollectionService`] over one collection of an [`InMemoryStore`]
pub struct InMemoryCollection<T> {
    store: InMemoryStore,
    _marker: PhantomData<T>,
}

impl<T> Clone for InMemoryCollection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Document> CollectionService<T> for InMemoryCollection<T> {
    async fn fetch_all(&self) -> AppResult<Vec<T>> {
        let collections = self.store.read()?;
        let documents = collections
            .get(T::collection())
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| from_fields(id, fields.clone()))
                    .collect::<AppResult<Vec<T>>>()
            })
            .transpose()?
            .unwrap_or_default();
        tracing::debug!(collection = T::collection(), count = documents.len(), "fetched collection");
        Ok(dedupe_by_id(documents))
    }

    async fn fetch_one(&self, id: &str) -> AppResult<Option<T>> {
        let collections = self.store.read()?;
        collections
            .get(T::collection())
            .and_then(|docs| docs.get(id))
            .map(|fields| from_fields(id, fields.clone()))
            .transpose()
    }

    async fn add(&self, document: T) -> AppResult<T> {
        let fields = to_fields(&document)?;
        let id = InMemoryStore::generate_id();
        self.store
            .write()?
            .entry(T::collection().to_string())
            .or_default()
            .insert(id.clone(), fields.clone());
        tracing::debug!(collection = T::collection(), %id, "document added");
        from_fields(&id, fields)
    }

    async fn set(&self, id: &str, document: T) -> AppResult<T> {
        let fields = to_fields(&document)?;
        self.store
            .write()?
            .entry(T::collection().to_string())
            .or_default()
            .insert(id.to_string(), fields.clone());
        tracing::debug!(collection = T::collection(), %id, "document set");
        from_fields(id, fields)
    }

    async fn update(&self, id: &str, patch: Value) -> AppResult<T> {
        let patch = patch_fields(patch)?;
        let updated = {
            let mut collections = self.store.write()?;
            let stored = collections
                .get_mut(T::collection())
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| EntityError::not_found(T::singular(), id))?;
            let (merged, updated) = merge_checked::<T>(id, stored, &patch)?;
            *stored = merged;
            updated
        };
        tracing::debug!(collection = T::collection(), %id, "document updated");
        Ok(updated)
    }

    async fn remove(&self, id: &str) -> AppResult<()> {
        let removed = self
            .store
            .write()?
            .get_mut(T::collection())
            .and_then(|docs| docs.shift_remove(id))
            .is_some();
        tracing::debug!(collection = T::collection(), %id, removed, "document removed");
        Ok(())
    }

    async fn query(&self, query: &Query) -> AppResult<Vec<T>> {
        let snapshot: Vec<(String, Value)> = {
            let collections = self.store.read()?;
            collections
                .get(T::collection())
                .map(|docs| {
                    docs.iter()
                        .map(|(id, fields)| (id.clone(), Value::Object(fields.clone())))
                        .collect()
                })
                .unwrap_or_default()
        };
        query
            .apply(snapshot)
            .into_iter()
            .map(|(id, value)| match value {
                Value::Object(fields) => from_fields(&id, fields),
                _ => from_fields(&id, Map::new()),
            })
            .collect()
    }
}
