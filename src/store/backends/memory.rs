//! In-process backends for tests and offline rehearsals.
//!
//! Both stores support fault injection so the continue-on-error paths of the
//! jobs can be exercised without a network.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::store::traits::{DocumentStore, SourceStore};
use crate::store::value::{Document, Fields};

/// Source tables held in memory. Unknown tables fail like a missing relation.
#[derive(Default)]
pub struct MemorySource {
    tables: HashMap<String, Vec<JsonValue>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: &str, rows: Vec<JsonValue>) -> Self {
        self.tables.insert(table.to_string(), rows);
        self
    }
}

#[async_trait]
impl SourceStore for MemorySource {
    async fn select_all(&self, table: &str) -> Result<Vec<JsonValue>, AppError> {
        self.tables.get(table).cloned().ok_or_else(|| AppError::Store {
            status: 404,
            message: format!("relation \"{}\" does not exist", table),
        })
    }
}

/// Document collections held in memory, ordered by id.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<BTreeMap<String, BTreeMap<String, Document>>>,
    failing_writes: RwLock<HashSet<(String, String)>>,
    failing_lists: RwLock<HashSet<String>>,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts documents directly, bypassing fault injection and the write counter.
    pub async fn seed(&self, collection: &str, docs: Vec<Document>) {
        let mut collections = self.collections.write().await;
        let entry = collections.entry(collection.to_string()).or_default();
        for doc in docs {
            entry.insert(doc.id.clone(), doc);
        }
    }

    /// Makes every write to `collection/id` fail.
    pub async fn fail_writes_to(&self, collection: &str, id: &str) {
        self.failing_writes
            .write()
            .await
            .insert((collection.to_string(), id.to_string()));
    }

    /// Makes listing `collection` fail.
    pub async fn fail_listing(&self, collection: &str) {
        self.failing_lists
            .write()
            .await
            .insert(collection.to_string());
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of one collection.
    pub async fn collection(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn check_write(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let key = (collection.to_string(), id.to_string());
        if self.failing_writes.read().await.contains(&key) {
            return Err(AppError::Store {
                status: 503,
                message: format!("injected write failure for {}/{}", collection, id),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, AppError> {
        if self.failing_lists.read().await.contains(collection) {
            return Err(AppError::Store {
                status: 503,
                message: format!("injected list failure for {}", collection),
            });
        }
        Ok(self.collection(collection).await)
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, AppError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set_document(&self, collection: &str, doc: &Document) -> Result<(), AppError> {
        self.check_write(collection, &doc.id).await?;
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id.clone(), doc.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<(), AppError> {
        self.check_write(collection, id).await?;
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| AppError::DocumentNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        for (name, value) in fields {
            doc.fields.insert(name.clone(), value.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
