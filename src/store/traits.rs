//! Core traits for store abstraction.
//!
//! - [`SourceStore`] - Read side of the migration (relational rows)
//! - [`DocumentStore`] - Target document database

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::store::value::{Document, FieldValue, Fields};

/// Reads whole tables from the relational source.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Returns every row of `table` as a JSON object.
    ///
    /// A failure here means the table could not be enumerated at all; callers
    /// treat it as scoped to that table.
    async fn select_all(&self, table: &str) -> Result<Vec<JsonValue>, AppError>;
}

/// A document database organised in named collections.
///
/// Every operation is a single awaited request; implementations do not
/// batch or retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns all documents in a collection.
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, AppError>;

    /// Fetches a document by id, `None` if it does not exist.
    async fn get_document(&self, collection: &str, id: &str)
        -> Result<Option<Document>, AppError>;

    /// Creates or fully overwrites the document with the given id.
    async fn set_document(&self, collection: &str, doc: &Document) -> Result<(), AppError>;

    /// Updates only the named fields of an existing document.
    ///
    /// Fails with [`AppError::DocumentNotFound`] if the document is missing.
    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<(), AppError>;

    /// Returns documents whose `field` equals `value`.
    ///
    /// The default performs a full scan; backends with server-side filtering
    /// override it.
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<Vec<Document>, AppError> {
        let docs = self.list_documents(collection).await?;
        Ok(docs
            .into_iter()
            .filter(|doc| doc.get(field) == Some(value))
            .collect())
    }
}
