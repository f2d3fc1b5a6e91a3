//! Cloud Firestore backend over the REST API.
//!
//! # Example
//!
//! ```ignore
//! use folio_migrate::store::backends::firestore::FirestoreStore;
//!
//! let store = FirestoreStore::new(&config.target)?;
//! let profiles = store.list_documents("profile_info").await?;
//! ```
//!
//! Writes use `PATCH` on the document path: without an update mask this
//! creates or replaces the document (upsert); with an update mask plus
//! `currentDocument.exists=true` it touches only the named fields of an
//! existing document.

pub mod codec;

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::config::TargetConfig;
use crate::error::AppError;
use crate::store::traits::DocumentStore;
use crate::store::{Document, FieldValue, Fields};

/// Documents requested per list page.
const LIST_PAGE_SIZE: usize = 300;

/// Firestore REST client scoped to one database.
#[derive(Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    documents_url: Url,
    access_token: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<JsonValue>,
    next_page_token: Option<String>,
}

impl FirestoreStore {
    pub fn new(config: &TargetConfig) -> Result<Self, AppError> {
        if config.project_id.trim().is_empty() {
            return Err(AppError::Validation("target.project_id is empty".to_string()));
        }
        let root = format!(
            "{}/projects/{}/databases/{}/documents",
            config.base_url.trim_end_matches('/'),
            config.project_id,
            config.database
        );
        let documents_url = Url::parse(&root)
            .map_err(|e| AppError::Validation(format!("Invalid Firestore URL '{}': {}", root, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            documents_url,
            access_token: config.access_token.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.documents_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Firestore URL cannot be a base".to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key)]);
        }
        req
    }

    /// Sends a request; `Ok(None)` on 404.
    async fn send(&self, req: RequestBuilder) -> Result<Option<JsonValue>, AppError> {
        let response = req.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Store {
                status: status.as_u16(),
                message,
            });
        }
        Ok(Some(response.json().await?))
    }

    async fn list_page(
        &self,
        collection: &str,
        page_token: Option<&str>,
    ) -> Result<ListResponse, AppError> {
        let mut req = self
            .request(Method::GET, self.url(&[collection])?)
            .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
        if let Some(token) = page_token {
            req = req.query(&[("pageToken", token)]);
        }

        match self.send(req).await? {
            Some(body) => serde_json::from_value(body)
                .map_err(|e| AppError::Codec(format!("list response for '{}': {}", collection, e))),
            // Listing a collection that was never written returns 404 on some emulators.
            None => Ok(ListResponse {
                documents: Vec::new(),
                next_page_token: None,
            }),
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, AppError> {
        // State: Some(token) while pages remain, None once exhausted.
        let pages = futures::stream::try_unfold(Some(None::<String>), |state| async move {
            let Some(token) = state else {
                return Ok(None);
            };
            let page = self.list_page(collection, token.as_deref()).await?;
            let next = page
                .next_page_token
                .filter(|t| !t.is_empty())
                .map(Some);
            Ok::<_, AppError>(Some((page.documents, next)))
        });
        let pages: Vec<Vec<JsonValue>> = pages.try_collect().await?;

        pages
            .iter()
            .flatten()
            .map(codec::decode_document)
            .collect()
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, AppError> {
        let req = self.request(Method::GET, self.url(&[collection, id])?);
        match self.send(req).await? {
            Some(body) => codec::decode_document(&body).map(Some),
            None => Ok(None),
        }
    }

    async fn set_document(&self, collection: &str, doc: &Document) -> Result<(), AppError> {
        let req = self
            .request(Method::PATCH, self.url(&[collection, &doc.id])?)
            .json(&json!({ "fields": codec::encode_fields(&doc.fields) }));

        match self.send(req).await? {
            Some(_) => Ok(()),
            None => Err(AppError::Store {
                status: 404,
                message: format!("database for {}/{} not found", collection, doc.id),
            }),
        }
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<(), AppError> {
        let mut params: Vec<(&str, String)> = fields
            .keys()
            .map(|name| ("updateMask.fieldPaths", codec::field_path(name)))
            .collect();
        params.push(("currentDocument.exists", "true".to_string()));

        let req = self
            .request(Method::PATCH, self.url(&[collection, id])?)
            .query(&params)
            .json(&json!({ "fields": codec::encode_fields(fields) }));

        match self.send(req).await? {
            Some(_) => Ok(()),
            None => Err(AppError::DocumentNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
        }
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<Vec<Document>, AppError> {
        let url = Url::parse(&format!("{}:runQuery", self.documents_url))
            .map_err(|e| AppError::Internal(format!("runQuery URL: {}", e)))?;
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": codec::field_path(field) },
                        "op": "EQUAL",
                        "value": codec::encode_value(value),
                    }
                }
            }
        });

        let response = self
            .send(self.request(Method::POST, url).json(&body))
            .await?
            .unwrap_or(JsonValue::Array(Vec::new()));

        // One element per result plus a trailing readTime-only element.
        let results = response
            .as_array()
            .ok_or_else(|| AppError::Codec("runQuery response is not an array".to_string()))?;
        results
            .iter()
            .filter_map(|item| item.get("document"))
            .map(codec::decode_document)
            .collect()
    }
}
