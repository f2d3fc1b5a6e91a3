//! Supabase (PostgREST) source backend.
//!
//! Reads tables through `GET {url}/rest/v1/{table}`, authenticating with the
//! project key in both the `apikey` and bearer headers. PostgREST caps
//! responses at its configured max rows, which may be below the requested
//! `limit`, so tables are paged with `limit`/`offset` ordered by the primary
//! key until a page comes back empty.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::store::traits::SourceStore;

/// Supabase REST client scoped to one project.
#[derive(Clone)]
pub struct SupabaseSource {
    client: reqwest::Client,
    url: String,
    key: String,
    page_size: usize,
    order_by: String,
}

impl SupabaseSource {
    /// Creates a client for the project at `url`.
    ///
    /// `order_by` must be a column present in every table read (normally the
    /// primary key) so pagination is stable.
    pub fn new(
        url: &str,
        key: &str,
        page_size: usize,
        order_by: &str,
    ) -> Result<Self, AppError> {
        if page_size == 0 {
            return Err(AppError::Validation("page_size must be positive".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            page_size,
            order_by: order_by.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    async fn fetch_page(&self, table: &str, offset: usize) -> Result<Vec<JsonValue>, AppError> {
        let response = self
            .client
            .get(self.table_url(table))
            .query(&[
                ("select", "*".to_string()),
                ("order", format!("{}.asc", self.order_by)),
                ("limit", self.page_size.to_string()),
                ("offset", offset.to_string()),
            ])
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Store { status, message });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SourceStore for SupabaseSource {
    async fn select_all(&self, table: &str) -> Result<Vec<JsonValue>, AppError> {
        let mut rows = Vec::new();
        loop {
            // A short page only means the server capped it
            let page = self.fetch_page(table, rows.len()).await?;
            if page.is_empty() {
                break;
            }
            tracing::debug!("Fetched {} rows from {} (offset {})", page.len(), table, rows.len());
            rows.extend(page);
        }
        Ok(rows)
    }
}
