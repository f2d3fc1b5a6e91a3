//! Direct PostgreSQL source backend.
//!
//! Connects to the Supabase database itself (or any PostgreSQL copy of it)
//! and reads each table as `jsonb`, so column types come back already mapped
//! to JSON the same way PostgREST would render them.
//!
//! # Example
//!
//! ```ignore
//! use folio_migrate::store::backends::postgres::PostgresSource;
//!
//! let source = PostgresSource::connect("postgresql://postgres:pw@db.abcd.supabase.co:5432/postgres")?;
//! let rows = source.select_all("profile_info").await?;
//! ```

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use serde_json::Value as JsonValue;
use tokio_postgres::NoTls;

use crate::error::AppError;
use crate::store::traits::SourceStore;

/// PostgreSQL source with connection pooling via deadpool-postgres.
///
/// This type is cheap to clone - the underlying connection pool is `Arc`-based.
#[derive(Clone)]
pub struct PostgresSource {
    pool: Pool,
}

impl PostgresSource {
    /// Creates a pooled client. No connection is opened until the first read.
    pub fn connect(connection_string: &str) -> Result<Self, AppError> {
        let pg_config: tokio_postgres::Config = connection_string.parse().map_err(|e| {
            AppError::Validation(format!("Invalid PostgreSQL connection string: {}", e))
        })?;

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
        // Reads are sequential.
        let pool = Pool::builder(mgr)
            .max_size(2)
            .build()
            .map_err(|e| AppError::Pool(format!("Failed to create connection pool: {}", e)))?;

        Ok(Self { pool })
    }

    async fn get_connection(&self) -> Result<Object, AppError> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::Pool(format!("Failed to get connection from pool: {}", e)))
    }
}

/// Quotes a table reference, allowing an optional `schema.` prefix.
pub fn quote_table(table: &str) -> Result<String, AppError> {
    let parts: Vec<&str> = table.split('.').collect();
    if parts.is_empty() || parts.len() > 2 || parts.iter().any(|p| p.is_empty()) {
        return Err(AppError::Validation(format!("Invalid table name: '{}'", table)));
    }
    Ok(parts
        .iter()
        .map(|p| format!("\"{}\"", p.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join("."))
}

#[async_trait]
impl SourceStore for PostgresSource {
    async fn select_all(&self, table: &str) -> Result<Vec<JsonValue>, AppError> {
        let sql = format!("SELECT to_jsonb(t) AS record FROM {} t", quote_table(table)?);
        let conn = self.get_connection().await?;
        let rows = conn.query(sql.as_str(), &[]).await?;

        rows.iter()
            .map(|row| row.try_get::<_, JsonValue>("record").map_err(AppError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_table() {
        assert_eq!(quote_table("skills").unwrap(), "\"skills\"");
        assert_eq!(quote_table("public.skills").unwrap(), "\"public\".\"skills\"");
        assert_eq!(quote_table("we\"ird").unwrap(), "\"we\"\"ird\"");
    }

    #[test]
    fn test_quote_table_rejects_malformed() {
        assert!(quote_table("").is_err());
        assert!(quote_table("a..b").is_err());
        assert!(quote_table("a.b.c").is_err());
    }

    #[test]
    fn test_connect_rejects_bad_uri() {
        assert!(PostgresSource::connect("not a uri ::").is_err());
    }
}
