//! Backend implementations for the source and target stores.
//!
//! | Backend | Module | Implements |
//! |---------|--------|------------|
//! | Supabase REST (PostgREST) | [`supabase`] | `SourceStore` |
//! | PostgreSQL (direct) | [`postgres`] | `SourceStore` |
//! | Cloud Firestore REST | [`firestore`] | `DocumentStore` |
//! | In-memory | [`memory`] | both |

pub mod firestore;
pub mod memory;
pub mod postgres;
pub mod supabase;

use std::sync::Arc;

use crate::config::{SourceConfig, TargetConfig};
use crate::error::AppError;
use crate::store::traits::{DocumentStore, SourceStore};

/// Builds the source backend: a direct connection when `postgres_uri` is set,
/// otherwise Supabase REST.
pub fn connect_source(
    config: &SourceConfig,
    primary_key: &str,
) -> Result<Arc<dyn SourceStore>, AppError> {
    if let Some(uri) = &config.postgres_uri {
        tracing::info!("Using direct PostgreSQL source");
        return Ok(Arc::new(postgres::PostgresSource::connect(uri)?));
    }

    match (&config.url, &config.key) {
        (Some(url), Some(key)) => {
            tracing::info!("Using Supabase REST source at {}", url);
            Ok(Arc::new(supabase::SupabaseSource::new(
                url,
                key,
                config.page_size,
                primary_key,
            )?))
        }
        _ => Err(AppError::Validation(
            "source requires either postgres_uri or both url and key".to_string(),
        )),
    }
}

/// Builds the Firestore target backend.
pub fn connect_target(config: &TargetConfig) -> Result<Arc<dyn DocumentStore>, AppError> {
    tracing::info!(
        "Using Firestore project '{}' (database {}) at {}",
        config.project_id,
        config.database,
        config.base_url
    );
    Ok(Arc::new(firestore::FirestoreStore::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_source_requires_credentials() {
        let config = SourceConfig {
            url: Some("https://abcd.supabase.co".to_string()),
            key: None,
            postgres_uri: None,
            page_size: 1000,
        };
        assert!(connect_source(&config, "id").is_err());
    }

    #[test]
    fn test_connect_source_prefers_postgres() {
        let config = SourceConfig {
            url: None,
            key: None,
            postgres_uri: Some("postgresql://postgres:pw@localhost:5432/postgres".to_string()),
            page_size: 1000,
        };
        assert!(connect_source(&config, "id").is_ok());
    }
}
