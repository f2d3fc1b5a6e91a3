//! Reference Rewriter: replaces stale owner identifiers in place.
//!
//! Every configured collection is scanned in full. A document whose owner
//! field holds a key of the mapping gets exactly that one field updated to
//! the mapped value; everything else is left untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::config::RemapConfig;
use crate::context::AppStore;
use crate::error::AppError;
use crate::services::report::{summary_table, RecordFailure};
use crate::store::{Document, FieldValue, Fields};

/// Outcome of rewriting one collection.
#[derive(Debug, Clone, Serialize)]
pub struct RemapOutcome {
    pub collection: String,
    pub scanned: usize,
    /// Documents referencing an old identifier.
    pub found: usize,
    pub fixed: usize,
    pub errors: Vec<RecordFailure>,
    pub read_error: Option<String>,
}

impl RemapOutcome {
    fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            scanned: 0,
            found: 0,
            fixed: 0,
            errors: Vec::new(),
            read_error: None,
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RemapReport {
    pub dry_run: bool,
    pub collections: Vec<RemapOutcome>,
}

impl RemapReport {
    pub fn total_found(&self) -> usize {
        self.collections.iter().map(|c| c.found).sum()
    }

    pub fn total_fixed(&self) -> usize {
        self.collections.iter().map(|c| c.fixed).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.collections.iter().map(|c| c.error_count()).sum()
    }
}

impl fmt::Display for RemapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "REMAP SUMMARY (dry run)")?;
        } else {
            writeln!(f, "REMAP SUMMARY")?;
        }

        let mut table = summary_table(&["Collection", "Scanned", "Found", "Fixed", "Errors"]);
        for c in &self.collections {
            let errors = match &c.read_error {
                Some(e) => format!("read error: {}", e),
                None => c.error_count().to_string(),
            };
            table.add_row(vec![
                c.collection.clone(),
                c.scanned.to_string(),
                c.found.to_string(),
                c.fixed.to_string(),
                errors,
            ]);
        }
        writeln!(f, "{}", table)?;
        writeln!(
            f,
            "Total: {} found, {} fixed, {} errors",
            self.total_found(),
            self.total_fixed(),
            self.total_errors()
        )
    }
}

/// Rejects mappings that cannot be applied in a single pass.
///
/// An empty key or value is meaningless. A value that is also a key would
/// make the result depend on scan order (chains) or never settle (cycles).
pub fn validate_mapping(mapping: &BTreeMap<String, String>) -> Result<(), AppError> {
    if mapping.is_empty() {
        return Err(AppError::Validation(
            "identifier mapping is empty; set [remap.mapping]".to_string(),
        ));
    }
    for (old, new) in mapping {
        if old.is_empty() || new.is_empty() {
            return Err(AppError::Validation(format!(
                "mapping entry '{}' -> '{}' has an empty side",
                old, new
            )));
        }
        if mapping.contains_key(new) {
            return Err(AppError::Validation(format!(
                "mapping value '{}' (from '{}') is also an old identifier",
                new, old
            )));
        }
    }
    Ok(())
}

/// Rewrites owner identifiers across collections.
pub struct ReferenceRewriter {
    store: AppStore,
    mapping: BTreeMap<String, String>,
    collections: Vec<String>,
    owner_field: String,
    delay: Duration,
    dry_run: bool,
}

impl ReferenceRewriter {
    /// Fails if the mapping does not pass [`validate_mapping`].
    pub fn new(store: AppStore, config: &RemapConfig, owner_field: &str) -> Result<Self, AppError> {
        validate_mapping(&config.mapping)?;
        Ok(Self {
            store,
            mapping: config.mapping.clone(),
            collections: config.collections.clone(),
            owner_field: owner_field.to_string(),
            delay: Duration::from_millis(config.write_delay_ms),
            dry_run: false,
        })
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self) -> RemapReport {
        let mut collections = Vec::with_capacity(self.collections.len());
        // Pacing spans collections: no sleep before the first write of the run.
        let mut written = false;
        for name in &self.collections {
            collections.push(self.rewrite_collection(name, &mut written).await);
        }
        RemapReport {
            dry_run: self.dry_run,
            collections,
        }
    }

    async fn rewrite_collection(&self, collection: &str, written: &mut bool) -> RemapOutcome {
        let mut outcome = RemapOutcome::new(collection);
        tracing::info!("Scanning {}", collection);

        let docs = match self.store.list_documents(collection).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::error!("Failed to list {}: {}", collection, e);
                outcome.read_error = Some(e.to_string());
                return outcome;
            }
        };
        outcome.scanned = docs.len();

        for doc in &docs {
            let Some(new_id) = self.replacement(doc) else {
                continue;
            };
            outcome.found += 1;

            if self.dry_run {
                tracing::info!("Would update {}/{} -> {}", collection, doc.id, new_id);
                continue;
            }
            if *written && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            *written = true;

            let mut fields = Fields::new();
            fields.insert(self.owner_field.clone(), FieldValue::from(new_id));
            match self.store.update_fields(collection, &doc.id, &fields).await {
                Ok(()) => {
                    tracing::debug!("Updated {}/{} -> {}", collection, doc.id, new_id);
                    outcome.fixed += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to update {}/{}: {}", collection, doc.id, e);
                    outcome.errors.push(RecordFailure::new(doc.id.clone(), &e));
                }
            }
        }

        tracing::info!(
            "{}: {} stale, {} fixed, {} errors",
            collection,
            outcome.found,
            outcome.fixed,
            outcome.error_count()
        );
        outcome
    }

    /// The new identifier for a document still pointing at an old one.
    ///
    /// Owner values are compared as keys, so an integer owner matches its
    /// decimal form in the mapping.
    fn replacement(&self, doc: &Document) -> Option<&str> {
        let current = doc.get(&self.owner_field).and_then(FieldValue::as_key)?;
        self.mapping.get(&current).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::store::backends::memory::MemoryDocumentStore;
    use crate::store::DocumentStore;

    fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn config(pairs: &[(&str, &str)], collections: &[&str]) -> RemapConfig {
        RemapConfig {
            mapping: mapping(pairs),
            collections: collections.iter().map(|c| c.to_string()).collect(),
            write_delay_ms: 0,
        }
    }

    fn doc(id: &str, user_id: &str) -> Document {
        Document::from_json(id, json!({"user_id": user_id, "name": id})).unwrap()
    }

    #[test]
    fn test_validate_mapping() {
        assert!(validate_mapping(&mapping(&[("old-1", "new-1"), ("old-2", "new-2")])).is_ok());
        assert!(validate_mapping(&mapping(&[])).is_err());
        assert!(validate_mapping(&mapping(&[("", "new-1")])).is_err());
        assert!(validate_mapping(&mapping(&[("a", "b"), ("b", "c")])).is_err());
        assert!(validate_mapping(&mapping(&[("a", "a")])).is_err());
    }

    #[tokio::test]
    async fn test_rewrites_only_mapped_owner() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.seed("skills", vec![doc("1", "old-1"), doc("2", "other")]).await;

        let rewriter =
            ReferenceRewriter::new(store.clone(), &config(&[("old-1", "new-1")], &["skills"]), "user_id")
                .unwrap();
        let report = rewriter.run().await;

        let outcome = &report.collections[0];
        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.found, 1);
        assert_eq!(outcome.fixed, 1);

        let first = store.get_document("skills", "1").await.unwrap().unwrap();
        assert_eq!(first.get_str("user_id"), Some("new-1"));
        assert_eq!(first.get_str("name"), Some("1"));
        let second = store.get_document("skills", "2").await.unwrap().unwrap();
        assert_eq!(second.get_str("user_id"), Some("other"));
    }

    #[tokio::test]
    async fn test_rewrites_integer_owner() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .seed(
                "skills",
                vec![Document::from_json("1", json!({"user_id": 123, "name": "Rust"})).unwrap()],
            )
            .await;

        let rewriter =
            ReferenceRewriter::new(store.clone(), &config(&[("123", "new-1")], &["skills"]), "user_id")
                .unwrap();
        let report = rewriter.run().await;
        assert_eq!(report.total_fixed(), 1);

        let skill = store.get_document("skills", "1").await.unwrap().unwrap();
        assert_eq!(skill.get_str("user_id"), Some("new-1"));
        assert_eq!(rewriter.run().await.total_found(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_does_not_stop_scan() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .seed("projects", vec![doc("1", "old-1"), doc("2", "old-1"), doc("3", "old-1")])
            .await;
        store.fail_writes_to("projects", "2").await;

        let report = ReferenceRewriter::new(
            store.clone(),
            &config(&[("old-1", "new-1")], &["projects"]),
            "user_id",
        )
        .unwrap()
        .run()
        .await;

        assert_eq!(report.total_found(), 3);
        assert_eq!(report.total_fixed(), 2);
        assert_eq!(report.collections[0].errors[0].id, "2");
    }

    #[tokio::test]
    async fn test_list_failure_scoped_to_collection() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.seed("skills", vec![doc("1", "old-1")]).await;
        store.fail_listing("education").await;

        let report = ReferenceRewriter::new(
            store.clone(),
            &config(&[("old-1", "new-1")], &["education", "skills"]),
            "user_id",
        )
        .unwrap()
        .run()
        .await;

        assert!(report.collections[0].read_error.is_some());
        assert_eq!(report.collections[1].fixed, 1);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_store_untouched() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.seed("skills", vec![doc("1", "old-1")]).await;

        let report = ReferenceRewriter::new(store.clone(), &config(&[("old-1", "new-1")], &["skills"]), "user_id")
            .unwrap()
            .dry_run(true)
            .run()
            .await;

        assert_eq!(report.total_found(), 1);
        assert_eq!(report.total_fixed(), 0);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_writes() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .seed("skills", vec![doc("1", "old-1"), doc("2", "old-1"), doc("3", "old-1")])
            .await;
        let mut cfg = config(&[("old-1", "new-1")], &["skills"]);
        cfg.write_delay_ms = 100;

        let started = tokio::time::Instant::now();
        ReferenceRewriter::new(store.clone(), &cfg, "user_id")
            .unwrap()
            .run()
            .await;

        // Three writes, two pauses.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(300));
    }
}
