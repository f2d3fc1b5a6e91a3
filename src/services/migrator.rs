//! Collection Migrator: bulk copy of source tables into document collections.
//!
//! Each row becomes a document keyed by its stringified primary key, with the
//! primary key field dropped and date fields normalized to timestamps. Writes
//! are upserts, so re-running against unchanged source data converges to the
//! same target state.

use std::fmt;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::config::{CollectionMapping, MigrationConfig};
use crate::context::{AppSource, AppStore};
use crate::error::AppError;
use crate::models::CollectionKind;
use crate::services::report::{summary_table, RecordFailure};
use crate::store::{to_timestamp, Document, FieldValue};

/// Outcome of migrating one collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionOutcome {
    pub source: String,
    pub target: String,
    pub found: usize,
    pub migrated: usize,
    pub failures: Vec<RecordFailure>,
    /// Set when the source table could not be read at all.
    pub read_error: Option<String>,
}

impl CollectionOutcome {
    fn new(mapping: &CollectionMapping) -> Self {
        Self {
            source: mapping.source.clone(),
            target: mapping.target_name().to_string(),
            found: 0,
            migrated: 0,
            failures: Vec::new(),
            read_error: None,
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        self.read_error.is_some() || !self.failures.is_empty()
    }

    fn record(&mut self, id: String, result: Result<(), AppError>) {
        match result {
            Ok(()) => self.migrated += 1,
            Err(e) => {
                tracing::warn!("Failed to migrate {}/{}: {}", self.source, id, e);
                self.failures.push(RecordFailure::new(id, &e));
            }
        }
    }
}

/// Summary of a whole migrator run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub collections: Vec<CollectionOutcome>,
}

impl MigrationReport {
    pub fn total_found(&self) -> usize {
        self.collections.iter().map(|c| c.found).sum()
    }

    pub fn total_migrated(&self) -> usize {
        self.collections.iter().map(|c| c.migrated).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.collections.iter().map(|c| c.failed()).sum()
    }

    /// Source names of collections with at least one failure or a read error.
    pub fn failed_collections(&self) -> Vec<&str> {
        self.collections
            .iter()
            .filter(|c| c.has_failures())
            .map(|c| c.source.as_str())
            .collect()
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = if self.dry_run {
            "MIGRATION SUMMARY (dry run)"
        } else {
            "MIGRATION SUMMARY"
        };
        writeln!(f, "{}", title)?;

        let mut table = summary_table(&["Source", "Target", "Found", "Migrated", "Failed", "Status"]);
        for c in &self.collections {
            let status = match &c.read_error {
                Some(e) => format!("read error: {}", e),
                None if c.failures.is_empty() => "ok".to_string(),
                None => "partial".to_string(),
            };
            table.add_row(vec![
                c.source.clone(),
                c.target.clone(),
                c.found.to_string(),
                c.migrated.to_string(),
                c.failed().to_string(),
                status,
            ]);
        }
        writeln!(f, "{}", table)?;

        writeln!(
            f,
            "Total: {} records found, {} migrated, {} failed",
            self.total_found(),
            self.total_migrated(),
            self.total_failed()
        )?;
        let failed = self.failed_collections();
        if !failed.is_empty() {
            writeln!(f, "Collections with failures: {}", failed.join(", "))?;
        }
        Ok(())
    }
}

/// Converts one source row into a target document.
///
/// The primary key is removed and becomes the document id; each listed date
/// field that is present and non-null is converted to a timestamp.
pub fn transform_row(
    row: JsonValue,
    primary_key: &str,
    date_fields: &[String],
) -> Result<Document, AppError> {
    // Read from the raw JSON so u64 and fractional keys keep their digits
    let key = row.get(primary_key).and_then(raw_key);
    let mut doc = Document::from_json(String::new(), row)?;
    doc.fields.remove(primary_key);
    doc.id = key.ok_or_else(|| AppError::MissingPrimaryKey(primary_key.to_string()))?;

    for field in date_fields {
        let Some(value) = doc.fields.get(field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let ts = to_timestamp(field, value)?;
        doc.fields.insert(field.clone(), FieldValue::Timestamp(ts));
    }

    Ok(doc)
}

fn raw_key(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Copies configured source tables into the target store.
pub struct Migrator {
    source: AppSource,
    target: AppStore,
    config: MigrationConfig,
    dry_run: bool,
}

impl Migrator {
    pub fn new(source: AppSource, target: AppStore, config: MigrationConfig) -> Self {
        Self {
            source,
            target,
            config,
            dry_run: false,
        }
    }

    /// Transform and count without writing.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Migrates every configured collection in order.
    pub async fn run(&self) -> MigrationReport {
        let mut collections = Vec::with_capacity(self.config.collections.len());
        for mapping in &self.config.collections {
            collections.push(self.migrate_collection(mapping).await);
        }
        MigrationReport {
            dry_run: self.dry_run,
            collections,
        }
    }

    /// Migrates a single collection. Never fails as a whole: read errors and
    /// per-record errors are captured in the outcome.
    pub async fn migrate_collection(&self, mapping: &CollectionMapping) -> CollectionOutcome {
        let mut outcome = CollectionOutcome::new(mapping);
        tracing::info!("Migrating {} -> {}", outcome.source, outcome.target);

        let rows = match self.source.select_all(&mapping.source).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("Failed to read {}: {}", mapping.source, e);
                outcome.read_error = Some(e.to_string());
                return outcome;
            }
        };
        outcome.found = rows.len();
        tracing::info!("Found {} records in {}", outcome.found, mapping.source);

        let kind = CollectionKind::from_name(mapping.target_name());
        for (index, row) in rows.into_iter().enumerate() {
            let fallback_id = row_label(&row, &self.config.primary_key, index);
            let result = self.migrate_row(row, kind, &outcome.target).await;
            outcome.record(fallback_id, result);
        }

        tracing::info!(
            "{}: {}/{} migrated, {} failed",
            outcome.source,
            outcome.migrated,
            outcome.found,
            outcome.failed()
        );
        outcome
    }

    async fn migrate_row(
        &self,
        row: JsonValue,
        kind: Option<CollectionKind>,
        target: &str,
    ) -> Result<(), AppError> {
        let doc = transform_row(row, &self.config.primary_key, &self.config.date_fields)?;

        if let Some(kind) = kind {
            if let Err(e) = kind.validate(&doc) {
                tracing::warn!("{}/{} does not match the {} shape: {}", target, doc.id, kind, e);
            }
        }

        if self.dry_run {
            tracing::debug!("Would write {}/{}", target, doc.id);
            return Ok(());
        }
        self.target.set_document(target, &doc).await?;
        tracing::debug!("Wrote {}/{}", target, doc.id);
        Ok(())
    }
}

/// Identifies a row in logs before it has been transformed.
fn row_label(row: &JsonValue, primary_key: &str, index: usize) -> String {
    match row.get(primary_key) {
        Some(JsonValue::String(s)) if !s.is_empty() => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        _ => format!("#{}", index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use serde_json::json;

    use crate::store::backends::memory::{MemoryDocumentStore, MemorySource};

    fn date_fields() -> Vec<String> {
        MigrationConfig::default().date_fields
    }

    fn config_for(tables: &[&str]) -> MigrationConfig {
        MigrationConfig {
            collections: tables.iter().map(|t| CollectionMapping::same(t)).collect(),
            ..MigrationConfig::default()
        }
    }

    #[test]
    fn test_transform_drops_primary_key() {
        let doc = transform_row(json!({"id": 42, "email": "a@b.com"}), "id", &date_fields()).unwrap();

        assert_eq!(doc.id, "42");
        assert_eq!(doc.get_str("email"), Some("a@b.com"));
        assert!(doc.get("id").is_none());
    }

    #[test]
    fn test_transform_keeps_wide_numeric_keys() {
        let doc = transform_row(json!({"id": u64::MAX, "name": "Rust"}), "id", &date_fields()).unwrap();
        assert_eq!(doc.id, "18446744073709551615");
        assert!(doc.get("id").is_none());

        let doc = transform_row(json!({"id": 1.5}), "id", &date_fields()).unwrap();
        assert_eq!(doc.id, "1.5");

        let empty = transform_row(json!({"id": ""}), "id", &date_fields());
        assert!(matches!(empty, Err(AppError::MissingPrimaryKey(_))));
    }

    #[test]
    fn test_transform_normalizes_dates_without_day_shift() {
        let doc = transform_row(
            json!({"id": "e1", "start_date": "2019-09-01", "end_date": null, "notes": "2019-09-01"}),
            "id",
            &date_fields(),
        )
        .unwrap();

        match doc.get("start_date") {
            Some(FieldValue::Timestamp(ts)) => {
                assert_eq!(ts.date_naive(), NaiveDate::from_ymd_opt(2019, 9, 1).unwrap())
            }
            other => panic!("start_date not normalized: {:?}", other),
        }
        assert_eq!(doc.get("end_date"), Some(&FieldValue::Null));
        // Only listed fields are touched.
        assert_eq!(doc.get_str("notes"), Some("2019-09-01"));
    }

    #[test]
    fn test_transform_failures() {
        let missing = transform_row(json!({"email": "a@b.com"}), "id", &date_fields());
        assert!(matches!(missing, Err(AppError::MissingPrimaryKey(_))));

        let bad_date = transform_row(json!({"id": 1, "created_at": "soon"}), "id", &date_fields());
        assert!(matches!(bad_date, Err(AppError::InvalidDate { .. })));
    }

    #[tokio::test]
    async fn test_continue_on_record_failure() {
        let source = MemorySource::new().with_table(
            "skills",
            vec![
                json!({"id": 1, "name": "Rust"}),
                json!({"id": 2, "name": "Go"}),
                json!({"name": "no key"}),
                json!({"id": 4, "name": "Zig"}),
            ],
        );
        let target = Arc::new(MemoryDocumentStore::new());
        target.fail_writes_to("skills", "2").await;

        let migrator = Migrator::new(Arc::new(source), target.clone(), config_for(&["skills"]));
        let outcome = migrator.migrate_collection(&CollectionMapping::same("skills")).await;

        assert_eq!(outcome.found, 4);
        assert_eq!(outcome.migrated, 2);
        assert_eq!(outcome.failed(), 2);
        let failed_ids: Vec<_> = outcome.failures.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(failed_ids, vec!["2", "#2"]);
        assert_eq!(target.collection("skills").await.len(), 2);
    }

    #[tokio::test]
    async fn test_read_failure_aborts_only_that_collection() {
        let source = MemorySource::new().with_table("skills", vec![json!({"id": 1})]);
        let target = Arc::new(MemoryDocumentStore::new());

        let migrator = Migrator::new(
            Arc::new(source),
            target.clone(),
            config_for(&["missing_table", "skills"]),
        );
        let report = migrator.run().await;

        assert_eq!(report.collections.len(), 2);
        assert!(report.collections[0].read_error.is_some());
        assert_eq!(report.collections[1].migrated, 1);
        assert_eq!(report.failed_collections(), vec!["missing_table"]);
        assert_eq!(report.total_found(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let source = MemorySource::new().with_table("projects", vec![json!({"id": 7, "title": "Site"})]);
        let target = Arc::new(MemoryDocumentStore::new());

        let report = Migrator::new(Arc::new(source), target.clone(), config_for(&["projects"]))
            .dry_run(true)
            .run()
            .await;

        assert_eq!(report.total_migrated(), 1);
        assert_eq!(target.write_count(), 0);
        assert!(report.to_string().contains("dry run"));
    }

    #[tokio::test]
    async fn test_renamed_target_collection() {
        let source = MemorySource::new().with_table("profile_info", vec![json!({"id": "p1", "username": "ada"})]);
        let target = Arc::new(MemoryDocumentStore::new());
        let mapping = CollectionMapping {
            source: "profile_info".to_string(),
            target: Some("profiles".to_string()),
        };
        let config = MigrationConfig {
            collections: vec![mapping],
            ..MigrationConfig::default()
        };

        let report = Migrator::new(Arc::new(source), target.clone(), config).run().await;

        assert_eq!(report.collections[0].target, "profiles");
        assert_eq!(target.collection("profiles").await.len(), 1);
        assert!(target.collection("profile_info").await.is_empty());
    }

    #[test]
    fn test_summary_lists_failed_collections() {
        let report = MigrationReport {
            dry_run: false,
            collections: vec![CollectionOutcome {
                source: "skills".to_string(),
                target: "skills".to_string(),
                found: 2,
                migrated: 1,
                failures: vec![RecordFailure::new("9", &AppError::Internal("boom".to_string()))],
                read_error: None,
            }],
        };

        let rendered = report.to_string();
        assert!(rendered.contains("Total: 2 records found, 1 migrated, 1 failed"));
        assert!(rendered.contains("Collections with failures: skills"));
        assert!(rendered.contains("partial"));
    }
}
