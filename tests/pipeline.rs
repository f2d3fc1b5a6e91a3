//! End-to-end runs of migrate, remap and audit over the in-memory stores.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use folio_migrate::config::{AuditConfig, CollectionMapping, MigrationConfig, RemapConfig};
use folio_migrate::models::CollectionKind;
use folio_migrate::services::{Auditor, Migrator, ReferenceRewriter};
use folio_migrate::store::backends::memory::{MemoryDocumentStore, MemorySource};
use folio_migrate::store::{Document, DocumentStore, FieldValue};
use serde_json::json;

const OLD_ID: &str = "0b7c5b0e-7f0e-4c55-9d7a-3c1f2f0c9a11";
const NEW_ID: &str = "Jq3XkP0sZbT1w9yV4mN2";

fn source() -> MemorySource {
    MemorySource::new()
        .with_table(
            "profile_info",
            vec![json!({
                "id": 1,
                "user_id": OLD_ID,
                "username": "ada",
                "email": "ada@example.com",
                "status": "open_to_opportunities",
                "created_at": "2023-03-14 09:26:53.589+00"
            })],
        )
        .with_table(
            "skills",
            vec![
                json!({"id": 10, "user_id": OLD_ID, "name": "Rust", "display_order": 1}),
                json!({"id": 11, "user_id": OLD_ID, "name": "SQL", "display_order": 2}),
                json!({"id": 12, "user_id": "someone-else", "name": "COBOL"}),
            ],
        )
        .with_table(
            "work_experience",
            vec![json!({
                "id": 20,
                "user_id": OLD_ID,
                "company": "Acme",
                "position": "Engineer",
                "start_date": "2019-09-01",
                "end_date": null
            })],
        )
}

fn migration_config() -> MigrationConfig {
    MigrationConfig {
        collections: ["profile_info", "skills", "work_experience"]
            .iter()
            .map(|t| CollectionMapping::same(t))
            .collect(),
        ..MigrationConfig::default()
    }
}

fn remap_config() -> RemapConfig {
    RemapConfig {
        mapping: BTreeMap::from([(OLD_ID.to_string(), NEW_ID.to_string())]),
        collections: ["profile_info", "skills", "work_experience"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        write_delay_ms: 0,
    }
}

fn audit_config() -> AuditConfig {
    AuditConfig {
        child_collections: vec!["skills".to_string(), "work_experience".to_string()],
        ..AuditConfig::default()
    }
}

async fn snapshot(store: &MemoryDocumentStore) -> Vec<Vec<Document>> {
    let mut state = Vec::new();
    for name in ["profile_info", "skills", "work_experience"] {
        state.push(store.collection(name).await);
    }
    state
}

async fn migrated_store() -> Arc<MemoryDocumentStore> {
    let store = Arc::new(MemoryDocumentStore::new());
    let report = Migrator::new(Arc::new(source()), store.clone(), migration_config())
        .run()
        .await;
    assert_eq!(report.total_failed(), 0);
    store
}

#[tokio::test]
async fn test_profile_row_becomes_document_keyed_by_id() {
    let source = MemorySource::new().with_table(
        "profile_info",
        vec![json!({"id": 42, "email": "a@b.com"})],
    );
    let store = Arc::new(MemoryDocumentStore::new());
    let config = MigrationConfig {
        collections: vec![CollectionMapping::same("profile_info")],
        ..MigrationConfig::default()
    };

    let report = Migrator::new(Arc::new(source), store.clone(), config).run().await;
    assert_eq!(report.total_migrated(), 1);

    let doc = store.get_document("profile_info", "42").await.unwrap().unwrap();
    assert_eq!(doc.get_str("email"), Some("a@b.com"));
    assert!(doc.get("id").is_none());
}

#[tokio::test]
async fn test_migrator_is_idempotent() {
    let store = migrated_store().await;
    let first = snapshot(&store).await;

    Migrator::new(Arc::new(source()), store.clone(), migration_config())
        .run()
        .await;

    assert_eq!(snapshot(&store).await, first);
}

#[tokio::test]
async fn test_dates_keep_their_calendar_day() {
    let store = migrated_store().await;
    let job = store.get_document("work_experience", "20").await.unwrap().unwrap();

    match job.get("start_date") {
        Some(FieldValue::Timestamp(ts)) => {
            assert_eq!(ts.date_naive(), NaiveDate::from_ymd_opt(2019, 9, 1).unwrap());
        }
        other => panic!("start_date was not converted: {:?}", other),
    }
    assert_eq!(job.get("end_date"), Some(&FieldValue::Null));

    let profile = store.get_document("profile_info", "1").await.unwrap().unwrap();
    assert!(matches!(profile.get("created_at"), Some(FieldValue::Timestamp(_))));
}

#[tokio::test]
async fn test_remap_preserves_ownership() {
    let store = migrated_store().await;
    let before = snapshot(&store).await;

    let report = ReferenceRewriter::new(store.clone(), &remap_config(), "user_id")
        .unwrap()
        .run()
        .await;
    assert_eq!(report.total_found(), 4);
    assert_eq!(report.total_fixed(), 4);

    // Every record owned under the old id is now owned under the new id;
    // records of other owners are untouched.
    for (old_docs, new_docs) in before.iter().zip(snapshot(&store).await.iter()) {
        for (old, new) in old_docs.iter().zip(new_docs) {
            assert_eq!(old.id, new.id);
            match old.get_str("user_id") {
                Some(OLD_ID) => assert_eq!(new.get_str("user_id"), Some(NEW_ID)),
                _ => assert_eq!(old, new),
            }
        }
    }
}

#[tokio::test]
async fn test_remap_is_idempotent() {
    let store = migrated_store().await;
    let rewriter = ReferenceRewriter::new(store.clone(), &remap_config(), "user_id").unwrap();

    rewriter.run().await;
    let after_first = snapshot(&store).await;
    let writes = store.write_count();

    let second = rewriter.run().await;
    assert_eq!(second.total_found(), 0);
    assert_eq!(second.total_fixed(), 0);
    assert_eq!(store.write_count(), writes);
    assert_eq!(snapshot(&store).await, after_first);
}

#[tokio::test]
async fn test_single_mapped_reference_rewritten() {
    let store = Arc::new(MemoryDocumentStore::new());
    store
        .seed(
            "skills",
            vec![
                Document::from_json("a", json!({"user_id": "old-1"})).unwrap(),
                Document::from_json("b", json!({"user_id": "other"})).unwrap(),
            ],
        )
        .await;
    let config = RemapConfig {
        mapping: BTreeMap::from([("old-1".to_string(), "new-1".to_string())]),
        collections: vec!["skills".to_string()],
        write_delay_ms: 0,
    };

    let report = ReferenceRewriter::new(store.clone(), &config, "user_id")
        .unwrap()
        .run()
        .await;

    assert_eq!(report.total_found(), 1);
    assert_eq!(report.total_fixed(), 1);
    let a = store.get_document("skills", "a").await.unwrap().unwrap();
    let b = store.get_document("skills", "b").await.unwrap().unwrap();
    assert_eq!(a.get_str("user_id"), Some("new-1"));
    assert_eq!(b.get_str("user_id"), Some("other"));
}

#[tokio::test]
async fn test_full_pipeline_audit_totals() {
    let store = migrated_store().await;
    ReferenceRewriter::new(store.clone(), &remap_config(), "user_id")
        .unwrap()
        .run()
        .await;

    let report = Auditor::new(store.clone(), &audit_config(), "user_id", vec![OLD_ID.to_string()])
        .audit("ada")
        .await
        .unwrap();

    assert_eq!(report.owner_id(), Some(NEW_ID));
    assert_eq!(report.collections[0].count, 2);
    assert_eq!(report.collections[1].count, 1);
    assert_eq!(report.collections[1].samples, vec!["Engineer @ Acme"]);
    assert_eq!(
        report.total,
        report.collections.iter().map(|c| c.count).sum::<usize>()
    );
    assert!(report.diagnosis.is_none());
}

#[tokio::test]
async fn test_audit_before_remap_flags_old_identifier() {
    let store = migrated_store().await;
    // Only the profile has been moved to the new identifier.
    let profile = store.get_document("profile_info", "1").await.unwrap().unwrap();
    let mut fields = folio_migrate::store::Fields::new();
    fields.insert("user_id".to_string(), FieldValue::from(NEW_ID));
    store.update_fields("profile_info", &profile.id, &fields).await.unwrap();

    let report = Auditor::new(store.clone(), &audit_config(), "user_id", vec![OLD_ID.to_string()])
        .audit("ada")
        .await
        .unwrap();

    assert_eq!(report.owner_id(), Some(NEW_ID));
    assert_eq!(report.total, 0);
    assert_eq!(report.stale_owner_ids(), vec![OLD_ID]);
    assert!(report.to_string().contains("OLD UUID"));
}

#[tokio::test]
async fn test_migrated_documents_decode_into_typed_records() {
    let store = migrated_store().await;

    for (name, kind) in [
        ("profile_info", CollectionKind::Profile),
        ("skills", CollectionKind::Skill),
        ("work_experience", CollectionKind::WorkExperience),
    ] {
        for doc in store.collection(name).await {
            kind.validate(&doc).unwrap();
        }
    }
}
