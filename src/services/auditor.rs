//! Consistency Auditor: checks that a profile's records are reachable.
//!
//! The profile is resolved by username and every child collection is
//! tallied by the profile's current owner identifier. When nothing is
//! reachable the auditor groups each collection by owner identifier and
//! flags groups still keyed by a pre-migration identifier.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::AuditConfig;
use crate::context::AppStore;
use crate::error::AppError;
use crate::models::{sort_timeline, CollectionKind, Education, TimelineEntry, WorkExperience};
use crate::services::profiles::{ProfileMatch, ProfileService};
use crate::services::report::summary_table;
use crate::store::{Document, FieldValue};

/// Flag shown next to owner groups keyed by a pre-migration identifier.
pub const STALE_FLAG: &str = "OLD UUID";

/// Records reachable in one child collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionTally {
    pub collection: String,
    pub count: usize,
    /// Labels of the first few records.
    pub samples: Vec<String>,
    pub error: Option<String>,
}

/// Documents in one collection sharing an owner identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerGroup {
    /// `None` for documents without a usable owner field.
    pub owner_id: Option<String>,
    pub count: usize,
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionDiagnosis {
    pub collection: String,
    pub groups: Vec<OwnerGroup>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub username: String,
    /// The resolved profile; `None` when no profile has this username.
    pub profile: Option<ProfileMatch>,
    /// Ids of further profiles sharing the username.
    pub duplicates: Vec<String>,
    pub collections: Vec<CollectionTally>,
    pub total: usize,
    /// Present only when nothing was reachable.
    pub diagnosis: Option<Vec<CollectionDiagnosis>>,
}

impl AuditReport {
    pub fn owner_id(&self) -> Option<&str> {
        self.profile.as_ref().and_then(ProfileMatch::owner_id)
    }

    /// Owner identifiers flagged as stale anywhere in the diagnosis.
    pub fn stale_owner_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .diagnosis
            .iter()
            .flatten()
            .flat_map(|d| &d.groups)
            .filter(|g| g.stale)
            .filter_map(|g| g.owner_id.as_deref())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "AUDIT: {}", self.username)?;

        match &self.profile {
            None => writeln!(f, "Profile not found for username '{}'", self.username)?,
            Some(p) => {
                writeln!(
                    f,
                    "Profile: {} {} (owner {})",
                    p.id,
                    p.public_path().unwrap_or_default(),
                    p.owner_id().unwrap_or("<missing>")
                )?;
                if !self.duplicates.is_empty() {
                    writeln!(
                        f,
                        "WARNING: username also used by profiles: {}",
                        self.duplicates.join(", ")
                    )?;
                }

                let mut table = summary_table(&["Collection", "Count", "Samples"]);
                for c in &self.collections {
                    let samples = match &c.error {
                        Some(e) => format!("read error: {}", e),
                        None => c.samples.join(", "),
                    };
                    table.add_row(vec![c.collection.clone(), c.count.to_string(), samples]);
                }
                writeln!(f, "{}", table)?;
                writeln!(f, "Total: {} records", self.total)?;
            }
        }

        if let Some(diagnosis) = &self.diagnosis {
            writeln!(f)?;
            writeln!(f, "DIAGNOSIS")?;
            let mut table = summary_table(&["Collection", "Owner", "Count", "Flag"]);
            for d in diagnosis {
                if let Some(e) = &d.error {
                    table.add_row(vec![
                        d.collection.clone(),
                        "-".to_string(),
                        "-".to_string(),
                        format!("read error: {}", e),
                    ]);
                    continue;
                }
                for g in &d.groups {
                    table.add_row(vec![
                        d.collection.clone(),
                        g.owner_id.clone().unwrap_or_else(|| "<missing>".to_string()),
                        g.count.to_string(),
                        if g.stale { STALE_FLAG.to_string() } else { String::new() },
                    ]);
                }
            }
            writeln!(f, "{}", table)?;
        }
        Ok(())
    }
}

/// Read-only audit of one username.
pub struct Auditor {
    store: AppStore,
    profiles: ProfileService,
    owner_field: String,
    child_collections: Vec<String>,
    known_old_ids: HashSet<String>,
    sample_size: usize,
}

impl Auditor {
    pub fn new(
        store: AppStore,
        config: &AuditConfig,
        owner_field: &str,
        known_old_ids: Vec<String>,
    ) -> Self {
        Self {
            profiles: ProfileService::new(store.clone(), config.profile_collection.clone())
                .with_owner_field(owner_field),
            store,
            owner_field: owner_field.to_string(),
            child_collections: config.child_collections.clone(),
            known_old_ids: known_old_ids.into_iter().collect(),
            sample_size: config.sample_size,
        }
    }

    /// Audits `username`. Only a failure to read the profile collection is
    /// an error; child collection failures are reported per row.
    pub async fn audit(&self, username: &str) -> Result<AuditReport, AppError> {
        let mut matches = self.profiles.find_by_username(username).await?.into_iter();
        let profile = matches.next();
        let duplicates: Vec<String> = matches.map(|m| m.id).collect();

        if !duplicates.is_empty() {
            tracing::warn!(
                "Username '{}' is shared by {} profiles",
                username,
                duplicates.len() + 1
            );
        }

        let mut collections = Vec::new();
        match profile.as_ref().and_then(ProfileMatch::owner_id) {
            Some(owner_id) => {
                tracing::info!("Resolved '{}' to owner {}", username, owner_id);
                for name in &self.child_collections {
                    collections.push(self.tally(name, owner_id).await);
                }
            }
            None if profile.is_some() => {
                tracing::warn!("Profile for '{}' has no {}", username, self.owner_field)
            }
            None => tracing::warn!("No profile found for '{}'", username),
        }
        let total = collections.iter().map(|c| c.count).sum();

        let diagnosis = if total == 0 {
            Some(self.diagnose().await)
        } else {
            None
        };

        Ok(AuditReport {
            username: username.to_string(),
            profile,
            duplicates,
            collections,
            total,
            diagnosis,
        })
    }

    async fn tally(&self, collection: &str, owner_id: &str) -> CollectionTally {
        let result = self
            .store
            .find_by_field(collection, &self.owner_field, &FieldValue::from(owner_id))
            .await;

        match result {
            Ok(docs) => {
                tracing::debug!("{}: {} records", collection, docs.len());
                CollectionTally {
                    collection: collection.to_string(),
                    count: docs.len(),
                    samples: self.samples(collection, docs),
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!("Failed to read {}: {}", collection, e);
                CollectionTally {
                    collection: collection.to_string(),
                    count: 0,
                    samples: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn samples(&self, collection: &str, mut docs: Vec<Document>) -> Vec<String> {
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        let kind = CollectionKind::from_name(collection);
        let docs = match kind {
            Some(CollectionKind::Education) => timeline_order::<Education>(docs),
            Some(CollectionKind::WorkExperience) => timeline_order::<WorkExperience>(docs),
            _ => docs,
        };

        docs.iter()
            .take(self.sample_size)
            .map(|doc| match kind {
                Some(kind) => kind.describe(doc),
                None => format!("<{}>", doc.id),
            })
            .collect()
    }

    async fn diagnose(&self) -> Vec<CollectionDiagnosis> {
        tracing::info!("No reachable records, grouping by owner identifier");
        let mut diagnosis = Vec::with_capacity(self.child_collections.len());

        for name in &self.child_collections {
            let entry = match self.store.list_documents(name).await {
                Ok(docs) => CollectionDiagnosis {
                    collection: name.clone(),
                    groups: self.group_by_owner(&docs),
                    error: None,
                },
                Err(e) => {
                    tracing::error!("Failed to read {}: {}", name, e);
                    CollectionDiagnosis {
                        collection: name.clone(),
                        groups: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            };
            diagnosis.push(entry);
        }
        diagnosis
    }

    fn group_by_owner(&self, docs: &[Document]) -> Vec<OwnerGroup> {
        let mut counts: BTreeMap<Option<String>, usize> = BTreeMap::new();
        for doc in docs {
            let owner = doc.get(&self.owner_field).and_then(FieldValue::as_key);
            *counts.entry(owner).or_default() += 1;
        }

        counts
            .into_iter()
            .map(|(owner_id, count)| OwnerGroup {
                stale: owner_id
                    .as_ref()
                    .is_some_and(|id| self.known_old_ids.contains(id)),
                owner_id,
                count,
            })
            .collect()
    }
}

/// Orders documents the way the resume timeline shows them. Documents that
/// do not decode keep their incoming order.
fn timeline_order<T>(docs: Vec<Document>) -> Vec<Document>
where
    T: TimelineEntry + DeserializeOwned,
{
    let decoded: Result<Vec<(T, Document)>, AppError> = docs
        .iter()
        .map(|doc| doc.decode::<T>().map(|entry| (entry, doc.clone())))
        .collect();

    match decoded {
        Ok(mut entries) => {
            sort_timeline(&mut entries);
            entries.into_iter().map(|(_, doc)| doc).collect()
        }
        Err(e) => {
            tracing::warn!("Timeline entries did not decode, keeping id order: {}", e);
            docs
        }
    }
}
