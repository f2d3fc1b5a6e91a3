//! Profile lookups by username.

use serde::Serialize;

use crate::context::AppStore;
use crate::error::AppError;
use crate::models::Profile;
use crate::store::{Document, FieldValue};

/// A profile document matched by username.
///
/// Identity comes from the raw document; the typed record is best effort so
/// one malformed field never hides the profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileMatch {
    pub id: String,
    /// Value of the configured owner field.
    pub owner_id: Option<String>,
    pub username: Option<String>,
    /// `None` when the document does not decode into a `Profile`.
    pub profile: Option<Profile>,
}

impl ProfileMatch {
    fn from_document(doc: &Document, owner_field: &str) -> Self {
        let profile = match doc.decode::<Profile>() {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!("Profile {} does not match the profile shape: {}", doc.id, e);
                None
            }
        };
        Self {
            id: doc.id.clone(),
            owner_id: doc.get(owner_field).and_then(FieldValue::as_key),
            username: doc.get_str("username").map(str::to_string),
            profile,
        }
    }

    /// Public route for this profile.
    pub fn public_path(&self) -> Option<String> {
        self.username.as_ref().map(|u| format!("/{}", u))
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }
}

/// Result of a username availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UsernameCheck {
    Available,
    /// Not usable as a public route segment.
    Invalid,
    Taken { profile_id: String, owner_id: Option<String> },
}

impl UsernameCheck {
    pub fn is_available(&self) -> bool {
        matches!(self, UsernameCheck::Available)
    }
}

/// Reads profiles from the profile collection.
pub struct ProfileService {
    store: AppStore,
    collection: String,
    owner_field: String,
}

impl ProfileService {
    pub fn new(store: AppStore, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            owner_field: "user_id".to_string(),
        }
    }

    pub fn with_owner_field(mut self, owner_field: impl Into<String>) -> Self {
        self.owner_field = owner_field.into();
        self
    }

    /// All profiles whose username equals `username` exactly, ordered by
    /// document id. More than one match means the uniqueness rule was broken.
    pub async fn find_by_username(&self, username: &str) -> Result<Vec<ProfileMatch>, AppError> {
        let mut docs = self
            .store
            .find_by_field(&self.collection, "username", &FieldValue::from(username))
            .await?;
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs
            .iter()
            .map(|doc| ProfileMatch::from_document(doc, &self.owner_field))
            .collect())
    }

    /// Whether `username` may be saved by `current_owner`.
    ///
    /// A profile already owned by `current_owner` does not block the name, so
    /// re-saving an unchanged profile passes.
    pub async fn check_username(
        &self,
        username: &str,
        current_owner: Option<&str>,
    ) -> Result<UsernameCheck, AppError> {
        if !Profile::is_url_safe_username(username) {
            return Ok(UsernameCheck::Invalid);
        }
        let matches = self.find_by_username(username).await?;
        let taken = matches
            .into_iter()
            .find(|m| current_owner.is_none() || m.owner_id() != current_owner);

        Ok(match taken {
            Some(m) => UsernameCheck::Taken {
                owner_id: m.owner_id().map(str::to_string),
                profile_id: m.id,
            },
            None => UsernameCheck::Available,
        })
    }
}
