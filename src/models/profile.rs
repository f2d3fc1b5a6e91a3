//! Profile model: one per user, addressed publicly by `username`.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Availability shown on the public profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Available,
    NotAvailable,
    OpenToOpportunities,
}

/// A user's profile.
///
/// `user_id` is the owner identifier every child record points at;
/// `username` is the unique handle used for public routing (`/username`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub avatar_url: Option<String>,
    pub resume_url: Option<String>,
    pub theme_color: Option<String>,
    pub status: Option<ProfileStatus>,
    pub must_change_password: Option<bool>,
    /// Fields not modelled above, kept so nothing is lost on re-encode.
    #[serde(flatten)]
    pub extra: JsonMap<String, JsonValue>,
}

impl Profile {
    /// Whether `handle` is usable as a URL path segment.
    pub fn is_url_safe_username(handle: &str) -> bool {
        !handle.is_empty()
            && handle
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    }
}
