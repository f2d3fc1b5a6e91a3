//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/folio-migrate/config.toml` (XDG) or platform config dir
//! 2. Project config: `.folio-migrate.toml`
//! 3. Legacy environment names (`SUPABASE_URL`, `FIREBASE_PROJECT_ID`, ...)
//! 4. Environment variables: `FOLIO_*`, nested with `__`
//!
//! # Intended Usage
//!
//! **Project config** (`.folio-migrate.toml` next to the operator's checkout):
//! ```toml
//! owner_field = "user_id"
//!
//! [source]
//! url = "https://abcd.supabase.co"
//! key = "service-role-key"
//!
//! [target]
//! project_id = "portfolio-prod"
//! access_token = "ya29...."
//!
//! [remap]
//! write_delay_ms = 100
//!
//! [remap.mapping]
//! "0b7c5b0e-7f0e-4c55-9d7a-3c1f2f0c9a11" = "Jq3XkP0sZbT1w9yV4mN2"
//! ```
//!
//! Collection lists default to the portfolio schema (profile plus the nine
//! child collections) and only need overriding for partial runs.

use std::collections::BTreeMap;
use std::ops::Deref;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::models::CollectionKind;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Field carrying the owner identifier on every document.
    #[serde(default = "default_owner_field")]
    pub owner_field: String,
    #[serde(default)]
    pub source: SourceConfig,
    pub target: TargetConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub remap: RemapConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Source relational store connection.
///
/// Either `postgres_uri` (direct connection) or `url` + `key` (Supabase REST)
/// must be set when running the migrator. Other commands ignore this section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    /// Supabase project URL (e.g. `https://abcd.supabase.co`).
    pub url: Option<String>,
    /// Supabase service-role or anon key.
    pub key: Option<String>,
    /// PostgreSQL connection string, preferred over REST when set.
    pub postgres_uri: Option<String>,
    /// Rows fetched per REST page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Target Firestore project.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Google Cloud project id (required).
    pub project_id: String,
    #[serde(default = "default_database")]
    pub database: String,
    /// OAuth2 bearer token with datastore scope.
    pub access_token: Option<String>,
    /// Web API key, appended as `key=` on every request.
    pub api_key: Option<String>,
    /// REST root; point at `http://localhost:8080/v1` for the emulator.
    #[serde(default = "default_firestore_base_url")]
    pub base_url: String,
}

/// A source table copied into a target collection.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CollectionMapping {
    pub source: String,
    /// Defaults to the source name.
    #[serde(default)]
    pub target: Option<String>,
}

impl CollectionMapping {
    pub fn same(name: &str) -> Self {
        Self {
            source: name.to_string(),
            target: None,
        }
    }

    pub fn target_name(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.source)
    }
}

/// Collection Migrator settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MigrationConfig {
    #[serde(default = "default_collection_mappings")]
    pub collections: Vec<CollectionMapping>,
    #[serde(default = "default_date_fields")]
    pub date_fields: Vec<String>,
    /// Source primary key; becomes the document id and is dropped from fields.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            collections: default_collection_mappings(),
            date_fields: default_date_fields(),
            primary_key: default_primary_key(),
        }
    }
}

/// Reference Rewriter settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RemapConfig {
    /// Old owner identifier to new owner identifier.
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
    #[serde(default = "default_all_collections")]
    pub collections: Vec<String>,
    /// Pause between consecutive writes.
    #[serde(default = "default_write_delay_ms")]
    pub write_delay_ms: u64,
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self {
            mapping: BTreeMap::new(),
            collections: default_all_collections(),
            write_delay_ms: default_write_delay_ms(),
        }
    }
}

/// Consistency Auditor settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_profile_collection")]
    pub profile_collection: String,
    #[serde(default = "default_child_collections")]
    pub child_collections: Vec<String>,
    /// Pre-migration identifiers. Empty means "use the remap mapping keys".
    #[serde(default)]
    pub known_old_ids: Vec<String>,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            profile_collection: default_profile_collection(),
            child_collections: default_child_collections(),
            known_old_ids: Vec::new(),
            sample_size: default_sample_size(),
        }
    }
}

fn default_owner_field() -> String {
    "user_id".to_string()
}

fn default_page_size() -> usize {
    1000
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_firestore_base_url() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

fn default_collection_mappings() -> Vec<CollectionMapping> {
    CollectionKind::all()
        .iter()
        .map(|kind| CollectionMapping::same(kind.default_name()))
        .collect()
}

fn default_date_fields() -> Vec<String> {
    [
        "created_at",
        "updated_at",
        "start_date",
        "end_date",
        "issue_date",
        "expiry_date",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_all_collections() -> Vec<String> {
    CollectionKind::all()
        .iter()
        .map(|kind| kind.default_name().to_string())
        .collect()
}

fn default_write_delay_ms() -> u64 {
    100
}

fn default_profile_collection() -> String {
    CollectionKind::Profile.default_name().to_string()
}

fn default_child_collections() -> Vec<String> {
    CollectionKind::children()
        .iter()
        .map(|kind| kind.default_name().to_string())
        .collect()
}

fn default_sample_size() -> usize {
    3
}

/// Environment names used by the original deployment scripts.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("SUPABASE_URL", "source.url"),
    ("SUPABASE_KEY", "source.key"),
    ("SUPABASE_SERVICE_ROLE_KEY", "source.key"),
    ("SUPABASE_DB_URL", "source.postgres_uri"),
    ("FIREBASE_PROJECT_ID", "target.project_id"),
    ("FIREBASE_API_KEY", "target.api_key"),
    ("FIREBASE_ACCESS_TOKEN", "target.access_token"),
];

impl Config {
    /// Load config with layered resolution (user → project → legacy env → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// The merged provider stack, exposed for inspection in tests.
    pub fn figment() -> Figment {
        let user_config = Self::user_config_path();
        let legacy_names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();

        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(user_config))
            // Layer 2: Project config
            .merge(Toml::file(".folio-migrate.toml"))
            // Layer 3: Legacy variable names
            .merge(Env::raw().only(&legacy_names).map(|key| {
                LEGACY_ENV
                    .iter()
                    .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
                    .map(|(_, path)| (*path).into())
                    .unwrap_or_else(|| key.as_str().to_string().into())
            }))
            // Layer 4: Prefixed variables (highest priority)
            .merge(Env::prefixed("FOLIO_").split("__"))
    }

    /// Old identifiers the auditor treats as stale.
    pub fn known_old_ids(&self) -> Vec<String> {
        if self.audit.known_old_ids.is_empty() {
            self.remap.mapping.keys().cloned().collect()
        } else {
            self.audit.known_old_ids.clone()
        }
    }

    /// User config path: ~/.config/folio-migrate/config.toml (XDG) or platform config dir.
    fn user_config_path() -> std::path::PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home
                .join(".config")
                .join("folio-migrate")
                .join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        dirs::config_dir()
            .map(|p| p.join("folio-migrate").join("config.toml"))
            .unwrap_or_default()
    }
}
