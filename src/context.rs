//! Application context shared by the command handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::services::{Auditor, Migrator, ProfileService, ReferenceRewriter};
use crate::store::backends::{connect_source, connect_target};
use crate::store::{DocumentStore, SourceStore};

/// Shared handle to the relational source.
pub type AppSource = Arc<dyn SourceStore>;

/// Shared handle to the document target.
pub type AppStore = Arc<dyn DocumentStore>;

/// Root application context.
///
/// Holds the target store and configuration. The source is connected on
/// demand since only the migrator reads it.
#[derive(Clone)]
pub struct Context {
    /// Target document store.
    pub store: AppStore,
    /// Application configuration.
    pub config: Arc<Config>,
}

impl Context {
    /// Creates a new context with the given dependencies.
    pub fn new(store: AppStore, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Connects the configured target store.
    pub fn connect(config: Config) -> Result<Self, AppError> {
        let store = connect_target(&config.target)?;
        Ok(Self::new(store, config))
    }

    /// Connects the configured source store.
    pub fn source(&self) -> Result<AppSource, AppError> {
        connect_source(&self.config.source, &self.config.migration.primary_key)
    }

    pub fn migrator(&self, source: AppSource) -> Migrator {
        Migrator::new(source, self.store.clone(), self.config.migration.clone())
    }

    pub fn rewriter(&self) -> Result<ReferenceRewriter, AppError> {
        ReferenceRewriter::new(self.store.clone(), &self.config.remap, &self.config.owner_field)
    }

    pub fn auditor(&self) -> Auditor {
        Auditor::new(
            self.store.clone(),
            &self.config.audit,
            &self.config.owner_field,
            self.config.known_old_ids(),
        )
    }

    pub fn profiles(&self) -> ProfileService {
        ProfileService::new(self.store.clone(), self.config.audit.profile_collection.clone())
            .with_owner_field(&self.config.owner_field)
    }
}
