//! Migrate command handler.

use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;

use super::{print_report, App};

impl App {
    /// Copy every configured source table into the target store.
    pub async fn run_migrate(&self, dry_run: bool, json: bool) -> Result<()> {
        let config = Config::load()?;
        let ctx = Context::connect(config)?;
        let source = ctx.source()?;

        if dry_run {
            tracing::info!("Dry run: nothing will be written");
        }
        let report = ctx.migrator(source).dry_run(dry_run).run().await;
        print_report(&report, json)?;

        let failed = report.failed_collections();
        if !failed.is_empty() {
            return Err(color_eyre::eyre::eyre!(
                "{} collection(s) had failures: {}",
                failed.len(),
                failed.join(", ")
            ));
        }
        Ok(())
    }
}
