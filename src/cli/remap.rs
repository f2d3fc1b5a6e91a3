//! Remap command handler.

use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;

use super::{print_report, App};

impl App {
    /// Rewrite owner identifiers found in the configured mapping.
    pub async fn run_remap(&self, dry_run: bool, json: bool) -> Result<()> {
        let config = Config::load()?;
        tracing::info!("Loaded mapping with {} entries", config.remap.mapping.len());
        let ctx = Context::connect(config)?;

        let report = ctx.rewriter()?.dry_run(dry_run).run().await;
        print_report(&report, json)?;

        let unreadable = report
            .collections
            .iter()
            .filter(|c| c.read_error.is_some())
            .count();
        if report.total_errors() > 0 || unreadable > 0 {
            return Err(color_eyre::eyre::eyre!(
                "Remap incomplete: {} write errors, {} unreadable collections",
                report.total_errors(),
                unreadable
            ));
        }
        Ok(())
    }
}
