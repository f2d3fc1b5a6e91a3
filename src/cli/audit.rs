//! Audit command handler.

use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;

use super::{print_report, App};

impl App {
    /// Report the records reachable from a username.
    pub async fn run_audit(&self, username: &str, json: bool) -> Result<()> {
        let config = Config::load()?;
        let ctx = Context::connect(config)?;

        let report = ctx.auditor().audit(username).await?;
        print_report(&report, json)?;

        let stale = report.stale_owner_ids();
        if !stale.is_empty() {
            tracing::warn!(
                "Records still reference old identifiers ({}); run `folio-migrate remap`",
                stale.join(", ")
            );
        }
        Ok(())
    }
}
