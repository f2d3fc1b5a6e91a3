//! Username check command handler.

use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;
use crate::services::UsernameCheck;

use super::App;

impl App {
    pub async fn run_check_username(
        &self,
        username: &str,
        owner: Option<&str>,
        json: bool,
    ) -> Result<()> {
        let config = Config::load()?;
        let ctx = Context::connect(config)?;

        let check = ctx.profiles().check_username(username, owner).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&check)?);
            return Ok(());
        }
        match check {
            UsernameCheck::Available => println!("'{}' is available", username),
            UsernameCheck::Invalid => println!(
                "'{}' is not a valid username (letters, digits, '_', '-', '.')",
                username
            ),
            UsernameCheck::Taken {
                profile_id,
                owner_id,
            } => println!(
                "'{}' is taken by profile {} (owner {})",
                username,
                profile_id,
                owner_id.as_deref().unwrap_or("<missing>")
            ),
        }
        Ok(())
    }
}
