//! CLI `reset` command — erase history, profile, and progress after confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use rebirth::config::RebirthConfig;

use super::open_runtime;

/// Clear the session after user confirmation. A signed-in account stays signed in.
pub async fn reset(config: &RebirthConfig) -> Result<()> {
    println!("WARNING: This will permanently delete your conversation, profile, and progress.");
    println!("Database: {}", config.resolved_db_path().display());
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        bail!("reset cancelled");
    }

    let mut rt = open_runtime(config).await?;
    let durable = rt.session.reset_session().await;
    rt.session.close()?;
    if !durable {
        bail!("the local cache could not be fully cleared");
    }

    println!("Reset complete. Run `rebirth chat` to start again.");
    Ok(())
}
