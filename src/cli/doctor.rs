//! CLI `doctor` command — run database diagnostics and print a health report.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use rebirth::config::RebirthConfig;
use rebirth::db::{self, HealthReport};

/// Check both databases and the completion settings.
pub fn doctor(config: &RebirthConfig) -> Result<()> {
    println!("Re:Birth Health Report");
    println!("======================");

    let mut healthy = true;

    println!();
    println!("Local cache:");
    healthy &= report_database(&config.resolved_db_path(), |p| db::open_cache_database(p))?;

    println!();
    if config.remote.enabled {
        println!("Remote store:");
        healthy &= report_database(&config.resolved_remote_db_path(), |p| db::open_database(p))?;
    } else {
        println!("Remote store:      disabled");
    }

    println!();
    println!("Completion:");
    println!("  Provider:        {}", config.completion.provider);
    println!("  Endpoint:        {}", config.completion.api_url);
    println!("  Model:           {}", config.completion.model);
    if config.completion.api_key.is_empty() {
        println!("  API key:         NOT SET (set REBIRTH_API_KEY or OPENAI_API_KEY)");
    } else {
        println!("  API key:         set");
    }

    if !healthy {
        println!();
        println!("Recovery steps:");
        println!("  1. Save what can be read: rebirth export > backup.json");
        println!("  2. Remove the damaged database file and run `rebirth chat` to recreate it");
    }

    Ok(())
}

/// Print one database's report. Returns `false` if the integrity check failed.
fn report_database(path: &Path, open: fn(&Path) -> Result<Connection>) -> Result<bool> {
    println!("  Path:            {}", path.display());

    if !path.exists() {
        println!("  Status:          not created yet");
        return Ok(true);
    }

    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let conn = open(path).context("failed to open database (may be corrupt)")?;
    let report: HealthReport = db::check_database_health(&conn).context("failed to run health check")?;

    println!("  File size:       {}", format_bytes(file_size));
    if let Some(version) = report.schema_version {
        println!("  Schema version:  {version}");
    }
    let counts = [
        ("Cache entries:  ", report.cache_entries),
        ("Accounts:       ", report.user_count),
        ("Messages:       ", report.message_count),
        ("Milestones:     ", report.milestone_count),
    ];
    for (label, count) in counts {
        if let Some(n) = count {
            println!("  {label} {n}");
        }
    }
    if report.integrity_ok {
        println!("  Integrity check: PASSED");
    } else {
        println!("  Integrity check: FAILED ({})", report.integrity_details);
    }

    Ok(report.integrity_ok)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
