use anyhow::Result;

use rebirth::config::RebirthConfig;
use rebirth::store::LocalCache;

/// Export every local cache entry as JSON to stdout.
pub fn export(config: &RebirthConfig) -> Result<()> {
    let cache = LocalCache::open(config.resolved_db_path())?;
    let data = cache.dump()?;

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    let messages = data
        .get("conversation_history")
        .and_then(|v| v.as_array())
        .map_or(0, Vec::len);
    eprintln!("Exported {} cache entries ({messages} messages).", data.len());

    Ok(())
}
