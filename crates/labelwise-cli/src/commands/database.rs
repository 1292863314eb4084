use std::path::PathBuf;

use anyhow::Result;

use labelwise_core::config::Config;
use risk_engine::RiskDatabase;

pub fn execute(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = path.or_else(|| config.database.path.as_ref().map(PathBuf::from));
    let database = match &path {
        Some(path) => RiskDatabase::load(path)?,
        None => RiskDatabase::builtin()?,
    };

    let source = path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());
    println!("Source: {source}");
    println!("Version: {}", database.version());
    println!("Fingerprint: {}", database.fingerprint());
    println!("Records: {}", database.len());
    for (tier, count) in database.tier_counts() {
        println!("  {tier}: {count}");
    }
    Ok(())
}
