use crate::output::print_json;
use anyhow::Context;
use permit_core::config::SyncConfig;
use permit_core::paths;
use permit_core::store::EventDb;
use std::path::Path;

pub fn run(root: &Path, days: Option<i64>, json: bool) -> anyhow::Result<()> {
    let config = SyncConfig::load(root).context("failed to load config")?;
    let days = days.unwrap_or(config.retention_days);
    anyhow::ensure!(days > 0, "retention must be at least one day");

    let db = EventDb::open(&paths::events_db_path(root)).context("failed to open event store")?;
    let deleted = db.purge_processed_older_than(days)?;

    if json {
        return print_json(&serde_json::json!({ "deleted": deleted, "days": days }));
    }
    println!("purged {deleted} processed event(s) older than {days} days");
    Ok(())
}
