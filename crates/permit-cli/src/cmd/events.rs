use crate::output::{print_json, print_table};
use anyhow::Context;
use permit_core::paths;
use permit_core::store::EventDb;
use std::path::Path;

pub fn run(root: &Path, limit: usize, failed: bool, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let records = if failed {
        db.failed_records()?
    } else {
        db.list_recent(limit)?
    };

    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        if failed {
            println!("No failed events.");
        } else {
            println!("No status events recorded yet. Run: permit-sync sync");
        }
        return Ok(());
    }
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.application_external_id.to_string(),
                r.event_time.to_rfc3339(),
                r.new_status.to_string(),
                r.state.to_string(),
                r.retry_count.to_string(),
                r.error_detail.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(
        &["REGISTRY ID", "EVENT TIME", "STATUS", "STATE", "RETRIES", "ERROR"],
        rows,
    );
    Ok(())
}

pub fn watermark(root: &Path, json: bool) -> anyhow::Result<()> {
    let db = open_db(root)?;
    let watermark = db.last_synced_at()?;

    if json {
        return print_json(&serde_json::json!({ "last_synced_at": watermark }));
    }
    if watermark.timestamp_millis() == 0 {
        println!("No sync run yet; the first run fetches the full history.");
    } else {
        println!("last synced: {}", watermark.to_rfc3339());
    }
    Ok(())
}

fn open_db(root: &Path) -> anyhow::Result<EventDb> {
    anyhow::ensure!(
        paths::sync_dir(root).is_dir(),
        "not initialized; run: permit-sync init --base-url <url>"
    );
    EventDb::open(&paths::events_db_path(root)).context("failed to open event store")
}
