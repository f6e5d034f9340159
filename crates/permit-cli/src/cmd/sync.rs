use crate::directory::{Directory, OutboxNotifier};
use anyhow::Context;
use permit_core::config::SyncConfig;
use permit_core::orchestrator::SyncOrchestrator;
use permit_core::paths;
use permit_core::registry::HttpRegistryClient;
use permit_core::store::EventDb;
use std::path::Path;

pub fn run(root: &Path, watch: bool, interval_secs: Option<u64>) -> anyhow::Result<()> {
    let config = SyncConfig::load(root).context("failed to load config")?;
    let db = EventDb::open(&paths::events_db_path(root)).context("failed to open event store")?;
    let registry = HttpRegistryClient::new(
        &config.registry.base_url,
        &config.registry.api_key,
        config.registry.timeout(),
    )?;
    let directory = Directory::load(root).context("failed to load directory")?;
    let notifier = OutboxNotifier::new(root);

    loop {
        let orchestrator = SyncOrchestrator::new(
            &db, &registry, &directory, &directory, &directory, &directory, &notifier,
        );
        match orchestrator.handle_updates() {
            Ok(()) => {
                let failed = db.failed_records()?.len();
                if failed > 0 {
                    println!("sync finished with {failed} failed event(s), retried next run");
                } else {
                    println!("sync finished");
                }
            }
            Err(e) if watch => tracing::error!(error = %e, "sync run failed"),
            Err(e) => return Err(e.into()),
        }

        if !watch {
            break;
        }
        let interval = interval_secs.unwrap_or(config.poll_interval_secs);
        std::thread::sleep(std::time::Duration::from_secs(interval));
    }

    Ok(())
}
