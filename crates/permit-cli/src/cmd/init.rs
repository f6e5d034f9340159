use crate::directory::Directory;
use anyhow::Context;
use permit_core::{config::SyncConfig, io, paths};
use std::path::Path;

pub fn run(root: &Path, base_url: &str) -> anyhow::Result<()> {
    println!("Initializing permit-sync in: {}", root.display());

    for dir in [paths::SYNC_DIR, paths::DECISIONS_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    let config_path = paths::config_path(root);
    if !config_path.exists() {
        SyncConfig::new(base_url)
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    let directory_path = paths::directory_path(root);
    if !directory_path.exists() {
        Directory::create(root).context("failed to write directory.yaml")?;
        println!("  created: {}", paths::DIRECTORY_FILE);
    } else {
        println!("  exists:  {}", paths::DIRECTORY_FILE);
    }

    println!("\npermit-sync initialized.");
    println!("Set PERMIT_SYNC_API_KEY, then: permit-sync app track --name \"...\" --external-id <id>");

    Ok(())
}
