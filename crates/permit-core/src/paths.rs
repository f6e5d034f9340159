use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SYNC_DIR: &str = ".permit-sync";
pub const DECISIONS_DIR: &str = ".permit-sync/decisions";

pub const CONFIG_FILE: &str = ".permit-sync/config.yaml";
pub const DIRECTORY_FILE: &str = ".permit-sync/directory.yaml";
pub const EVENTS_DB_FILE: &str = ".permit-sync/events.redb";
pub const OUTBOX_FILE: &str = ".permit-sync/outbox.log";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn sync_dir(root: &Path) -> PathBuf {
    root.join(SYNC_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn directory_path(root: &Path) -> PathBuf {
    root.join(DIRECTORY_FILE)
}

pub fn events_db_path(root: &Path) -> PathBuf {
    root.join(EVENTS_DB_FILE)
}

pub fn outbox_path(root: &Path) -> PathBuf {
    root.join(OUTBOX_FILE)
}

pub fn decisions_dir(root: &Path) -> PathBuf {
    root.join(DECISIONS_DIR)
}

/// File name for a stored decision document, e.g. `KP2600001-decision.pdf`.
pub fn decision_file_name(identifier: &str, suffix: &str) -> String {
    format!("{identifier}-{suffix}.pdf")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.permit-sync/config.yaml")
        );
        assert_eq!(
            events_db_path(root),
            PathBuf::from("/tmp/proj/.permit-sync/events.redb")
        );
        assert_eq!(
            decision_file_name("KP2600001", "operational-condition"),
            "KP2600001-operational-condition.pdf"
        );
    }
}
