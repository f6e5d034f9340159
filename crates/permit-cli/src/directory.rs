//! File-backed implementations of the sync core's collaborator seams.
//!
//! `directory.yaml` holds the application slice the core operates on plus
//! supplements, amendments and decision records. Decision documents are
//! stored as files under `.permit-sync/decisions/`, and notifications are
//! appended as JSON lines to `outbox.log` for a downstream mailer to drain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

use permit_core::amendment::{Amendment, AmendmentStore};
use permit_core::application::{Application, ApplicationStore, Contact, Permission};
use permit_core::decision::{DecisionRecord, DecisionStore};
use permit_core::error::{Result, SyncError};
use permit_core::notify::{Notification, Notifier};
use permit_core::registry::ApplicationMetadata;
use permit_core::supplement::{SupplementRequest, SupplementStore};
use permit_core::types::{ApplicationStatus, DecisionKind};
use permit_core::{io, paths};

// ---------------------------------------------------------------------------
// Directory file format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryApplication {
    #[serde(flatten)]
    pub application: Application,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub work_description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryFile {
    #[serde(default)]
    pub applications: Vec<DirectoryApplication>,
    #[serde(default)]
    pub supplements: Vec<SupplementRequest>,
    #[serde(default)]
    pub amendments: Vec<Amendment>,
    #[serde(default)]
    pub decisions: Vec<DecisionRecord>,
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// YAML-file directory, rewritten atomically after every mutation.
pub struct Directory {
    root: PathBuf,
    state: RefCell<DirectoryFile>,
}

impl Directory {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::directory_path(root);
        if !path.exists() {
            return Err(SyncError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let file: DirectoryFile = serde_yaml::from_str(&data)?;
        Ok(Self {
            root: root.to_path_buf(),
            state: RefCell::new(file),
        })
    }

    /// Write an empty directory file. Used by `init`.
    pub fn create(root: &Path) -> Result<Self> {
        let dir = Self {
            root: root.to_path_buf(),
            state: RefCell::new(DirectoryFile::default()),
        };
        dir.save()?;
        Ok(dir)
    }

    fn save(&self) -> Result<()> {
        let data = serde_yaml::to_string(&*self.state.borrow())?;
        io::atomic_write(&paths::directory_path(&self.root), data.as_bytes())
    }

    pub fn applications(&self) -> Vec<DirectoryApplication> {
        self.state.borrow().applications.clone()
    }

    /// Track a new application. Ids are assigned locally and never reused.
    pub fn track(
        &self,
        name: &str,
        external_id: i64,
        contacts: Vec<Contact>,
    ) -> Result<Application> {
        let mut state = self.state.borrow_mut();
        if state
            .applications
            .iter()
            .any(|a| a.application.external_id == Some(external_id))
        {
            return Err(SyncError::ApplicationExists(external_id));
        }
        let id = state
            .applications
            .iter()
            .map(|a| a.application.id)
            .max()
            .unwrap_or(0)
            + 1;
        let application = Application {
            id,
            name: name.to_string(),
            external_id: Some(external_id),
            external_status: None,
            identifier: None,
        };
        state.applications.push(DirectoryApplication {
            application: application.clone(),
            contacts,
            work_description: None,
        });
        drop(state);
        self.save()?;
        Ok(application)
    }
}

impl ApplicationStore for Directory {
    fn tracked_external_ids(&self) -> Result<Vec<i64>> {
        Ok(self
            .state
            .borrow()
            .applications
            .iter()
            .filter_map(|a| a.application.external_id)
            .collect())
    }

    fn find_by_external_id(&self, external_id: i64) -> Result<Option<Application>> {
        Ok(self
            .state
            .borrow()
            .applications
            .iter()
            .find(|a| a.application.external_id == Some(external_id))
            .map(|a| a.application.clone()))
    }

    fn update_registry_fields(
        &self,
        application_id: i64,
        status: ApplicationStatus,
        identifier: &str,
    ) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            let entry = state
                .applications
                .iter_mut()
                .find(|a| a.application.id == application_id)
                .ok_or(SyncError::ApplicationNotFound(application_id))?;
            entry.application.external_status = Some(status);
            entry.application.identifier = Some(identifier.to_string());
        }
        self.save()
    }

    fn contacts_with_permission(
        &self,
        application_id: i64,
        permission: Permission,
    ) -> Result<Vec<Contact>> {
        Ok(self
            .state
            .borrow()
            .applications
            .iter()
            .find(|a| a.application.id == application_id)
            .map(|a| {
                a.contacts
                    .iter()
                    .filter(|c| c.permissions.contains(&permission))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl SupplementStore for Directory {
    fn find_by_application(&self, application_id: i64) -> Result<Option<SupplementRequest>> {
        Ok(self
            .state
            .borrow()
            .supplements
            .iter()
            .find(|s| s.application_id == application_id)
            .cloned())
    }

    fn save(&self, request: SupplementRequest) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            state
                .supplements
                .retain(|s| s.application_id != request.application_id);
            state.supplements.push(request);
        }
        Directory::save(self)
    }

    fn delete_by_application(&self, application_id: i64) -> Result<()> {
        self.state
            .borrow_mut()
            .supplements
            .retain(|s| s.application_id != application_id);
        Directory::save(self)
    }
}

impl AmendmentStore for Directory {
    fn find_by_application(&self, application_id: i64) -> Result<Option<Amendment>> {
        Ok(self
            .state
            .borrow()
            .amendments
            .iter()
            .find(|a| a.application_id == application_id)
            .cloned())
    }

    fn merge_and_delete(&self, amendment: &Amendment) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            let entry = state
                .applications
                .iter_mut()
                .find(|a| a.application.id == amendment.application_id)
                .ok_or(SyncError::ApplicationNotFound(amendment.application_id))?;
            if let Some(name) = &amendment.name {
                entry.application.name = name.clone();
            }
            if let Some(description) = &amendment.work_description {
                entry.work_description = Some(description.clone());
            }
            state
                .amendments
                .retain(|a| a.application_id != amendment.application_id);
        }
        Directory::save(self)
    }

    fn delete_by_application(&self, application_id: i64) -> Result<()> {
        self.state
            .borrow_mut()
            .amendments
            .retain(|a| a.application_id != application_id);
        Directory::save(self)
    }
}

impl DecisionStore for Directory {
    fn exists(&self, identifier: &str, kind: DecisionKind) -> Result<bool> {
        Ok(self
            .state
            .borrow()
            .decisions
            .iter()
            .any(|d| d.identifier_at_issuance == identifier && d.kind == kind))
    }

    fn save(
        &self,
        application_id: i64,
        identifier: &str,
        kind: DecisionKind,
        metadata: &ApplicationMetadata,
        document: Vec<u8>,
    ) -> Result<()> {
        let file_name = paths::decision_file_name(identifier, kind.file_suffix());
        let blob_path = paths::decisions_dir(&self.root).join(&file_name);
        io::atomic_write(&blob_path, &document)?;

        self.state.borrow_mut().decisions.push(DecisionRecord {
            application_id,
            identifier_at_issuance: identifier.to_string(),
            kind,
            blob_location: format!("{}/{file_name}", paths::DECISIONS_DIR),
            replaced: false,
            application_name: Some(metadata.name.clone()),
        });
        Directory::save(self)
    }

    fn mark_replaced(&self, identifier: &str) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            for decision in state
                .decisions
                .iter_mut()
                .filter(|d| d.identifier_at_issuance == identifier)
            {
                decision.replaced = true;
            }
        }
        Directory::save(self)
    }
}

// ---------------------------------------------------------------------------
// OutboxNotifier
// ---------------------------------------------------------------------------

/// Appends one JSON line per notification to `.permit-sync/outbox.log`.
pub struct OutboxNotifier {
    path: PathBuf,
}

impl OutboxNotifier {
    pub fn new(root: &Path) -> Self {
        Self {
            path: paths::outbox_path(root),
        }
    }
}

#[derive(Serialize)]
struct OutboxLine<'a> {
    sent_at: DateTime<Utc>,
    #[serde(flatten)]
    notification: &'a Notification,
}

impl Notifier for OutboxNotifier {
    fn notify(&self, notification: Notification) -> Result<()> {
        let line = serde_json::to_string(&OutboxLine {
            sent_at: Utc::now(),
            notification: &notification,
        })?;
        if let Some(parent) = self.path.parent() {
            io::ensure_dir(parent)?;
        }
        io::append_text(&self.path, &format!("{line}\n"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn edit_contact(email: &str) -> Contact {
        Contact {
            email: email.to_string(),
            permissions: vec![Permission::EditApplications],
        }
    }

    #[test]
    fn track_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let directory = Directory::create(dir.path()).unwrap();
        let app = directory
            .track("Cable work", 42, vec![edit_contact("a@example.com")])
            .unwrap();
        assert_eq!(app.id, 1);

        let reloaded = Directory::load(dir.path()).unwrap();
        assert_eq!(reloaded.tracked_external_ids().unwrap(), vec![42]);
        let found = reloaded.find_by_external_id(42).unwrap().unwrap();
        assert_eq!(found.name, "Cable work");
        assert!(found.external_status.is_none());
    }

    #[test]
    fn track_rejects_duplicate_external_id() {
        let dir = TempDir::new().unwrap();
        let directory = Directory::create(dir.path()).unwrap();
        directory.track("First", 42, vec![]).unwrap();
        assert!(matches!(
            directory.track("Second", 42, vec![]),
            Err(SyncError::ApplicationExists(42))
        ));
    }

    #[test]
    fn update_registry_fields_survives_reload() {
        let dir = TempDir::new().unwrap();
        let directory = Directory::create(dir.path()).unwrap();
        directory.track("Cable work", 42, vec![]).unwrap();
        directory
            .update_registry_fields(1, ApplicationStatus::Handling, "JS2600042")
            .unwrap();

        let reloaded = Directory::load(dir.path()).unwrap();
        let app = reloaded.find_by_external_id(42).unwrap().unwrap();
        assert_eq!(app.external_status, Some(ApplicationStatus::Handling));
        assert_eq!(app.identifier.as_deref(), Some("JS2600042"));
    }

    #[test]
    fn decision_save_writes_blob_file() {
        let dir = TempDir::new().unwrap();
        let directory = Directory::create(dir.path()).unwrap();
        directory.track("Cable work", 42, vec![]).unwrap();

        let metadata = ApplicationMetadata {
            name: "Cable work".to_string(),
            decision_date: None,
        };
        DecisionStore::save(
            &directory,
            1,
            "KP2600042",
            DecisionKind::Decision,
            &metadata,
            b"%PDF-1.7".to_vec(),
        )
        .unwrap();

        let blob = paths::decisions_dir(dir.path()).join("KP2600042-decision.pdf");
        assert_eq!(std::fs::read(blob).unwrap(), b"%PDF-1.7");
        assert!(directory.exists("KP2600042", DecisionKind::Decision).unwrap());
        assert!(!directory.exists("KP2600042", DecisionKind::Finished).unwrap());
    }

    #[test]
    fn amendment_merge_updates_application() {
        let dir = TempDir::new().unwrap();
        let directory = Directory::create(dir.path()).unwrap();
        directory.track("Old name", 42, vec![]).unwrap();
        let amendment = Amendment {
            application_id: 1,
            name: Some("New name".to_string()),
            work_description: Some("Extended excavation".to_string()),
        };
        directory.merge_and_delete(&amendment).unwrap();

        let reloaded = Directory::load(dir.path()).unwrap();
        let app = reloaded.find_by_external_id(42).unwrap().unwrap();
        assert_eq!(app.name, "New name");
        assert!(AmendmentStore::find_by_application(&reloaded, 1)
            .unwrap()
            .is_none());
    }

    #[test]
    fn outbox_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let notifier = OutboxNotifier::new(dir.path());
        notifier
            .notify(Notification::SupplementCancelled {
                email: "a@example.com".to_string(),
                application_id: 1,
                identifier: "JS2600042".to_string(),
            })
            .unwrap();

        let content = std::fs::read_to_string(paths::outbox_path(dir.path())).unwrap();
        assert_eq!(content.lines().count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed["type"], "supplement_cancelled");
        assert_eq!(parsed["email"], "a@example.com");
    }
}
