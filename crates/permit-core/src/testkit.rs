//! In-memory collaborator fakes shared by the transition and orchestrator
//! tests. Compiled for tests only.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::amendment::{Amendment, AmendmentStore};
use crate::application::{Application, ApplicationStore, Contact, Permission};
use crate::decision::{DecisionRecord, DecisionStore};
use crate::error::{Result, SyncError};
use crate::event::{ApplicationHistory, EventRecord, StatusEvent};
use crate::notify::{Notification, Notifier};
use crate::registry::{ApplicationMetadata, RegistryClient, SupplementRequestDetail};
use crate::supplement::{SupplementRequest, SupplementStore};
use crate::types::{ApplicationStatus, DecisionKind};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn application(id: i64, external_id: i64, status: Option<ApplicationStatus>) -> Application {
    Application {
        id,
        name: format!("test application {id}"),
        external_id: Some(external_id),
        external_status: status,
        identifier: status.map(|_| format!("JS26000{id:02}")),
    }
}

pub fn status_event(
    time: DateTime<Utc>,
    status: ApplicationStatus,
    identifier: &str,
) -> StatusEvent {
    StatusEvent {
        event_time: time,
        new_status: status,
        application_identifier: identifier.to_string(),
        target_status: None,
    }
}

pub fn event_record(
    external_id: i64,
    time: DateTime<Utc>,
    status: ApplicationStatus,
    identifier: &str,
) -> EventRecord {
    EventRecord::new(external_id, &status_event(time, status, identifier))
}

pub fn edit_contact(email: &str) -> Contact {
    Contact {
        email: email.to_string(),
        permissions: vec![Permission::EditApplications],
    }
}

pub fn view_contact(email: &str) -> Contact {
    Contact {
        email: email.to_string(),
        permissions: vec![Permission::ViewApplications],
    }
}

// ---------------------------------------------------------------------------
// FakeDirectory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct DirectoryState {
    pub applications: Vec<Application>,
    pub contacts: HashMap<i64, Vec<Contact>>,
    pub supplements: Vec<SupplementRequest>,
    pub amendments: Vec<Amendment>,
    pub decisions: Vec<DecisionRecord>,
    pub merged_amendments: Vec<Amendment>,
}

/// In-memory stand-in for every collaborator-owned aggregate.
#[derive(Default)]
pub struct FakeDirectory {
    pub state: Mutex<DirectoryState>,
}

impl FakeDirectory {
    pub fn add_application(&self, app: Application, contacts: Vec<Contact>) {
        let mut state = self.state.lock().unwrap();
        state.contacts.insert(app.id, contacts);
        state.applications.push(app);
    }

    pub fn add_supplement(&self, request: SupplementRequest) {
        self.state.lock().unwrap().supplements.push(request);
    }

    pub fn add_amendment(&self, amendment: Amendment) {
        self.state.lock().unwrap().amendments.push(amendment);
    }

    pub fn add_decision(&self, record: DecisionRecord) {
        self.state.lock().unwrap().decisions.push(record);
    }

    pub fn application(&self, id: i64) -> Application {
        self.state
            .lock()
            .unwrap()
            .applications
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .unwrap()
    }
}

impl ApplicationStore for FakeDirectory {
    fn tracked_external_ids(&self) -> Result<Vec<i64>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .applications
            .iter()
            .filter_map(|a| a.external_id)
            .collect())
    }

    fn find_by_external_id(&self, external_id: i64) -> Result<Option<Application>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .applications
            .iter()
            .find(|a| a.external_id == Some(external_id))
            .cloned())
    }

    fn update_registry_fields(
        &self,
        application_id: i64,
        status: ApplicationStatus,
        identifier: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let app = state
            .applications
            .iter_mut()
            .find(|a| a.id == application_id)
            .ok_or(SyncError::ApplicationNotFound(application_id))?;
        app.external_status = Some(status);
        app.identifier = Some(identifier.to_string());
        Ok(())
    }

    fn contacts_with_permission(
        &self,
        application_id: i64,
        permission: Permission,
    ) -> Result<Vec<Contact>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .contacts
            .get(&application_id)
            .map(|contacts| {
                contacts
                    .iter()
                    .filter(|c| c.permissions.contains(&permission))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl SupplementStore for FakeDirectory {
    fn find_by_application(&self, application_id: i64) -> Result<Option<SupplementRequest>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .supplements
            .iter()
            .find(|s| s.application_id == application_id)
            .cloned())
    }

    fn save(&self, request: SupplementRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .supplements
            .retain(|s| s.application_id != request.application_id);
        state.supplements.push(request);
        Ok(())
    }

    fn delete_by_application(&self, application_id: i64) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .supplements
            .retain(|s| s.application_id != application_id);
        Ok(())
    }
}

impl AmendmentStore for FakeDirectory {
    fn find_by_application(&self, application_id: i64) -> Result<Option<Amendment>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .amendments
            .iter()
            .find(|a| a.application_id == application_id)
            .cloned())
    }

    fn merge_and_delete(&self, amendment: &Amendment) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(name) = &amendment.name {
            if let Some(app) = state
                .applications
                .iter_mut()
                .find(|a| a.id == amendment.application_id)
            {
                app.name = name.clone();
            }
        }
        state
            .amendments
            .retain(|a| a.application_id != amendment.application_id);
        state.merged_amendments.push(amendment.clone());
        Ok(())
    }

    fn delete_by_application(&self, application_id: i64) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .amendments
            .retain(|a| a.application_id != application_id);
        Ok(())
    }
}

impl DecisionStore for FakeDirectory {
    fn exists(&self, identifier: &str, kind: DecisionKind) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
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
        self.state.lock().unwrap().decisions.push(DecisionRecord {
            application_id,
            identifier_at_issuance: identifier.to_string(),
            kind,
            blob_location: format!("blob://{identifier}-{}", kind.file_suffix()),
            replaced: false,
            application_name: Some(metadata.name.clone()),
        });
        let _ = document;
        Ok(())
    }

    fn mark_replaced(&self, identifier: &str) -> Result<()> {
        for decision in self
            .state
            .lock()
            .unwrap()
            .decisions
            .iter_mut()
            .filter(|d| d.identifier_at_issuance == identifier)
        {
            decision.replaced = true;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedRegistry
// ---------------------------------------------------------------------------

/// Registry fake with scripted history responses and failure injection.
#[derive(Default)]
pub struct ScriptedRegistry {
    /// Responses popped front-first, one per `fetch_histories` call.
    pub history_responses: Mutex<VecDeque<Vec<ApplicationHistory>>>,
    /// `(ids, since)` of every `fetch_histories` call, for assertions.
    pub history_calls: Mutex<Vec<(Vec<i64>, DateTime<Utc>)>>,
    pub supplement_requests: Mutex<HashMap<i64, SupplementRequestDetail>>,
    /// External ids whose document fetch fails with a transient error.
    pub fail_documents_for: Mutex<HashSet<i64>>,
    pub document_fetches: AtomicUsize,
    pub metadata_fetches: AtomicUsize,
}

impl ScriptedRegistry {
    pub fn push_history(&self, histories: Vec<ApplicationHistory>) {
        self.history_responses.lock().unwrap().push_back(histories);
    }

    pub fn set_supplement_request(&self, external_id: i64, detail: SupplementRequestDetail) {
        self.supplement_requests
            .lock()
            .unwrap()
            .insert(external_id, detail);
    }

    pub fn fail_document_fetch(&self, external_id: i64) {
        self.fail_documents_for
            .lock()
            .unwrap()
            .insert(external_id);
    }

    pub fn restore_document_fetch(&self, external_id: i64) {
        self.fail_documents_for
            .lock()
            .unwrap()
            .remove(&external_id);
    }
}

impl RegistryClient for ScriptedRegistry {
    fn fetch_histories(
        &self,
        ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<Vec<ApplicationHistory>> {
        self.history_calls
            .lock()
            .unwrap()
            .push((ids.to_vec(), since));
        Ok(self
            .history_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    fn fetch_supplement_request(
        &self,
        external_id: i64,
    ) -> Result<Option<SupplementRequestDetail>> {
        Ok(self
            .supplement_requests
            .lock()
            .unwrap()
            .get(&external_id)
            .cloned())
    }

    fn fetch_decision_document(&self, kind: DecisionKind, external_id: i64) -> Result<Vec<u8>> {
        if self
            .fail_documents_for
            .lock()
            .unwrap()
            .contains(&external_id)
        {
            return Err(SyncError::Registry(format!(
                "document endpoint timed out for {external_id}"
            )));
        }
        self.document_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(format!("%PDF {kind} {external_id}").into_bytes())
    }

    fn fetch_application_metadata(&self, external_id: i64) -> Result<ApplicationMetadata> {
        self.metadata_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(ApplicationMetadata {
            name: format!("application {external_id}"),
            decision_date: None,
        })
    }
}
