//! The application aggregate as seen by the sync core.
//!
//! The aggregate itself (contacts, geometry, form data) is owned by a
//! collaborator; the core reads and writes only the registry-facing fields
//! `external_id`, `external_status` and `identifier`.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::ApplicationStatus;

// ---------------------------------------------------------------------------
// Application / Contact
// ---------------------------------------------------------------------------

/// The slice of a permit application the sync core operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub name: String,
    /// `None` until the application has been submitted to the registry;
    /// unsubmitted applications are excluded from polling.
    #[serde(default)]
    pub external_id: Option<i64>,
    #[serde(default)]
    pub external_status: Option<ApplicationStatus>,
    /// Registry-issued identifier, e.g. "JS2600042".
    #[serde(default)]
    pub identifier: Option<String>,
}

impl Application {
    pub fn log_string(&self) -> String {
        format!(
            "id={}, externalId={:?}, identifier={:?}, status={:?}",
            self.id, self.external_id, self.identifier, self.external_status
        )
    }
}

/// A person attached to an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewApplications,
    EditApplications,
}

// ---------------------------------------------------------------------------
// ApplicationStore
// ---------------------------------------------------------------------------

/// Persistence seam for the application aggregate.
pub trait ApplicationStore {
    /// External ids of every submitted application (`external_id` set).
    fn tracked_external_ids(&self) -> Result<Vec<i64>>;

    fn find_by_external_id(&self, external_id: i64) -> Result<Option<Application>>;

    /// Write the registry-facing fields. Called last in a transition, after
    /// every external call has succeeded.
    fn update_registry_fields(
        &self,
        application_id: i64,
        status: ApplicationStatus,
        identifier: &str,
    ) -> Result<()>;

    /// Contacts on the application holding the given permission.
    fn contacts_with_permission(
        &self,
        application_id: i64,
        permission: Permission,
    ) -> Result<Vec<Contact>>;
}
