//! Status events as delivered by the registry and as persisted locally.
//!
//! A `StatusEvent` is the registry's wire value; an `EventRecord` is the
//! durable copy the orchestrator replays. Identity for deduplication is
//! `(application_external_id, event_time, new_status)` — the same triple
//! that forms the event-store key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ApplicationStatus, EventState};

// ---------------------------------------------------------------------------
// StatusEvent / ApplicationHistory
// ---------------------------------------------------------------------------

/// One status change reported by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub event_time: DateTime<Utc>,
    pub new_status: ApplicationStatus,
    pub application_identifier: String,
    #[serde(default)]
    pub target_status: Option<ApplicationStatus>,
}

/// The ordered batch of events the registry returns for one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationHistory {
    #[serde(rename = "applicationId")]
    pub application_external_id: i64,
    pub events: Vec<StatusEvent>,
}

// ---------------------------------------------------------------------------
// EventRecord
// ---------------------------------------------------------------------------

/// A status event persisted in the event store.
///
/// Created `Pending` when first observed; the applier moves it to
/// `Processed` or `Failed`. At most one record per application is `Failed`
/// at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub application_external_id: i64,
    pub event_time: DateTime<Utc>,
    pub new_status: ApplicationStatus,
    pub application_identifier: String,
    #[serde(default)]
    pub target_status: Option<ApplicationStatus>,
    pub state: EventState,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_detail: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
}

impl EventRecord {
    /// Create a new `Pending` record from a registry event.
    pub fn new(application_external_id: i64, event: &StatusEvent) -> Self {
        Self {
            application_external_id,
            event_time: event.event_time,
            new_status: event.new_status,
            application_identifier: event.application_identifier.clone(),
            target_status: event.target_status,
            state: EventState::Pending,
            created_at: Utc::now(),
            processed_at: None,
            error_detail: None,
            retry_count: 0,
        }
    }

    /// Compact form for log lines.
    pub fn log_string(&self) -> String {
        format!(
            "externalId={}, eventTime={}, identifier={}, newStatus={}, state={}",
            self.application_external_id,
            self.event_time,
            self.application_identifier,
            self.new_status,
            self.state
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
