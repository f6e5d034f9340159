//! Registry client: the network seam to the external case-processing system.
//!
//! The orchestrator and the transition applier depend on the
//! `RegistryClient` trait; `HttpRegistryClient` is the blocking reqwest
//! implementation. Every call has a timeout, and a timeout surfaces as a
//! transition failure, never as a crash of the whole run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::event::ApplicationHistory;
use crate::types::{DecisionKind, SupplementFieldKey};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Detail of an open supplement request, as returned by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementRequestDetail {
    #[serde(rename = "informationRequestId")]
    pub request_id: i64,
    pub fields: Vec<SupplementRequestField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementRequestField {
    pub field_key: SupplementFieldKey,
    pub request_description: String,
}

/// Application metadata fetched alongside a decision document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationMetadata {
    pub name: String,
    #[serde(default)]
    pub decision_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery<'a> {
    application_ids: &'a [i64],
    events_after: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// RegistryClient
// ---------------------------------------------------------------------------

/// Read access to the registry's status, document and request endpoints.
pub trait RegistryClient {
    /// Ordered status-event batches per application, events after `since`.
    fn fetch_histories(
        &self,
        ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<Vec<ApplicationHistory>>;

    /// Detail of the application's open supplement request, if the registry
    /// still has one.
    fn fetch_supplement_request(&self, external_id: i64)
        -> Result<Option<SupplementRequestDetail>>;

    /// The decision document for the given kind.
    fn fetch_decision_document(&self, kind: DecisionKind, external_id: i64) -> Result<Vec<u8>>;

    fn fetch_application_metadata(&self, external_id: i64) -> Result<ApplicationMetadata>;
}

// ---------------------------------------------------------------------------
// HttpRegistryClient
// ---------------------------------------------------------------------------

/// Blocking HTTP implementation with bearer-token auth.
pub struct HttpRegistryClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl HttpRegistryClient {
    pub fn new(base_url: &str, api_key: &str, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Registry(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn get(&self, path: &str) -> Result<reqwest::blocking::Response> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| SyncError::Registry(e.to_string()))?;
        check_status(response)
    }

    fn document_path(kind: DecisionKind, external_id: i64) -> String {
        let endpoint = match kind {
            DecisionKind::Decision => "decision",
            DecisionKind::OperationalCondition => "operationalcondition",
            DecisionKind::Finished => "workfinished",
        };
        format!("/v2/applications/{external_id}/{endpoint}")
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(SyncError::RegistryStatus {
        status: status.as_u16(),
        body: response.text().unwrap_or_default(),
    })
}

impl RegistryClient for HttpRegistryClient {
    fn fetch_histories(
        &self,
        ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<Vec<ApplicationHistory>> {
        let response = self
            .client
            .post(format!("{}/v2/applicationhistory", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&HistoryQuery {
                application_ids: ids,
                events_after: since,
            })
            .send()
            .map_err(|e| SyncError::Registry(e.to_string()))?;
        check_status(response)?
            .json()
            .map_err(|e| SyncError::Registry(e.to_string()))
    }

    fn fetch_supplement_request(
        &self,
        external_id: i64,
    ) -> Result<Option<SupplementRequestDetail>> {
        let response = self
            .client
            .get(format!(
                "{}/v2/applications/{external_id}/informationrequests",
                self.base_url
            ))
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| SyncError::Registry(e.to_string()))?;
        // 404 means the registry retracted the request before we read it.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(response)?
            .json()
            .map(Some)
            .map_err(|e| SyncError::Registry(e.to_string()))
    }

    fn fetch_decision_document(&self, kind: DecisionKind, external_id: i64) -> Result<Vec<u8>> {
        let response = self.get(&Self::document_path(kind, external_id))?;
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| SyncError::Registry(e.to_string()))
    }

    fn fetch_application_metadata(&self, external_id: i64) -> Result<ApplicationMetadata> {
        self.get(&format!("/v2/applications/{external_id}"))?
            .json()
            .map_err(|e| SyncError::Registry(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
