//! Supplement requests: the registry asking for more information.
//!
//! A request is persisted when a WAITING_INFORMATION transition succeeds
//! and deleted when the application returns to HANDLING.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::SupplementFieldKey;

/// A registry-issued request for additional information, halting the
/// application in WAITING_INFORMATION.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplementRequest {
    pub application_id: i64,
    pub external_request_id: i64,
    /// Requested field -> the case handler's description of what is missing.
    pub fields: BTreeMap<SupplementFieldKey, String>,
}

/// Persistence seam for supplement requests and their draft responses.
pub trait SupplementStore {
    fn find_by_application(&self, application_id: i64) -> Result<Option<SupplementRequest>>;

    fn save(&self, request: SupplementRequest) -> Result<()>;

    /// Remove the request and any draft response being prepared for it.
    fn delete_by_application(&self, application_id: i64) -> Result<()>;
}
