//! Decision records: one per downloaded decision document.
//!
//! The `(identifier_at_issuance, kind)` pair is the idempotence guard: a
//! re-delivered decision event after a revert/reissue cycle finds the
//! existing record and skips the download and the notification.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registry::ApplicationMetadata;
use crate::types::DecisionKind;

/// A stored decision document and the application state at issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub application_id: i64,
    /// The registry identifier the decision was issued under. A later
    /// reissue changes the identifier, so this is part of the guard key.
    pub identifier_at_issuance: String,
    pub kind: DecisionKind,
    pub blob_location: String,
    /// Set when the registry reports the identifier as REPLACED.
    #[serde(default)]
    pub replaced: bool,
    /// Application name at issuance, from registry metadata.
    #[serde(default)]
    pub application_name: Option<String>,
}

/// Persistence seam for decision records and their document blobs.
pub trait DecisionStore {
    fn exists(&self, identifier: &str, kind: DecisionKind) -> Result<bool>;

    /// Store the document blob and persist a record referencing it.
    fn save(
        &self,
        application_id: i64,
        identifier: &str,
        kind: DecisionKind,
        metadata: &ApplicationMetadata,
        document: Vec<u8>,
    ) -> Result<()>;

    /// Flag every record issued under `identifier` as replaced.
    fn mark_replaced(&self, identifier: &str) -> Result<()>;
}
