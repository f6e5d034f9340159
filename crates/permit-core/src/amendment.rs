//! Amendments: locally staged edits to an in-flight application.
//!
//! An amendment waits for the next registry-driven milestone (DECISION or
//! WAITING_INFORMATION) and is merged into the application exactly once.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Pending local edits staged against an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amendment {
    pub application_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub work_description: Option<String>,
}

/// Persistence seam for amendments.
pub trait AmendmentStore {
    fn find_by_application(&self, application_id: i64) -> Result<Option<Amendment>>;

    /// Merge the amendment's fields into the application's data, then
    /// delete the amendment. Both steps or neither.
    fn merge_and_delete(&self, amendment: &Amendment) -> Result<()>;

    /// Drop a staged amendment without merging (supplement cancellation).
    fn delete_by_application(&self, application_id: i64) -> Result<()>;
}
