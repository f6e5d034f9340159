//! Stakeholder notifications: who and what, never how.
//!
//! Rendering and transport (email templates, SMTP) belong to the
//! collaborator implementing `Notifier`.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::DecisionKind;

/// A notification the sync core has decided to emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A decision document is available for download.
    DecisionReady {
        email: String,
        application_id: i64,
        identifier: String,
        kind: DecisionKind,
    },
    /// The registry asks for supplementary information.
    SupplementRequested {
        email: String,
        application_id: i64,
        application_name: String,
        identifier: String,
    },
    /// A previously issued supplement request was cancelled.
    SupplementCancelled {
        email: String,
        application_id: i64,
        identifier: String,
    },
}

impl Notification {
    pub fn email(&self) -> &str {
        match self {
            Notification::DecisionReady { email, .. }
            | Notification::SupplementRequested { email, .. }
            | Notification::SupplementCancelled { email, .. } => email,
        }
    }
}

/// Delivery seam. Dispatch is a blocking call; an error fails the
/// transition that produced the notification.
pub trait Notifier {
    fn notify(&self, notification: Notification) -> Result<()>;
}
