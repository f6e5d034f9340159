use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ApplicationStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an application in the registry.
///
/// Wire names are SCREAMING_SNAKE_CASE to match the registry's API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    PendingClient,
    Handling,
    WaitingInformation,
    InformationReceived,
    Decisionmaking,
    Decision,
    OperationalCondition,
    Finished,
    Replaced,
    Cancelled,
}

impl ApplicationStatus {
    pub fn all() -> &'static [ApplicationStatus] {
        &[
            ApplicationStatus::Pending,
            ApplicationStatus::PendingClient,
            ApplicationStatus::Handling,
            ApplicationStatus::WaitingInformation,
            ApplicationStatus::InformationReceived,
            ApplicationStatus::Decisionmaking,
            ApplicationStatus::Decision,
            ApplicationStatus::OperationalCondition,
            ApplicationStatus::Finished,
            ApplicationStatus::Replaced,
            ApplicationStatus::Cancelled,
        ]
    }

    /// Stable one-byte code used as the low byte of the event-store key.
    ///
    /// Doubles as the deterministic tie-break between two events with the
    /// same timestamp for the same application. Never reorder these.
    pub fn code(self) -> u8 {
        match self {
            ApplicationStatus::Pending => 0,
            ApplicationStatus::PendingClient => 1,
            ApplicationStatus::Handling => 2,
            ApplicationStatus::WaitingInformation => 3,
            ApplicationStatus::InformationReceived => 4,
            ApplicationStatus::Decisionmaking => 5,
            ApplicationStatus::Decision => 6,
            ApplicationStatus::OperationalCondition => 7,
            ApplicationStatus::Finished => 8,
            ApplicationStatus::Replaced => 9,
            ApplicationStatus::Cancelled => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::PendingClient => "PENDING_CLIENT",
            ApplicationStatus::Handling => "HANDLING",
            ApplicationStatus::WaitingInformation => "WAITING_INFORMATION",
            ApplicationStatus::InformationReceived => "INFORMATION_RECEIVED",
            ApplicationStatus::Decisionmaking => "DECISIONMAKING",
            ApplicationStatus::Decision => "DECISION",
            ApplicationStatus::OperationalCondition => "OPERATIONAL_CONDITION",
            ApplicationStatus::Finished => "FINISHED",
            ApplicationStatus::Replaced => "REPLACED",
            ApplicationStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = crate::error::SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| crate::error::SyncError::InvalidStatus(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// DecisionKind
// ---------------------------------------------------------------------------

/// The three registry statuses that carry a downloadable decision document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Decision,
    OperationalCondition,
    Finished,
}

impl DecisionKind {
    pub fn from_status(status: ApplicationStatus) -> Option<DecisionKind> {
        match status {
            ApplicationStatus::Decision => Some(DecisionKind::Decision),
            ApplicationStatus::OperationalCondition => Some(DecisionKind::OperationalCondition),
            ApplicationStatus::Finished => Some(DecisionKind::Finished),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DecisionKind::Decision => "decision",
            DecisionKind::OperationalCondition => "operational_condition",
            DecisionKind::Finished => "finished",
        }
    }

    /// Filename suffix for a stored decision document.
    pub fn file_suffix(self) -> &'static str {
        match self {
            DecisionKind::Decision => "decision",
            DecisionKind::OperationalCondition => "operational-condition",
            DecisionKind::Finished => "work-finished",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EventState
// ---------------------------------------------------------------------------

/// Processing state of a persisted event record.
///
/// Transitions: `Pending → Processed | Failed`, `Failed → Processed`.
/// A `Failed` record keeps its slot across retries; the error detail is
/// overwritten in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    Pending,
    Processed,
    Failed,
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventState::Pending => "pending",
            EventState::Processed => "processed",
            EventState::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// SupplementFieldKey
// ---------------------------------------------------------------------------

/// Field of an application a supplement request asks to complete.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplementFieldKey {
    Attachment,
    Geometry,
    StartTime,
    EndTime,
    Customer,
    Contractor,
    Other,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        use std::str::FromStr;
        for status in ApplicationStatus::all() {
            let parsed = ApplicationStatus::from_str(status.as_str()).unwrap();
            assert_eq!(*status, parsed);
        }
    }

    #[test]
    fn status_codes_are_unique() {
        let mut codes: Vec<u8> = ApplicationStatus::all().iter().map(|s| s.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ApplicationStatus::all().len());
    }

    #[test]
    fn unknown_status_is_rejected() {
        use std::str::FromStr;
        assert!(ApplicationStatus::from_str("NOPE").is_err());
        assert!(ApplicationStatus::from_str("").is_err());
    }

    #[test]
    fn decision_kind_mapping() {
        assert_eq!(
            DecisionKind::from_status(ApplicationStatus::Decision),
            Some(DecisionKind::Decision)
        );
        assert_eq!(
            DecisionKind::from_status(ApplicationStatus::OperationalCondition),
            Some(DecisionKind::OperationalCondition)
        );
        assert_eq!(
            DecisionKind::from_status(ApplicationStatus::Finished),
            Some(DecisionKind::Finished)
        );
        assert_eq!(DecisionKind::from_status(ApplicationStatus::Handling), None);
    }

    #[test]
    fn status_wire_names() {
        let json = serde_json::to_string(&ApplicationStatus::WaitingInformation).unwrap();
        assert_eq!(json, "\"WAITING_INFORMATION\"");
        let back: ApplicationStatus = serde_json::from_str("\"PENDING_CLIENT\"").unwrap();
        assert_eq!(back, ApplicationStatus::PendingClient);
    }
}
