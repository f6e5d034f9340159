use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not initialized: run 'permit-sync init'")]
    NotInitialized,

    #[error("application not found: {0}")]
    ApplicationNotFound(i64),

    #[error("application already exists: {0}")]
    ApplicationExists(i64),

    #[error("registry request failed: {0}")]
    Registry(String),

    #[error("registry returned {status}: {body}")]
    RegistryStatus { status: u16, body: String },

    #[error("event store error: {0}")]
    EventStore(String),

    #[error("invalid application status: {0}")]
    InvalidStatus(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
