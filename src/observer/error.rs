use thiserror::Error;

/// Change notification errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifierError {
    /// Neither snapshot given: the caller did not create, update or delete anything
    #[error("Change notification requires a before or after snapshot")]
    NoSnapshots,

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl From<serde_json::Error> for NotifierError {
    fn from(error: serde_json::Error) -> Self {
        NotifierError::Snapshot(error.to_string())
    }
}
