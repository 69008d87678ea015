use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Poll not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Persistence(String),
    #[error("Poll is closed: {0}")]
    PollClosed(String),
    #[error("Option {index} is out of range for a poll with {len} options")]
    InvalidOption { index: usize, len: usize },
    #[error("Invalid poll: {0}")]
    InvalidPoll(String),
    #[error("A poll titled {0:?} already exists")]
    DuplicateTitle(String),
}

impl PollError {
    // Only storage failures are worth retrying; everything else needs the user to act.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PollError::Persistence(_))
    }
}

impl From<sqlx::Error> for PollError {
    fn from(error: sqlx::Error) -> Self {
        PollError::Persistence(error.to_string())
    }
}

impl From<serde_json::Error> for PollError {
    fn from(error: serde_json::Error) -> Self {
        PollError::Persistence(format!("malformed poll collection: {}", error))
    }
}
