//! Error types shared by the stores and the countdown

use thiserror::Error;

/// Errors surfaced by pomo's core operations. Nothing is retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Corrupt record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not initialize the terminal: {0}")]
    DisplayInit(#[source] std::io::Error),

    #[error("Terminal error: {0}")]
    Display(#[source] std::io::Error),

    #[error("timer interrupted")]
    Interrupted,
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
