use thiserror::Error;

#[derive(Error, Debug)]
pub enum SprintLensError {
    #[error("{method} {url} failed after {attempts} attempts: {detail}")]
    RetriesExhausted {
        method: String,
        url: String,
        attempts: u32,
        detail: String,
    },

    #[error("Field discovery failed: {0}")]
    SchemaDiscovery(String),

    #[error("Board not found: {0}")]
    BoardNotFound(String),

    #[error("Board name '{name}' matches multiple boards: {candidates}")]
    AmbiguousBoard { name: String, candidates: String },

    #[error("No closed sprints found on board {board_id} (prefix: '{prefix}')")]
    NoSprintsFound { board_id: u64, prefix: String },

    #[error("Sprint not found: {0}")]
    SprintNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SprintLensError>;
