use thiserror::Error;

/// Error type that captures failures of a recompute pass and its collaborators.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("No participant columns found in the header row.")]
    NoParticipants,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}
