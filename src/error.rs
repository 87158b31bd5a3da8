//! Error types for timeledger

use thiserror::Error;

/// Errors that can occur while running the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to parse usage input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid usage record: {0}")]
    InvalidRecord(String),

    #[error("Usage source returned malformed data: {0}")]
    SourceMalformed(String),
}
