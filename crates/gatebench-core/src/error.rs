use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("gate endpoint unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("gate HTTP request failed: {0}")]
    Http(String),

    #[error("invalid gate response: {0}")]
    InvalidResponse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
