// rag_playground/src/error.rs
// Error type shared by the loaders, stores and LLM clients.

use thiserror::Error;

#[derive(Debug, Error,)]
pub enum PlaygroundError {
    #[error("Failed to connect: {0}")]
    ConnectionError(String,),
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String,),
    #[error("Database error: {0}")]
    DatabaseError(String,),
    #[error("Vector store error: {0}")]
    VectorStoreError(String,),
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error,),
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String, },
    #[error("Failed to load document: {0}")]
    DocumentError(String,),
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String,),
    #[error("Extraction failed: {0}")]
    ExtractionError(String,),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error,),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error,),
    #[error("Other error: {0}")]
    Other(String,),
}

impl PlaygroundError {
    pub fn is_transient(&self,) -> bool {
        match self {
            PlaygroundError::ConnectionError(_,) => true,
            PlaygroundError::HttpError(e,) => e.is_connect() || e.is_timeout(),
            PlaygroundError::ApiError { status, .. } => *status == 429 || *status >= 500,
            PlaygroundError::DatabaseError(msg,) | PlaygroundError::VectorStoreError(msg,) => {
                let m = msg.to_lowercase();
                m.contains("timeout",)
                    || m.contains("connection",)
                    || m.contains("too many clients",)
                    || m.contains("unavailable",)
                    || m.contains("connection reset",)
            },
            _ => false,
        }
    }
}

impl From<tokio_postgres::Error,> for PlaygroundError {
    fn from(e: tokio_postgres::Error,) -> Self {
        PlaygroundError::DatabaseError(e.to_string(),)
    }
}

impl From<deadpool_postgres::PoolError,> for PlaygroundError {
    fn from(e: deadpool_postgres::PoolError,) -> Self {
        PlaygroundError::ConnectionError(e.to_string(),)
    }
}

impl From<qdrant_client::QdrantError,> for PlaygroundError {
    fn from(e: qdrant_client::QdrantError,) -> Self {
        PlaygroundError::VectorStoreError(e.to_string(),)
    }
}

pub type Result<T,> = std::result::Result<T, PlaygroundError,>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_transient() {
        assert!(PlaygroundError::ConnectionError("refused".into()).is_transient());
        assert!(PlaygroundError::DatabaseError("connection reset by peer".into()).is_transient());
        assert!(PlaygroundError::ApiError { status: 503, body: String::new() }.is_transient());
    }

    #[test]
    fn data_errors_are_permanent() {
        assert!(!PlaygroundError::ExtractionError("bad json".into()).is_transient());
        assert!(!PlaygroundError::DatabaseError("duplicate key".into()).is_transient());
        assert!(!PlaygroundError::ApiError { status: 401, body: String::new() }.is_transient());
    }
}
