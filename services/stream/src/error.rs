//! Error types for the stream service.

use thiserror::Error;

/// Result type alias for stream service operations.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Main error type for stream service operations.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Transport could not be opened.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// Transport open did not complete within the configured timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON parsing error from exchange data.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// HTTP transport error from the REST client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The REST API answered but refused or failed the request.
    #[error("Failed to fetch {endpoint}: {message}")]
    Api {
        /// The endpoint that failed, for the retry prompt.
        endpoint: String,
        /// Human-readable failure description.
        message: String,
    },

    /// The connection actor is gone; the manager handle is unusable.
    #[error("Connection manager is shut down")]
    ManagerClosed,

    /// Configuration error in service settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Favorites file could not be written.
    #[error("Failed to persist favorites to {path}: {source}")]
    Persistence {
        /// Path of the favorites file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// Check if this error is recoverable through retry.
    ///
    /// Everything network-shaped is; only configuration mistakes and a
    /// torn-down manager are terminal.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            StreamError::Configuration(_) | StreamError::ManagerClosed
        )
    }
}
