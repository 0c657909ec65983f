//! Provider types

use thiserror::Error;

/// Errors that can occur while talking to a tile server.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Request did not finish within the configured timeout
    #[error("Request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),
}

impl ProviderError {
    /// Returns true if repeating the request might succeed.
    ///
    /// Client errors (4xx) other than 408 and 429 are permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            Self::ClientBuild(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = ProviderError::Status {
            status: 404,
            url: "https://tiles.example/1/2/3.jpeg".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404 from https://tiles.example/1/2/3.jpeg");
    }

    #[test]
    fn test_timeout_display_keeps_sub_second_precision() {
        let err = ProviderError::Timeout {
            url: "http://tiles.test/0/0/0.jpeg".to_string(),
            timeout_ms: 250,
        };
        assert_eq!(
            err.to_string(),
            "Request to http://tiles.test/0/0/0.jpeg timed out after 250ms"
        );
    }

    #[test]
    fn test_retryable_classification() {
        let status = |status| ProviderError::Status {
            status,
            url: String::new(),
        };

        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!status(403).is_retryable());
        assert!(ProviderError::HttpError("reset".to_string()).is_retryable());
        assert!(!ProviderError::ClientBuild("tls".to_string()).is_retryable());
    }
}
