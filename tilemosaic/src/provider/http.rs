//! HTTP transport for tile requests.

use super::types::ProviderError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

/// Some tile servers reject requests without a User-Agent.
const DEFAULT_USER_AGENT: &str = concat!("tilemosaic/", env!("CARGO_PKG_VERSION"));

/// Default timeout for a whole request in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Issues GET requests for tile payloads.
///
/// The fetcher is generic over this trait so tests can serve tiles from
/// memory instead of a server.
pub trait AsyncHttpClient: Send + Sync + 'static {
    /// Returns the response body of a successful GET to `url`.
    ///
    /// Transport failures, timeouts and non-2xx statuses are errors.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;
}

/// [`AsyncHttpClient`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl AsyncReqwestClient {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Builds a client whose requests give up after `timeout`.
    ///
    /// Idle connections are kept per host since every request of a run goes
    /// to the same tile server.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .pool_max_idle_per_host(64)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ProviderError::ClientBuild(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    fn request_error(&self, url: &str, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout {
                url: url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            ProviderError::HttpError(e.to_string())
        }
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        trace!(url = url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        debug!(url = url, status = status.as_u16(), "Tile response");
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error(url, e))?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::net::TcpListener;

    /// Answers every request with the same result.
    #[derive(Clone)]
    pub struct MockAsyncHttpClient {
        pub response: Result<Vec<u8>, ProviderError>,
    }

    impl AsyncHttpClient for MockAsyncHttpClient {
        async fn get(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn test_mock_returns_configured_result() {
        let ok = MockAsyncHttpClient {
            response: Ok(vec![1, 2, 3]),
        };
        assert_eq!(ok.get("http://tiles.test/a").await.unwrap(), vec![1, 2, 3]);

        let err = MockAsyncHttpClient {
            response: Err(ProviderError::HttpError("reset".to_string())),
        };
        assert!(err.get("http://tiles.test/a").await.is_err());
    }

    #[test]
    fn test_user_agent_names_crate() {
        assert!(DEFAULT_USER_AGENT.starts_with("tilemosaic/"));
    }

    #[tokio::test]
    async fn test_refused_connection_is_http_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = AsyncReqwestClient::with_timeout(Duration::from_secs(5)).unwrap();

        let err = client
            .get(&format!("http://127.0.0.1:{}/0/0/0.jpeg", port))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::HttpError(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepted by the backlog but never answered
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let client = AsyncReqwestClient::with_timeout(Duration::from_millis(200)).unwrap();

        let err = client
            .get(&format!("http://127.0.0.1:{}/0/0/0.jpeg", port))
            .await
            .unwrap_err();

        assert!(
            matches!(err, ProviderError::Timeout { timeout_ms: 200, .. }),
            "{err:?}"
        );
        drop(listener);
    }
}
