//! Shared plumbing for HTTP peer clients.

use std::sync::Arc;
use std::time::{Duration, Instant};

use auth::ServiceIdentityCache;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::{PeerError, Result};

/// Per-call timeout used when none is configured.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a peer lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Base URL of the peer, e.g. `http://product:8000`.
    pub base_url: String,

    /// Upper bound on one request, connect through body.
    pub timeout: Duration,
}

impl PeerConfig {
    /// Creates a config with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_PEER_TIMEOUT,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An authenticated JSON GET against one peer.
#[derive(Debug, Clone)]
pub(crate) struct PeerHttp {
    peer: &'static str,
    client: Client,
    base_url: String,
    identity: Arc<ServiceIdentityCache>,
}

impl PeerHttp {
    pub(crate) fn new(
        peer: &'static str,
        config: PeerConfig,
        identity: Arc<ServiceIdentityCache>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PeerError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            peer,
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            identity,
        })
    }

    /// Issues `GET {base}{path}` and returns the decoded JSON body.
    ///
    /// 404 maps to [`PeerError::NotFound`], any other non-2xx status to
    /// [`PeerError::BadRequest`].
    pub(crate) async fn get_json(&self, path: &str) -> Result<Value> {
        let start = Instant::now();
        let result = self.send(path).await;

        metrics::histogram!("peer_request_duration_seconds", "peer" => self.peer)
            .record(start.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.outcome(),
        };
        metrics::counter!("peer_requests_total", "peer" => self.peer, "outcome" => outcome)
            .increment(1);

        result
    }

    async fn send(&self, path: &str) -> Result<Value> {
        let token = self.identity.service_token().await?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(peer = self.peer, %url, error = %e, "peer call failed");
                PeerError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PeerError::NotFound);
        }
        if !status.is_success() {
            tracing::error!(peer = self.peer, %url, status = status.as_u16(), "peer rejected call");
            return Err(PeerError::BadRequest {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                PeerError::Unavailable(e.to_string())
            } else {
                PeerError::InvalidResponse(format!("failed to read body: {e}"))
            }
        })?;

        serde_json::from_slice(&body)
            .map_err(|e| PeerError::InvalidResponse(format!("body is not JSON: {e}")))
    }
}
