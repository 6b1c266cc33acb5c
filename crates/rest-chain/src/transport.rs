//! The transport seam: send one fully-formed request, get one response

use crate::config::TransportConfig;
use crate::error::{BoxError, RestError, RestResult};
use async_trait::async_trait;
use once_cell::sync::OnceCell;

/// Sends a fully-formed request and returns the response or a transport
/// failure. Implementations are shared across snapshots and concurrent
/// requests, so they must not depend on per-call mutable state.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError>;
}

/// Transport backed by a dedicated, configured `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> RestResult<Self> {
        let client = config
            .build_client()
            .map_err(|e| RestError::Transport(e.into()))?;
        Ok(Self { client })
    }

    /// Wrap an already-built client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError> {
        Ok(self.client.execute(request).await?)
    }
}

static SHARED_CLIENT: OnceCell<reqwest::Client> = OnceCell::new();

/// Process-wide transport with default settings.
///
/// The client is built on first use so that creating a `RestClient`
/// never fails; a build failure surfaces from that first send instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedTransport;

impl SharedTransport {
    fn client() -> Result<&'static reqwest::Client, reqwest::Error> {
        SHARED_CLIENT.get_or_try_init(|| {
            tracing::debug!("Initializing shared HTTP client");
            TransportConfig::default().build_client()
        })
    }
}

#[async_trait]
impl Transport for SharedTransport {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError> {
        Ok(Self::client()?.execute(request).await?)
    }
}
