//! Transport configuration

use std::time::Duration;

/// Settings for the `reqwest` client that carries requests.
///
/// These live below the request builder: a `RestClient` snapshot never
/// changes them, it only borrows the transport they produce. Pooling and
/// TLS stay at reqwest's defaults; callers who need to tune them build their
/// own client and wrap it with `ReqwestTransport::from_client`.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound for a whole exchange when the request sets no deadline
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Redirects followed by the transport; `0` disables following
    pub max_redirects: usize,

    /// User-Agent header value
    pub user_agent: String,

    /// Transparent gzip decompression of response bodies
    pub gzip: bool,

    /// Transparent brotli decompression of response bodies
    pub brotli: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 10,
            user_agent: format!("rest-chain/{}", env!("CARGO_PKG_VERSION")),
            gzip: true,
            brotli: true,
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the total timeout from fractional seconds
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        self.timeout = Duration::from_secs_f64(secs);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Return redirect responses to the caller instead of following them
    pub fn no_redirects(self) -> Self {
        self.max_redirects(0)
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Toggle gzip and brotli decompression together
    pub fn compression(mut self, enabled: bool) -> Self {
        self.gzip = enabled;
        self.brotli = enabled;
        self
    }

    /// Build a `reqwest::Client` carrying these settings
    pub(crate) fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let redirect = match self.max_redirects {
            0 => reqwest::redirect::Policy::none(),
            max => reqwest::redirect::Policy::limited(max),
        };

        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .redirect(redirect)
            .user_agent(&self.user_agent)
            .gzip(self.gzip)
            .brotli(self.brotli)
            .build()
    }
}
