//! Immutable REST client snapshots and request execution

use crate::cookie::{self, Cookie};
use crate::error::{RestError, RestResult};
use crate::media_type::{Entity, MediaType};
use crate::transport::{SharedTransport, Transport};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE};
use http::Method;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// An immutable snapshot of request-building state.
///
/// Every `with_*` method returns a new snapshot and leaves `self` alone, so
/// partially built clients can be stored and branched freely. Only the
/// transport is shared between snapshots.
///
/// # Example
///
/// ```ignore
/// use rest_chain::{MediaType, RestClient};
///
/// let api = RestClient::new("https://api.example.com/")
///     .with_header("X-Trace", "1");
///
/// let mut user = User::default();
/// api.with_path(["users", "42"]).get(&mut [&mut user]).await?;
/// ```
#[derive(Clone)]
pub struct RestClient {
    transport: Arc<dyn Transport>,
    url: String,
    accept: MediaType,
    content_type: MediaType,
    headers: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
    cookies: Vec<Cookie>,
    timeout: Option<Duration>,
}

impl RestClient {
    /// Create a client for `base_url` on the shared default transport.
    ///
    /// Leading and trailing slashes are trimmed. The URL is only validated
    /// when a request is executed.
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(Arc::new(SharedTransport), base_url)
    }

    /// Create a client that sends through `transport`
    pub fn with_transport(transport: Arc<dyn Transport>, base_url: &str) -> Self {
        Self {
            transport,
            url: base_url.trim_matches('/').to_string(),
            accept: MediaType::default(),
            content_type: MediaType::default(),
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            cookies: Vec::new(),
            timeout: None,
        }
    }

    /// Get the URL built so far (base URL plus path segments)
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the accept media type
    pub fn accept(&self) -> MediaType {
        self.accept
    }

    /// Get the request content type
    pub fn content_type(&self) -> MediaType {
        self.content_type
    }

    /// Get the extra request headers, keyed by lowercased name
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Get the query parameters
    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Get the cookies, in the order they were added
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Get the per-request deadline, if one is set
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    // ===================================================================
    //                     Immutable builder methods
    // ===================================================================

    pub fn with_accept(&self, accept: MediaType) -> Self {
        Self {
            accept,
            ..self.clone()
        }
    }

    pub fn with_content_type(&self, content_type: MediaType) -> Self {
        Self {
            content_type,
            ..self.clone()
        }
    }

    /// Append path segments in order, each trimmed of `/` and joined with a single `/`
    pub fn with_path<I>(&self, segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut next = self.clone();
        for segment in segments {
            next.url.push('/');
            next.url.push_str(segment.as_ref().trim_matches('/'));
        }
        next
    }

    pub fn with_query(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.query.insert(key.into(), value.into());
        next
    }

    /// Header names are case-insensitive; they are stored lowercased so a
    /// later call replaces an earlier one regardless of spelling.
    pub fn with_header(&self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        next
    }

    pub fn with_cookie(&self, cookie: Cookie) -> Self {
        let mut next = self.clone();
        next.cookies.push(cookie);
        next
    }

    /// Deadline for the whole exchange, applied on top of the transport's own timeout
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self.clone()
        }
    }

    // ===================================================================
    //                        Terminal operations
    // ===================================================================

    pub async fn get(&self, results: &mut [&mut dyn Entity]) -> RestResult<()> {
        self.execute("GET", None, results).await
    }

    pub async fn put(
        &self,
        body: impl Into<Bytes>,
        results: &mut [&mut dyn Entity],
    ) -> RestResult<()> {
        self.execute("PUT", Some(body.into()), results).await
    }

    pub async fn post(
        &self,
        body: impl Into<Bytes>,
        results: &mut [&mut dyn Entity],
    ) -> RestResult<()> {
        self.execute("POST", Some(body.into()), results).await
    }

    /// Encode `body` with the configured content type, then PUT it
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        body: &B,
        results: &mut [&mut dyn Entity],
    ) -> RestResult<()> {
        let payload = self.content_type.marshal(body).map_err(RestError::Marshal)?;
        self.put(payload, results).await
    }

    /// Encode `body` with the configured content type, then POST it
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        body: &B,
        results: &mut [&mut dyn Entity],
    ) -> RestResult<()> {
        let payload = self.content_type.marshal(body).map_err(RestError::Marshal)?;
        self.post(payload, results).await
    }

    /// Reserved. Sends nothing and always succeeds.
    pub async fn delete(&self, _results: &mut [&mut dyn Entity]) -> RestResult<()> {
        tracing::debug!("DELETE {} is not dispatched", self.url);
        Ok(())
    }

    /// Send one request and decode the response payload into every result
    /// container, in order.
    ///
    /// When `results` is non-empty the response `Content-Type` must contain
    /// the accept type's wire name. Decoding stops at the first container
    /// that fails; later containers are left untouched.
    pub async fn execute(
        &self,
        method: &str,
        body: Option<Bytes>,
        results: &mut [&mut dyn Entity],
    ) -> RestResult<()> {
        let request = self.build_request(method, body)?;
        tracing::debug!("{} {}", request.method(), request.url());

        let response = self
            .transport
            .send(request)
            .await
            .map_err(RestError::Transport)?;
        tracing::debug!("Response {} from {}", response.status(), response.url());

        if !results.is_empty() {
            let got = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if !self.accept.matches(got) {
                tracing::warn!(
                    "Response Content-Type [{}] does not contain Accept [{}]",
                    got,
                    self.accept
                );
                return Err(RestError::ContentTypeMismatch {
                    got: got.to_string(),
                    want: self.accept.wire_name().to_string(),
                });
            }
        }

        let payload = response.bytes().await.map_err(RestError::BodyRead)?;

        for (index, entity) in results.iter_mut().enumerate() {
            tracing::trace!("Decoding {} bytes into result {}", payload.len(), index);
            self.accept
                .unmarshal_into(&payload, &mut **entity)
                .map_err(|source| RestError::Deserialization { index, source })?;
        }

        Ok(())
    }

    /// Base URL with the query mapping applied
    fn request_url(&self) -> RestResult<Url> {
        let mut url = Url::parse(&self.url)?;
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn build_request(&self, method: &str, body: Option<Bytes>) -> RestResult<reqwest::Request> {
        let url = self.request_url()?;
        let method = Method::from_bytes(method.as_bytes()).map_err(http::Error::from)?;

        let mut request = reqwest::Request::new(method, url);
        if let Some(body) = body {
            *request.body_mut() = Some(body.into());
        }
        *request.timeout_mut() = self.timeout;

        let headers = request.headers_mut();
        for (key, value) in &self.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(http::Error::from)?;
            let value = HeaderValue::from_str(value).map_err(http::Error::from)?;
            headers.insert(name, value);
        }
        if let Some(pairs) = cookie::header_value(&self.cookies) {
            let value = HeaderValue::from_str(&pairs).map_err(http::Error::from)?;
            headers.insert(COOKIE, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static(self.accept.wire_name()));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(self.content_type.wire_name()),
        );

        Ok(request)
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("url", &self.url)
            .field("accept", &self.accept)
            .field("content_type", &self.content_type)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("cookies", &self.cookies)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_slashes_and_defaults_to_json() {
        let client = RestClient::new("/http://x/");
        assert_eq!(client.url(), "http://x");
        assert_eq!(client.accept(), MediaType::ApplicationJson);
        assert_eq!(client.content_type(), MediaType::ApplicationJson);
        assert!(client.headers().is_empty());
        assert!(client.query().is_empty());
        assert!(client.cookies().is_empty());
        assert_eq!(client.timeout(), None);
    }

    #[test]
    fn test_path_composition_normalizes_slashes() {
        let client = RestClient::new("http://x/").with_path(["a", "b"]);
        assert_eq!(client.url(), "http://x/a/b");

        let client = RestClient::new("http://x")
            .with_path(["/users/"])
            .with_path(vec!["42/".to_string()]);
        assert_eq!(client.url(), "http://x/users/42");
    }

    #[test]
    fn test_with_header_leaves_original_untouched() {
        let base = RestClient::new("http://x").with_header("A", "1");
        let next = base.with_header("B", "2");

        assert_eq!(base.headers().len(), 1);
        assert_eq!(next.headers().get("a").map(String::as_str), Some("1"));
        assert_eq!(next.headers().get("b").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_branches_are_independent() {
        let base = RestClient::new("http://x");
        let a = base.with_header("H", "1").with_query("q", "a");
        let b = base.with_header("H", "2").with_cookie(Cookie::new("c", "b"));

        assert!(base.headers().is_empty());
        assert!(base.query().is_empty());
        assert!(base.cookies().is_empty());
        assert_eq!(a.headers()["h"], "1");
        assert_eq!(b.headers()["h"], "2");
        assert!(b.query().is_empty());
        assert!(a.cookies().is_empty());
    }

    #[test]
    fn test_header_names_differing_in_case_are_one_header() {
        let client = RestClient::new("http://x")
            .with_header("x-tenant", "1")
            .with_header("X-Tenant", "2");

        assert_eq!(client.headers().len(), 1);
        assert_eq!(client.headers()["x-tenant"], "2");

        let request = client.build_request("GET", None).unwrap();
        let sent: Vec<_> = request.headers().get_all("x-tenant").iter().collect();
        assert_eq!(sent, ["2"]);
    }

    #[test]
    fn test_with_query_builds_on_existing_query_only() {
        let client = RestClient::new("http://x")
            .with_header("X-Header", "h")
            .with_query("page", "2")
            .with_query("size", "10");

        assert_eq!(client.query().len(), 2);
        assert!(!client.query().contains_key("x-header"));
        assert_eq!(client.headers().len(), 1);
    }

    #[test]
    fn test_cookies_append_in_order() {
        let base = RestClient::new("http://x").with_cookie(Cookie::new("a", "1"));
        let next = base.with_cookie(Cookie::new("b", "2"));

        assert_eq!(base.cookies().len(), 1);
        let names: Vec<&str> = next.cookies().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_media_type_builders() {
        let base = RestClient::new("http://x");
        let yaml = base
            .with_accept(MediaType::ApplicationYaml)
            .with_content_type(MediaType::TextPlain);

        assert_eq!(base.accept(), MediaType::ApplicationJson);
        assert_eq!(yaml.accept(), MediaType::ApplicationYaml);
        assert_eq!(yaml.content_type(), MediaType::TextPlain);
    }

    #[test]
    fn test_request_assembly() {
        let client = RestClient::new("http://x/api")
            .with_path(["items"])
            .with_query("b", "two words")
            .with_query("a", "1")
            .with_header("X-Trace", "abc")
            .with_cookie(Cookie::new("session", "s1"))
            .with_cookie(Cookie::new("theme", "dark"))
            .with_accept(MediaType::TextPlain)
            .with_timeout(Duration::from_secs(3));

        let request = client
            .build_request("POST", Some(Bytes::from_static(b"payload")))
            .unwrap();

        assert_eq!(*request.method(), Method::POST);
        assert_eq!(
            request.url().as_str(),
            "http://x/api/items?a=1&b=two+words"
        );
        assert_eq!(request.headers()["x-trace"], "abc");
        assert_eq!(request.headers()[COOKIE], "session=s1; theme=dark");
        assert_eq!(request.headers()[ACCEPT], "text/plain");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.timeout(), Some(&Duration::from_secs(3)));
        assert!(request.body().is_some());
    }

    #[test]
    fn test_media_types_override_custom_headers() {
        let client = RestClient::new("http://x").with_header("Accept", "text/html");
        let request = client.build_request("GET", None).unwrap();

        assert_eq!(request.headers()[ACCEPT], "application/json");
        assert!(request.body().is_none());
        assert_eq!(request.url().query(), None);
    }

    #[test]
    fn test_build_errors() {
        let client = RestClient::new("not a url");
        assert!(matches!(
            client.build_request("GET", None),
            Err(RestError::InvalidUrl(_))
        ));

        let client = RestClient::new("http://x");
        assert!(matches!(
            client.build_request("BAD VERB", None),
            Err(RestError::RequestBuild(_))
        ));

        let client = RestClient::new("http://x").with_header("bad header", "v");
        assert!(matches!(
            client.build_request("GET", None),
            Err(RestError::RequestBuild(_))
        ));
    }
}
