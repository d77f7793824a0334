//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::request::Request;
use crate::sessions::SessionsClient;
use crate::stream::{EventStream, DEFAULT_RETRY_DELAY};
use crate::transport::{HttpStreamTransport, StreamTarget, StreamTransport};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Optional client configuration.
#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    /// Skip TLS certificate validation (self-signed development servers).
    pub allow_insecure_connections: bool,
    /// Request timeout.
    pub timeout: Duration,
    /// Custom user agent.
    pub user_agent: Option<String>,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            allow_insecure_connections: false,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }
}

/// Brigade API client.
///
/// Executes [`Request`] descriptors and opens event streams against one API
/// server. Cloning is cheap; all clones share the same immutable configuration.
///
/// # Example
///
/// ```no_run
/// use brigade_sdk::{ApiClient, ApiClientOptions, Request};
///
/// # async fn example() -> brigade_sdk::Result<()> {
/// let client = ApiClient::new("https://brigade.example.com", "token", ApiClientOptions::default())?;
/// let project: serde_json::Value = client.execute(&Request::get("v2/projects/bluebook")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
struct ClientInner {
    /// HTTP client.
    http: reqwest::Client,
    /// Transport used for event streams.
    transport: Arc<dyn StreamTransport>,
    /// Base address, always ending in `/`.
    api_address: Url,
    /// Bearer token; may be empty.
    api_token: String,
    allow_insecure_connections: bool,
    timeout: Duration,
    stream_retry_delay: Duration,
}

impl ApiClient {
    /// Create a client for `api_address` authenticating with `api_token`.
    pub fn new(
        api_address: impl Into<String>,
        api_token: impl Into<String>,
        options: ApiClientOptions,
    ) -> Result<Self> {
        let mut builder = Self::builder()
            .api_address(api_address)
            .api_token(api_token)
            .allow_insecure_connections(options.allow_insecure_connections)
            .timeout(options.timeout);
        if let Some(agent) = options.user_agent {
            builder = builder.user_agent(agent);
        }
        builder.build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the API address.
    pub fn api_address(&self) -> &Url {
        &self.inner.api_address
    }

    /// Whether TLS certificate validation is disabled.
    pub fn allows_insecure_connections(&self) -> bool {
        self.inner.allow_insecure_connections
    }

    /// Access the sessions API.
    pub fn sessions(&self) -> SessionsClient {
        SessionsClient::new(self.clone())
    }

    /// Build the absolute URL for a path.
    ///
    /// The path is appended to the API address as text, never resolved as a
    /// URL reference, so the result always stays on the API server and under
    /// its base path. Dot segments are rejected.
    pub fn url(&self, path: &str) -> Result<Url> {
        let base = &self.inner.api_address;
        let path = path.trim_start_matches('/');
        if path.split(['/', '\\', '?', '#']).any(is_dot_segment) {
            return Err(Error::InvalidPath(path.to_string()));
        }

        let url = Url::parse(&format!("{}{}", base.as_str(), path))?;
        if url.origin() != base.origin() || !url.path().starts_with(base.path()) {
            return Err(Error::InvalidPath(path.to_string()));
        }
        Ok(url)
    }

    /// Execute `request` and decode the success body as `T`.
    ///
    /// An empty success body decodes as JSON `null`, so `()` and `Option<_>`
    /// work for calls without content. Any status other than the request's
    /// success status is classified into an [`Error`].
    pub async fn execute<T: DeserializeOwned>(&self, request: &Request) -> Result<T> {
        let url = self.url(&request.path)?;
        let body = request.stamped_body()?;

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url.clone())
            .headers(self.headers_for(request)?)
            .timeout(self.inner.timeout);
        let query = request.query_pairs();
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = &body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!(method = %request.method, url = %url, status = status.as_u16(), "API request");

        let text = response.text().await?;
        if status != request.success_status {
            return Err(Error::from_response(status, &text));
        }
        if text.trim().is_empty() {
            Ok(serde_json::from_str("null")?)
        } else {
            Ok(serde_json::from_str(&text)?)
        }
    }

    /// Execute `request` without a typed decode.
    pub async fn execute_raw(&self, request: &Request) -> Result<serde_json::Value> {
        self.execute(request).await
    }

    /// Open an event stream at `path` with the given query markers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open_stream<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<EventStream<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let target = StreamTarget {
            url,
            token: self.inner.api_token.clone(),
            allow_insecure_connections: self.inner.allow_insecure_connections,
            last_event_id: None,
        };
        EventStream::open(
            Arc::clone(&self.inner.transport),
            target,
            self.inner.stream_retry_delay,
        )
    }

    /// Headers for one request: JSON defaults, bearer token, then overrides.
    fn headers_for(&self, request: &Request) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if request.include_auth_header {
            let value = HeaderValue::from_str(&format!("Bearer {}", self.inner.api_token))
                .map_err(|_| Error::Config("Invalid API token".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::Config(format!("Invalid header name: {}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::Config(format!("Invalid value for header {}", name)))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }
}

/// `.` or `..`, literal or percent-encoded.
fn is_dot_segment(segment: &str) -> bool {
    let lowered = segment.to_ascii_lowercase();
    matches!(
        lowered.as_str(),
        "." | ".." | "%2e" | "%2e%2e" | ".%2e" | "%2e."
    )
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_address", &self.inner.api_address.as_str())
            .field(
                "allow_insecure_connections",
                &self.inner.allow_insecure_connections,
            )
            .finish_non_exhaustive()
    }
}

/// Builder for creating an ApiClient.
pub struct ClientBuilder {
    api_address: Option<String>,
    api_token: String,
    allow_insecure_connections: bool,
    timeout: Duration,
    stream_retry_delay: Duration,
    user_agent: Option<String>,
    transport: Option<Arc<dyn StreamTransport>>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            api_address: None,
            api_token: String::new(),
            allow_insecure_connections: false,
            timeout: DEFAULT_TIMEOUT,
            stream_retry_delay: DEFAULT_RETRY_DELAY,
            user_agent: None,
            transport: None,
        }
    }

    /// Set the API address (protocol, host and optional port).
    pub fn api_address(mut self, address: impl Into<String>) -> Self {
        self.api_address = Some(address.into());
        self
    }

    /// Set the bearer token.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = token.into();
        self
    }

    /// Disable TLS certificate validation.
    pub fn allow_insecure_connections(mut self, allow: bool) -> Self {
        self.allow_insecure_connections = allow;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the initial reconnect delay for event streams.
    pub fn stream_retry_delay(mut self, delay: Duration) -> Self {
        self.stream_retry_delay = delay;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Use a custom event stream transport instead of [`HttpStreamTransport`].
    pub fn transport(mut self, transport: Arc<dyn StreamTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ApiClient> {
        let api_address = self
            .api_address
            .ok_or_else(|| Error::Config("api_address is required".to_string()))?;

        // Parse and normalize the address so relative paths join beneath it
        let mut api_address = Url::parse(&api_address)?;
        if !api_address.path().ends_with('/') {
            api_address.set_path(&format!("{}/", api_address.path()));
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("brigade-sdk/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .user_agent(&user_agent)
            .danger_accept_invalid_certs(self.allow_insecure_connections)
            .build()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpStreamTransport::new(&user_agent)?),
        };

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http,
                transport,
                api_address,
                api_token: self.api_token,
                allow_insecure_connections: self.allow_insecure_connections,
                timeout: self.timeout,
                stream_retry_delay: self.stream_retry_delay,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_api_address() {
        let result = ClientBuilder::new().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_normalizes_trailing_slash() {
        let client = ClientBuilder::new()
            .api_address("http://localhost:7000")
            .build()
            .unwrap();
        assert_eq!(client.api_address().as_str(), "http://localhost:7000/");

        let client = ClientBuilder::new()
            .api_address("http://localhost:7000/")
            .build()
            .unwrap();
        assert_eq!(client.api_address().as_str(), "http://localhost:7000/");
    }

    #[test]
    fn test_url_building() {
        let client = ApiClient::new("http://localhost:7000", "t", ApiClientOptions::default())
            .unwrap();

        let url = client.url("v2/projects").unwrap();
        assert_eq!(url.as_str(), "http://localhost:7000/v2/projects");

        let url = client.url("/v2/projects").unwrap();
        assert_eq!(url.as_str(), "http://localhost:7000/v2/projects");
    }

    #[test]
    fn test_url_keeps_address_prefix() {
        let client = ApiClient::new("https://example.com/brigade", "", ApiClientOptions::default())
            .unwrap();
        let url = client.url("v2/events").unwrap();
        assert_eq!(url.as_str(), "https://example.com/brigade/v2/events");
    }

    #[test]
    fn test_url_stays_on_api_server() {
        let client = ApiClient::new("https://brigade.example.com", "", ApiClientOptions::default())
            .unwrap();

        let url = client.url("https://evil.example.net/steal").unwrap();
        assert_eq!(url.host_str(), Some("brigade.example.com"));
        assert!(url.path().starts_with("/https:"));

        let url = client.url("//evil.example.net/steal").unwrap();
        assert_eq!(url.as_str(), "https://brigade.example.com/evil.example.net/steal");
    }

    #[test]
    fn test_url_rejects_dot_segments() {
        let client = ApiClient::new("https://example.com/brigade", "", ApiClientOptions::default())
            .unwrap();

        for path in [
            "v2/projects/../../admin",
            "../admin",
            "v2/./projects",
            "v2/%2E%2E/%2e%2e/admin",
            "v2\\..\\..\\admin",
        ] {
            assert!(
                matches!(client.url(path), Err(Error::InvalidPath(_))),
                "{path} should be rejected"
            );
        }

        // Dots inside a segment are ordinary characters
        let url = client.url("v2/projects/my..project").unwrap();
        assert_eq!(url.as_str(), "https://example.com/brigade/v2/projects/my..project");
    }

    #[test]
    fn test_headers_override_auth() {
        let client = ApiClient::new("http://localhost:7000", "secret", ApiClientOptions::default())
            .unwrap();

        let headers = client.headers_for(&Request::get("v2/projects")).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer secret");
        assert_eq!(headers[ACCEPT], "application/json");
        assert_eq!(headers[CONTENT_TYPE], "application/json");

        let request = Request::post("v2/sessions")
            .without_auth()
            .with_header("Authorization", "Basic cm9vdDpwdw==");
        let headers = client.headers_for(&request).unwrap();
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(headers[AUTHORIZATION], "Basic cm9vdDpwdw==");
    }

    #[test]
    fn test_insecure_flag_is_kept() {
        let options = ApiClientOptions {
            allow_insecure_connections: true,
            ..Default::default()
        };
        let client = ApiClient::new("https://localhost:7000", "", options).unwrap();
        assert!(client.allows_insecure_connections());
    }
}
