//! Transports for server-sent event streams.
//!
//! The stream wrapper never discovers a transport on its own: one is chosen
//! when the [`ApiClient`](crate::ApiClient) is built and shared by every
//! stream it opens. [`HttpStreamTransport`] is the default.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::StatusCode;
use url::Url;

use crate::error::{Error, Result};

/// Connect timeout for stream requests. Established streams have no timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a transport needs to open (or reopen) one stream.
#[derive(Debug, Clone)]
pub struct StreamTarget {
    /// Absolute URL, including any watch/stream query markers.
    pub url: Url,
    /// Bearer token sent with every connection attempt.
    pub token: String,
    /// Skip TLS certificate validation.
    pub allow_insecure_connections: bool,
    /// Id of the last frame received, sent as `Last-Event-ID` on reconnect.
    pub last_event_id: Option<String>,
}

/// One server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Event name; `message` when the server did not name it.
    pub event: String,
    /// Raw payload.
    pub data: String,
    /// Event id, empty when absent.
    pub id: String,
    /// Reconnect delay requested by the server.
    pub retry: Option<Duration>,
}

impl Frame {
    /// A `message` frame carrying `data`.
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            event: "message".to_string(),
            data: data.into(),
            ..Default::default()
        }
    }

    /// A frame with a custom event name.
    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            ..Default::default()
        }
    }
}

impl From<eventsource_stream::Event> for Frame {
    fn from(event: eventsource_stream::Event) -> Self {
        Self {
            event: event.event,
            data: event.data,
            id: event.id,
            retry: event.retry,
        }
    }
}

/// Frames of an open connection. An `Err` item means the connection dropped.
pub type FrameStream = BoxStream<'static, std::result::Result<Frame, String>>;

/// Why a connection attempt did not produce a frame stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The server answered with a non-success status. Not recoverable.
    Status(u16),
    /// The server asked the client to stop (204, or not an event stream).
    Closed,
    /// The connection could not be established. Worth another attempt.
    Transport(String),
}

/// Opens server-sent event connections.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open a connection to `target`.
    async fn connect(&self, target: &StreamTarget)
        -> std::result::Result<FrameStream, ConnectError>;
}

/// HTTP transport built on reqwest.
#[derive(Debug, Clone)]
pub struct HttpStreamTransport {
    strict: reqwest::Client,
    permissive: reqwest::Client,
}

impl HttpStreamTransport {
    /// Create a transport holding one verifying and one non-verifying client.
    pub fn new(user_agent: &str) -> Result<Self> {
        let build = |insecure: bool| {
            reqwest::Client::builder()
                .user_agent(user_agent)
                .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
                .danger_accept_invalid_certs(insecure)
                .build()
                .map_err(Error::from)
        };
        Ok(Self {
            strict: build(false)?,
            permissive: build(true)?,
        })
    }

    fn client(&self, allow_insecure_connections: bool) -> &reqwest::Client {
        if allow_insecure_connections {
            &self.permissive
        } else {
            &self.strict
        }
    }
}

#[async_trait]
impl StreamTransport for HttpStreamTransport {
    async fn connect(
        &self,
        target: &StreamTarget,
    ) -> std::result::Result<FrameStream, ConnectError> {
        let mut request = self
            .client(target.allow_insecure_connections)
            .get(target.url.clone())
            .bearer_auth(&target.token)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        if let Some(id) = &target.last_event_id {
            request = request.header("Last-Event-ID", id.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConnectError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Err(ConnectError::Closed);
        }
        if !status.is_success() {
            return Err(ConnectError::Status(status.as_u16()));
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));
        if !is_event_stream {
            tracing::warn!(url = %target.url, "Response is not an event stream");
            return Err(ConnectError::Closed);
        }

        let frames = response
            .bytes_stream()
            .eventsource()
            .map(|result| result.map(Frame::from).map_err(|e| e.to_string()));
        Ok(frames.boxed())
    }
}
