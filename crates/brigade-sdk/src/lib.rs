//! HTTP client SDK for the Brigade API.
//!
//! Every call goes through one pipeline: build a [`Request`], hand it to
//! [`ApiClient::execute`], get back either the decoded body or a classified
//! [`Error`]. Long-running state changes are observed through an
//! [`EventStream`] instead of polling.
//!
//! # Example
//!
//! ```no_run
//! use brigade_sdk::{ApiClient, ApiClientOptions, List, ListOptions, Request, StreamEvent};
//!
//! # async fn example() -> brigade_sdk::Result<()> {
//! let client = ApiClient::new("https://brigade.example.com", "token", ApiClientOptions::default())?;
//!
//! // Page through projects
//! let mut options = Some(ListOptions::with_limit(20));
//! while let Some(opts) = options.take() {
//!     let page: List<serde_json::Value> =
//!         client.execute(&Request::get("v2/projects").with_list_options(opts)).await?;
//!     println!("{} projects", page.items.len());
//!     options = page.metadata.next_page(Some(20));
//! }
//!
//! // Watch a worker until it finishes
//! let mut stream = client.open_stream::<serde_json::Value>(
//!     "v2/events/123/worker/status",
//!     &[("watch", "true"), ("sse", "true")],
//! )?;
//! while let Some(event) = stream.recv().await {
//!     match event {
//!         StreamEvent::Data(status) => println!("{}", status["phase"]),
//!         StreamEvent::Reconnecting => eprintln!("reconnecting..."),
//!         StreamEvent::Error(e) => return Err(e),
//!         StreamEvent::Closed | StreamEvent::Done => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod meta;
pub mod request;
pub mod sessions;
pub mod stream;
pub mod transport;

pub use client::{ApiClient, ApiClientOptions, ClientBuilder};
pub use error::{Error, Result};
pub use meta::{List, ListMeta, ListOptions, API_VERSION};
pub use request::Request;
pub use sessions::{OidcAuthDetails, SessionsClient, Token};
pub use stream::{EventStream, StreamEvent};
pub use transport::{
    ConnectError, Frame, FrameStream, HttpStreamTransport, StreamTarget, StreamTransport,
};

// Re-export HTTP vocabulary used in request descriptors
pub use reqwest::{Method, StatusCode};
