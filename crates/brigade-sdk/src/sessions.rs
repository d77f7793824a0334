//! Sessions API.
//!
//! Session creation is the one call family that authenticates without the
//! client's bearer token.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::Result;
use crate::request::Request;

/// An opaque bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
}

/// Details for completing an OpenID Connect login with a third-party provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcAuthDetails {
    /// URL to open in a browser to finish authentication.
    #[serde(rename = "authURL")]
    pub auth_url: String,
    /// Token that becomes usable once the browser flow completes.
    pub token: String,
}

/// Sessions API client.
pub struct SessionsClient {
    client: ApiClient,
}

impl SessionsClient {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Create a session for the root user, if the server has it enabled.
    ///
    /// Authenticates with HTTP Basic credentials instead of the bearer token and
    /// returns a short-lived token.
    pub async fn create_root_session(&self, password: &str) -> Result<Token> {
        let credentials = STANDARD.encode(format!("root:{}", password));
        let request = Request::post("v2/sessions")
            .without_auth()
            .with_header("Authorization", format!("Basic {}", credentials))
            .with_query("root", "true")
            .with_success_status(StatusCode::CREATED);
        self.client.execute(&request).await
    }

    /// Create a user session and start an OpenID Connect flow.
    pub async fn create_user_session(&self) -> Result<OidcAuthDetails> {
        let request = Request::post("v2/sessions")
            .without_auth()
            .with_success_status(StatusCode::CREATED);
        self.client.execute(&request).await
    }

    /// Delete the current session.
    pub async fn delete(&self) -> Result<()> {
        self.client.execute(&Request::delete("v2/session")).await
    }
}
