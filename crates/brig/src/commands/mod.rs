//! CLI command handlers.

pub mod context;
pub mod get;
pub mod login;
pub mod logout;
pub mod watch;

use std::time::Duration;

use anyhow::{Context as _, Result};
use brigade_sdk::{ApiClient, ApiClientOptions};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit API server address.
    pub server: Option<String>,
    /// Explicit bearer token.
    pub token: Option<String>,
    /// Skip TLS certificate validation.
    pub insecure: bool,
    /// Context name overriding the current context.
    pub context_name: Option<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

/// Connection settings after merging flags with the config file.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Context the settings came from, if any.
    pub context_name: Option<String>,
    pub server: String,
    pub token: String,
    pub options: ApiClientOptions,
}

impl Context {
    /// Resolve the connection: `--server` wins, otherwise the selected context.
    pub fn connection(&self) -> Result<Connection> {
        if let Some(server) = &self.server
            && self.context_name.is_none()
        {
            return Ok(Connection {
                context_name: None,
                server: server.clone(),
                token: self.token.clone().unwrap_or_default(),
                options: ApiClientOptions {
                    allow_insecure_connections: self.insecure,
                    ..Default::default()
                },
            });
        }

        let config = brigade_config::load_client_config()?;
        let selected = config
            .select(self.context_name.as_deref())
            .context("no API server configured; pass --server or create a context")?;

        let token = match &self.token {
            Some(token) => token.clone(),
            None => selected.token()?,
        };
        let mut options = ApiClientOptions {
            allow_insecure_connections: self.insecure || selected.allow_insecure_connections,
            ..Default::default()
        };
        if let Some(secs) = selected.timeout {
            options.timeout = Duration::from_secs(secs);
        }

        Ok(Connection {
            context_name: Some(selected.name.clone()),
            server: self.server.clone().unwrap_or_else(|| selected.server.clone()),
            token,
            options,
        })
    }

    /// Build an API client for the resolved connection.
    pub fn client(&self) -> Result<(ApiClient, Connection)> {
        let connection = self.connection()?;
        tracing::debug!(server = %connection.server, context = ?connection.context_name, "Connecting");
        let client = ApiClient::new(
            connection.server.clone(),
            connection.token.clone(),
            connection.options.clone(),
        )?;
        Ok((client, connection))
    }
}

/// Parse a `key=value` argument.
pub fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("projectID=italian").unwrap(),
            ("projectID".to_string(), "italian".to_string())
        );
        assert_eq!(
            parse_key_val("filter=a=b").unwrap(),
            ("filter".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_explicit_server_skips_config() {
        let ctx = Context {
            server: Some("https://localhost:7000".to_string()),
            token: Some("t".to_string()),
            insecure: true,
            context_name: None,
            json_output: false,
            verbose: false,
        };
        let connection = ctx.connection().unwrap();
        assert_eq!(connection.server, "https://localhost:7000");
        assert_eq!(connection.token, "t");
        assert!(connection.options.allow_insecure_connections);
        assert!(connection.context_name.is_none());
    }
}
