//! Client configuration for connecting to Brigade API servers.
//!
//! Implements a kubeconfig-style configuration with named contexts:
//!
//! ```yaml
//! api-version: v1
//! kind: ClientConfig
//!
//! current-context: local
//!
//! contexts:
//!   - name: local
//!     server: https://localhost:7000
//!     allow-insecure-connections: true
//!     auth:
//!       type: token
//!       token-file: ~/.config/brigade/tokens/local
//!   - name: prod
//!     server: https://brigade.example.com
//!     auth:
//!       type: token
//!       token-env: BRIGADE_TOKEN
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Client Config
// ─────────────────────────────────────────────────────────────────────────────

/// API version for the client config file format.
pub const API_VERSION: &str = "v1";

/// Kind identifier for client config files.
pub const KIND: &str = "ClientConfig";

/// Default config filename.
const CLIENT_CONFIG_FILE: &str = "client.yaml";

/// Application directory name under the platform config dir.
const APP_NAME: &str = "brigade";

/// Environment variable overriding the config directory.
const CONFIG_DIR_ENV: &str = "BRIGADE_CONFIG_DIR";

/// Root client configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    /// API version (always "v1" currently).
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Config kind (always "ClientConfig").
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Name of the current/default context.
    #[serde(default)]
    pub current_context: Option<String>,

    /// Named connection contexts.
    #[serde(default)]
    pub contexts: Vec<Context>,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

impl ClientConfig {
    /// Create an empty client config.
    pub fn new() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            ..Default::default()
        }
    }

    /// Parse from a YAML string.
    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        serde_yaml::from_str(yaml_str).map_err(|e| ConfigError::ParseYaml(e.to_string()))
    }

    /// Serialize to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::ParseYaml(e.to_string()))
    }

    /// Get the current context, if set and valid.
    pub fn current(&self) -> Option<&Context> {
        self.current_context
            .as_ref()
            .and_then(|name| self.get_context(name))
    }

    /// The named context, or the current one when `name` is `None`.
    pub fn select(&self, name: Option<&str>) -> Result<&Context> {
        match name.or(self.current_context.as_deref()) {
            Some(name) => self
                .get_context(name)
                .ok_or_else(|| ConfigError::ContextNotFound(name.to_string())),
            None => Err(ConfigError::NoCurrentContext),
        }
    }

    /// Get a context by name.
    pub fn get_context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    /// Get a mutable context by name.
    pub fn get_context_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.contexts.iter_mut().find(|c| c.name == name)
    }

    /// Add or update a context.
    pub fn set_context(&mut self, context: Context) {
        if let Some(existing) = self.get_context_mut(&context.name) {
            *existing = context;
        } else {
            self.contexts.push(context);
        }
    }

    /// Remove a context by name.
    pub fn remove_context(&mut self, name: &str) -> Option<Context> {
        let pos = self.contexts.iter().position(|c| c.name == name)?;
        if self.current_context.as_deref() == Some(name) {
            self.current_context = None;
        }
        Some(self.contexts.remove(pos))
    }

    /// Set the current context by name.
    ///
    /// Returns an error if the context doesn't exist.
    pub fn use_context(&mut self, name: &str) -> Result<()> {
        if self.get_context(name).is_some() {
            self.current_context = Some(name.to_string());
            Ok(())
        } else {
            Err(ConfigError::ContextNotFound(name.to_string()))
        }
    }

    /// List all context names.
    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.name.as_str()).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// A named connection context (server + credentials + TLS policy).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Context {
    /// Unique name for this context.
    pub name: String,

    /// API address (e.g., "https://brigade.example.com").
    pub server: String,

    /// Authentication configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Skip TLS certificate validation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_insecure_connections: bool,

    /// Request timeout override (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Context {
    /// Create a new context with just a name and server URL.
    pub fn new(name: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server: server.into(),
            auth: None,
            allow_insecure_connections: false,
            timeout: None,
        }
    }

    /// Set the auth configuration.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Allow or forbid insecure connections.
    pub fn with_insecure(mut self, allow: bool) -> Self {
        self.allow_insecure_connections = allow;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve the bearer token, empty when none is configured.
    pub fn token(&self) -> Result<String> {
        match &self.auth {
            Some(auth) => Ok(auth.resolve()?.unwrap_or_default()),
            None => Ok(String::new()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication configuration for a context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthConfig {
    /// No authentication.
    None,

    /// Bearer token authentication.
    #[serde(rename_all = "kebab-case")]
    Token {
        /// Token stored directly in the config file.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        /// Path to file containing the token.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_file: Option<PathBuf>,
        /// Environment variable containing the token.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_env: Option<String>,
    },
}

impl AuthConfig {
    /// Token stored inline.
    pub fn inline(token: impl Into<String>) -> Self {
        Self::Token {
            token: Some(token.into()),
            token_file: None,
            token_env: None,
        }
    }

    /// Token read from a file.
    pub fn token_file(path: impl Into<PathBuf>) -> Self {
        Self::Token {
            token: None,
            token_file: Some(path.into()),
            token_env: None,
        }
    }

    /// Token read from an environment variable.
    pub fn token_env(var: impl Into<String>) -> Self {
        Self::Token {
            token: None,
            token_file: None,
            token_env: Some(var.into()),
        }
    }

    /// Resolve the actual credential value.
    ///
    /// Tries the inline value, then the file, then the environment variable.
    pub fn resolve(&self) -> Result<Option<String>> {
        let AuthConfig::Token {
            token,
            token_file,
            token_env,
        } = self
        else {
            return Ok(None);
        };

        if let Some(token) = token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(Some(token.clone()));
        }
        if let Some(path) = token_file {
            let expanded = expand_path(path);
            if expanded.exists() {
                let token = std::fs::read_to_string(&expanded)
                    .map_err(|e| ConfigError::ReadFile {
                        path: expanded.display().to_string(),
                        source: e,
                    })?
                    .trim()
                    .to_string();
                return Ok(Some(token));
            }
        }
        if let Some(var) = token_env
            && let Ok(token) = std::env::var(var)
        {
            return Ok(Some(token));
        }
        Ok(None)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading / Saving
// ─────────────────────────────────────────────────────────────────────────────

/// Directory holding client configuration.
///
/// `$BRIGADE_CONFIG_DIR` when set, otherwise `<platform config dir>/brigade`.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the path to the client config file.
pub fn client_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(CLIENT_CONFIG_FILE))
}

/// Load the client configuration.
///
/// Returns a default config if the file doesn't exist.
pub fn load_client_config() -> Result<ClientConfig> {
    load_client_config_from(client_config_path().as_deref())
}

/// Load client config from a specific path.
pub fn load_client_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let Some(path) = path else {
        return Ok(ClientConfig::new());
    };

    if !path.exists() {
        return Ok(ClientConfig::new());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;

    ClientConfig::from_yaml(&contents)
}

/// Save the client configuration.
pub fn save_client_config(config: &ClientConfig) -> Result<()> {
    let path = client_config_path()
        .ok_or_else(|| ConfigError::Other("Could not determine config directory".to_string()))?;
    save_client_config_to(config, &path)
}

/// Save client config to a specific path.
pub fn save_client_config_to(config: &ClientConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_yaml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Expand ~ to home directory in paths.
fn expand_path(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/"))
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
