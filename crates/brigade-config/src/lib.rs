//! Client configuration for Brigade API connections.
//!
//! A kubeconfig-style YAML file holds named connection contexts:
//! - API server address and TLS policy per context
//! - Bearer token inline, from a file, or from an environment variable
//! - `current-context` for default selection

pub mod client;
pub mod error;

pub use client::{
    client_config_path, config_dir, load_client_config, load_client_config_from,
    save_client_config, save_client_config_to, AuthConfig, ClientConfig, Context,
};
pub use error::{ConfigError, Result};
