//! Context command - connection context management.

use anyhow::Result;
use clap::{Args, Subcommand};

use brigade_config::Context as ClientContext;

use super::Context;

/// Arguments for the context command.
#[derive(Args, Debug)]
pub struct ContextArgs {
    #[command(subcommand)]
    pub command: ContextCommand,
}

#[derive(Subcommand, Debug)]
pub enum ContextCommand {
    /// List available contexts
    List,

    /// Show the current context name
    Current,

    /// Switch to a different context
    Use {
        /// Context name to switch to
        name: String,
    },

    /// Create or update a context
    Set {
        /// Context name
        name: String,

        /// API server address (e.g., https://brigade.example.com)
        #[arg(long)]
        server: Option<String>,

        /// Skip TLS certificate validation for this context
        #[arg(long)]
        allow_insecure: Option<bool>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Delete a context
    Delete {
        /// Context name to delete
        name: String,
    },
}

/// Run the context command.
pub async fn run(args: ContextArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ContextCommand::List => cmd_list(ctx),
        ContextCommand::Current => cmd_current(),
        ContextCommand::Use { name } => cmd_use(&name),
        ContextCommand::Set {
            name,
            server,
            allow_insecure,
            timeout,
        } => cmd_set(&name, server, allow_insecure, timeout),
        ContextCommand::Delete { name } => cmd_delete(&name),
    }
}

fn cmd_list(ctx: &Context) -> Result<()> {
    let config = brigade_config::load_client_config()?;

    if ctx.json_output {
        let names: Vec<_> = config
            .contexts
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name,
                    "server": c.server,
                    "current": config.current_context.as_deref() == Some(c.name.as_str()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }

    if config.contexts.is_empty() {
        println!("No contexts configured.");
        println!();
        println!("Create one with:");
        println!("  brig context set local --server=https://localhost:7000");
        return Ok(());
    }

    let current = config.current_context.as_deref();

    println!("CURRENT   NAME            SERVER");
    for c in &config.contexts {
        let marker = if current == Some(c.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{}         {:<15} {}", marker, c.name, c.server);
    }

    Ok(())
}

fn cmd_current() -> Result<()> {
    let config = brigade_config::load_client_config()?;
    match config.current_context {
        Some(name) => println!("{}", name),
        None => anyhow::bail!("no current context set"),
    }
    Ok(())
}

fn cmd_use(name: &str) -> Result<()> {
    let mut config = brigade_config::load_client_config()?;
    config.use_context(name)?;
    brigade_config::save_client_config(&config)?;
    println!("Switched to context \"{}\".", name);
    Ok(())
}

fn cmd_set(
    name: &str,
    server: Option<String>,
    allow_insecure: Option<bool>,
    timeout: Option<u64>,
) -> Result<()> {
    let mut config = brigade_config::load_client_config()?;

    match config.get_context_mut(name) {
        Some(existing) => {
            if let Some(url) = server {
                existing.server = url;
            }
            if let Some(allow) = allow_insecure {
                existing.allow_insecure_connections = allow;
            }
            if let Some(t) = timeout {
                existing.timeout = Some(t);
            }
            println!("Context \"{}\" modified.", name);
        }
        None => {
            // New contexts need a server
            let server_url = server
                .ok_or_else(|| anyhow::anyhow!("--server is required when creating a new context"))?;

            let mut created =
                ClientContext::new(name, server_url).with_insecure(allow_insecure.unwrap_or(false));
            if let Some(t) = timeout {
                created = created.with_timeout(t);
            }
            config.set_context(created);
            println!("Context \"{}\" created.", name);
        }
    }

    // If this is the first context, make it current
    if config.current_context.is_none() && config.contexts.len() == 1 {
        config.current_context = Some(name.to_string());
        println!("Context \"{}\" set as current context.", name);
    }

    brigade_config::save_client_config(&config)?;
    Ok(())
}

fn cmd_delete(name: &str) -> Result<()> {
    let mut config = brigade_config::load_client_config()?;
    if config.remove_context(name).is_none() {
        anyhow::bail!("context '{}' not found", name);
    }
    brigade_config::save_client_config(&config)?;
    println!("Context \"{}\" deleted.", name);
    Ok(())
}
