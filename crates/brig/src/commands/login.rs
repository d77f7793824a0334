//! Login command - session creation.

use anyhow::Result;
use brigade_config::AuthConfig;
use clap::Args;
use console::style;

use super::Context;

/// Arguments for the login command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Log in as the root user with a password
    #[arg(long)]
    pub root: bool,

    /// Root password (prompted for when omitted)
    #[arg(long, env = "BRIGADE_ROOT_PASSWORD", hide_env_values = true, requires = "root")]
    pub password: Option<String>,
}

/// Run the login command.
pub async fn run(args: LoginArgs, ctx: &Context) -> Result<()> {
    let (client, connection) = ctx.client()?;
    let sessions = client.sessions();

    let token = if args.root {
        let password = match args.password {
            Some(password) => password,
            None => rpassword::prompt_password("Root password: ")?,
        };
        let token = sessions.create_root_session(&password).await?;
        if ctx.json_output {
            println!("{}", serde_json::to_string_pretty(&token)?);
        } else {
            println!("{}", style("Logged in as root.").green());
        }
        token.value
    } else {
        let details = sessions.create_user_session().await?;
        if ctx.json_output {
            println!("{}", serde_json::to_string_pretty(&details)?);
        } else {
            println!("Open this URL in your browser to finish logging in:");
            println!();
            println!("  {}", style(&details.auth_url).cyan());
            println!();
        }
        details.token
    };

    match connection.context_name {
        Some(name) => {
            store_token(&name, Some(token))?;
            if !ctx.json_output {
                println!("Token stored in context \"{}\".", name);
            }
        }
        None if !ctx.json_output => {
            println!("No context selected; token not stored:");
            println!("{}", token);
        }
        None => {}
    }

    Ok(())
}

/// Replace (or clear) the inline token of a saved context.
pub fn store_token(context_name: &str, token: Option<String>) -> Result<()> {
    let mut config = brigade_config::load_client_config()?;
    let context = config
        .get_context_mut(context_name)
        .ok_or_else(|| anyhow::anyhow!("context '{}' not found", context_name))?;
    context.auth = token.map(AuthConfig::inline);
    brigade_config::save_client_config(&config)?;
    tracing::debug!(context = context_name, "Updated stored token");
    Ok(())
}
