//! Logout command - session deletion.

use anyhow::Result;
use clap::Args;

use super::Context;
use super::login::store_token;

/// Arguments for the logout command.
#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Forget the stored token even if the server rejects the request
    #[arg(long)]
    pub force: bool,
}

/// Run the logout command.
pub async fn run(args: LogoutArgs, ctx: &Context) -> Result<()> {
    let (client, connection) = ctx.client()?;

    match client.sessions().delete().await {
        Ok(()) => {}
        Err(e) if args.force => {
            tracing::warn!(error = %e, "Session deletion failed, clearing token anyway");
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(name) = &connection.context_name {
        store_token(name, None)?;
    }
    if !ctx.json_output {
        println!("Logged out.");
    }
    Ok(())
}
