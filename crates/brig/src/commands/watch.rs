//! Watch command - follow an event stream.

use anyhow::Result;
use brigade_sdk::StreamEvent;
use clap::Args;
use console::style;
use serde_json::Value;

use super::{parse_key_val, Context};

/// Arguments for the watch command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Stream path, e.g. v2/events/<id>/worker/status or v2/events/<id>/logs
    pub path: String,

    /// Query marker (repeatable), e.g. -q watch=true -q sse=true
    #[arg(short, long = "query", value_parser = parse_key_val)]
    pub query: Vec<(String, String)>,
}

/// Run the watch command.
pub async fn run(args: WatchArgs, ctx: &Context) -> Result<()> {
    let (client, _) = ctx.client()?;
    let query: Vec<(&str, &str)> = args
        .query
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let mut stream = client.open_stream::<Value>(&args.path, &query)?;

    loop {
        let event = tokio::select! {
            event = stream.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                stream.close();
                return Ok(());
            }
        };

        match event {
            Some(StreamEvent::Data(value)) => println!("{}", serde_json::to_string(&value)?),
            Some(StreamEvent::Reconnecting) => {
                if !ctx.json_output {
                    eprintln!("{}", style("reconnecting...").yellow());
                }
            }
            Some(StreamEvent::Done) => {
                tracing::debug!(path = %args.path, "Stream completed");
                return Ok(());
            }
            Some(StreamEvent::Closed) | None => {
                if !ctx.json_output {
                    eprintln!("{}", style("stream closed").dim());
                }
                return Ok(());
            }
            Some(StreamEvent::Error(e)) => return Err(e.into()),
        }
    }
}
