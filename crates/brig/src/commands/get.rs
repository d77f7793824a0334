//! Get command - raw resource and list retrieval.

use anyhow::Result;
use brigade_sdk::{List, ListOptions, Request};
use clap::Args;
use serde_json::Value;

use super::{parse_key_val, Context};

/// Arguments for the get command.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Resource path, e.g. v2/projects or v2/events/<id>
    pub path: String,

    /// Page size
    #[arg(long)]
    pub limit: Option<u32>,

    /// Continuation token from a previous page
    #[arg(long = "continue")]
    pub continue_token: Option<String>,

    /// Extra query parameter (repeatable)
    #[arg(short, long = "query", value_parser = parse_key_val)]
    pub query: Vec<(String, String)>,

    /// Follow continuation tokens and print every item
    #[arg(long)]
    pub all: bool,
}

impl GetArgs {
    fn request(&self, options: Option<ListOptions>) -> Request {
        let mut request = Request::get(&self.path);
        if let Some(options) = options {
            request = request.with_list_options(options);
        }
        for (key, value) in &self.query {
            request = request.with_query(key, value);
        }
        request
    }

    fn list_options(&self) -> Option<ListOptions> {
        if self.limit.is_none() && self.continue_token.is_none() {
            return None;
        }
        Some(ListOptions {
            continue_token: self.continue_token.clone(),
            limit: self.limit,
        })
    }
}

/// Run the get command.
pub async fn run(args: GetArgs, ctx: &Context) -> Result<()> {
    let (client, _) = ctx.client()?;

    if !args.all {
        let value = client.execute_raw(&args.request(args.list_options())).await?;
        print_value(&value, ctx.json_output)?;
        return Ok(());
    }

    let mut items = Vec::new();
    let mut options = args.list_options().or_else(|| Some(ListOptions::default()));
    while let Some(opts) = options.take() {
        let value = client.execute_raw(&args.request(Some(opts))).await?;
        let page = list_page(&args.path, value)?;
        tracing::debug!(
            items = page.items.len(),
            remaining = ?page.metadata.remaining_item_count,
            "Fetched page"
        );
        items.extend(page.items);
        options = page.metadata.next_page(args.limit);
    }
    print_value(&Value::Array(items), ctx.json_output)
}

/// Decode one page of a list response; anything without `items` is not a list.
fn list_page(path: &str, value: Value) -> Result<List<Value>> {
    if !value.get("items").is_some_and(Value::is_array) {
        anyhow::bail!("{} did not return a list; retry without --all", path);
    }
    Ok(serde_json::from_value(value)?)
}

fn print_value(value: &Value, compact: bool) -> Result<()> {
    if compact {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(limit: Option<u32>, continue_token: Option<&str>) -> GetArgs {
        GetArgs {
            path: "v2/projects".to_string(),
            limit,
            continue_token: continue_token.map(str::to_string),
            query: vec![("limit".to_string(), "7".to_string())],
            all: false,
        }
    }

    #[test]
    fn test_list_options_only_when_requested() {
        assert!(args(None, None).list_options().is_none());
        let opts = args(Some(5), Some("tok")).list_options().unwrap();
        assert_eq!(opts.limit, Some(5));
        assert_eq!(opts.continue_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_list_page_requires_items() {
        let page = list_page(
            "v2/projects",
            serde_json::json!({"metadata": {"continue": "abc"}, "items": [{"id": 1}]}),
        )
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.metadata.r#continue.as_deref(), Some("abc"));

        let err = list_page(
            "v2/projects/bluebook",
            serde_json::json!({"metadata": {"id": "bluebook"}}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("did not return a list"));

        assert!(list_page("v2/projects", serde_json::json!({"items": null})).is_err());
    }

    #[test]
    fn test_explicit_query_beats_limit_flag() {
        let a = args(Some(5), None);
        let request = a.request(a.list_options());
        assert_eq!(
            request.query_pairs(),
            vec![("limit".to_string(), "7".to_string())]
        );
    }
}
