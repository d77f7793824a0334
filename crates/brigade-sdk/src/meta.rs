//! Metadata shared by every resource: API version stamping and list envelopes.

use serde::{Deserialize, Serialize};

/// Value stamped into the `apiVersion` field of every outbound body.
pub const API_VERSION: &str = "brigade.sh/v2";

/// Pagination options for list operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Opaque continuation token returned by a previous page.
    pub continue_token: Option<String>,
    /// Maximum number of items to return.
    pub limit: Option<u32>,
}

impl ListOptions {
    /// Options requesting at most `limit` items.
    pub fn with_limit(limit: u32) -> Self {
        Self {
            continue_token: None,
            limit: Some(limit),
        }
    }

    /// Set the continuation token.
    pub fn continue_from(mut self, token: impl Into<String>) -> Self {
        self.continue_token = Some(token.into());
        self
    }

    /// Query pairs for these options. Empty tokens and zero limits are omitted.
    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(token) = self.continue_token.as_deref().filter(|t| !t.is_empty()) {
            pairs.push(("continue".to_string(), token.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

/// Metadata attached to every list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// Continuation token; absent when the list is exhausted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#continue: Option<String>,
    /// Number of items remaining after this page, when the server knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_item_count: Option<u64>,
}

impl ListMeta {
    /// Options for fetching the page after this one, or `None` once exhausted.
    pub fn next_page(&self, limit: Option<u32>) -> Option<ListOptions> {
        self.r#continue
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(|token| ListOptions {
                continue_token: Some(token.to_string()),
                limit,
            })
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List<T> {
    #[serde(default)]
    pub metadata: ListMeta,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> List<T> {
    /// True when no further page can be requested.
    pub fn is_exhausted(&self) -> bool {
        self.metadata.next_page(None).is_none()
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self {
            metadata: ListMeta::default(),
            items: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_options_pairs() {
        let opts = ListOptions::with_limit(20).continue_from("abc");
        assert_eq!(
            opts.query_pairs(),
            vec![
                ("continue".to_string(), "abc".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_options_skip_empty_values() {
        let opts = ListOptions {
            continue_token: Some(String::new()),
            limit: Some(0),
        };
        assert!(opts.query_pairs().is_empty());
    }

    #[test]
    fn test_list_deserializes_wire_names() {
        let list: List<String> = serde_json::from_str(
            r#"{"metadata":{"continue":"next","remainingItemCount":4},"items":["a","b"]}"#,
        )
        .unwrap();
        assert_eq!(list.items, vec!["a", "b"]);
        assert_eq!(list.metadata.r#continue.as_deref(), Some("next"));
        assert_eq!(list.metadata.remaining_item_count, Some(4));
        assert!(!list.is_exhausted());
    }

    #[test]
    fn test_list_missing_fields_default() {
        let list: List<String> = serde_json::from_str("{}").unwrap();
        assert!(list.items.is_empty());
        assert!(list.is_exhausted());
    }

    #[test]
    fn test_next_page_carries_token_and_limit() {
        let meta = ListMeta {
            r#continue: Some("tok".to_string()),
            remaining_item_count: None,
        };
        let next = meta.next_page(Some(10)).unwrap();
        assert_eq!(next.continue_token.as_deref(), Some("tok"));
        assert_eq!(next.limit, Some(10));
        assert!(ListMeta::default().next_page(Some(10)).is_none());
    }
}
