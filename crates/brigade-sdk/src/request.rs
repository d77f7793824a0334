//! Request descriptors.
//!
//! A [`Request`] fully describes one HTTP call before it is executed by
//! [`ApiClient::execute`](crate::ApiClient::execute).

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::meta::{ListOptions, API_VERSION};

/// Description of a single API call.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) list_options: Option<ListOptions>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) include_auth_header: bool,
    pub(crate) body_kind: Option<String>,
    pub(crate) body: Option<Value>,
    pub(crate) success_status: StatusCode,
}

impl Request {
    /// Describe a call to `path`, relative to the API address.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            list_options: None,
            query: Vec::new(),
            headers: Vec::new(),
            include_auth_header: true,
            body_kind: None,
            body: None,
            success_status: StatusCode::OK,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach pagination options.
    pub fn with_list_options(mut self, options: ListOptions) -> Self {
        self.list_options = Some(options);
        self
    }

    /// Add a query parameter. A later value for the same key replaces an earlier one.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.query.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.query.push((key, value)),
        }
        self
    }

    /// Add a header, applied after the defaults and the bearer token.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Do not send the client's bearer token.
    pub fn without_auth(mut self) -> Self {
        self.include_auth_header = false;
        self
    }

    /// Attach a JSON body without a `kind` marker.
    pub fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach a JSON body stamped with `kind`.
    pub fn with_typed_body<B: Serialize + ?Sized>(
        mut self,
        kind: impl Into<String>,
        body: &B,
    ) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        self.body_kind = Some(kind.into());
        Ok(self)
    }

    /// Status that marks the call as successful. Only an exact match succeeds.
    pub fn with_success_status(mut self, status: StatusCode) -> Self {
        self.success_status = status;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn success_status(&self) -> StatusCode {
        self.success_status
    }

    /// Final query string pairs.
    ///
    /// List options come first. An explicit query parameter with the same key
    /// replaces the list option value.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self
            .list_options
            .as_ref()
            .map(ListOptions::query_pairs)
            .unwrap_or_default();
        for (key, value) in &self.query {
            match pairs.iter_mut().find(|(k, _)| k == key) {
                Some(existing) => existing.1 = value.clone(),
                None => pairs.push((key.clone(), value.clone())),
            }
        }
        pairs
    }

    /// The body with `apiVersion` and, when a kind is set, `kind` inserted.
    pub fn stamped_body(&self) -> Result<Option<Value>> {
        let Some(body) = &self.body else {
            return Ok(None);
        };
        let Value::Object(fields) = body else {
            return Err(Error::InvalidBody(format!(
                "expected a JSON object for {} {}",
                self.method, self.path
            )));
        };
        let mut fields = fields.clone();
        fields.insert("apiVersion".to_string(), Value::from(API_VERSION));
        if let Some(kind) = &self.body_kind {
            fields.insert("kind".to_string(), Value::from(kind.as_str()));
        }
        Ok(Some(Value::Object(fields)))
    }
}
