//! The transport seam: requests, responses, and the client trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::Result;

/// JSON object used for query variables and response data.
pub type JsonObject = Map<String, Value>;

/// How a request may be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Serve from a client-side cache when possible.
    CacheFirst,
    /// Always go to the network.
    NetworkOnly,
}

/// A query ready to be executed.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub document: Arc<Document>,
    pub variables: JsonObject,
    pub fetch_policy: FetchPolicy,
}

/// An error reported alongside (possibly partial) response data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub message: String,
    #[serde(default)]
    pub path: Vec<Value>,
}

impl ResponseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }

    /// An error attributed to the field at `key`.
    pub fn at(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: vec![Value::String(key.into())],
        }
    }

    /// The top-level response key this error belongs to, if any.
    pub fn root_key(&self) -> Option<&str> {
        self.path.first().and_then(Value::as_str)
    }
}

/// A query response: data keyed by top-level response key, plus errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub data: JsonObject,
    #[serde(default)]
    pub errors: Vec<ResponseError>,
}

impl QueryResponse {
    /// Combined message of all errors, if there were any.
    pub fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Executes query documents against a remote API.
///
/// Implementations own transport, authentication, and any response
/// caching implied by [`FetchPolicy::CacheFirst`].
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Execute a request. `Err` means no response arrived at all.
    async fn execute(&self, request: QueryRequest) -> Result<QueryResponse>;
}
