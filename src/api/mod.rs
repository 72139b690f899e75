//! Backend REST API seam
//!
//! Every page talks to the external trust backend through the [`Backend`]
//! trait. The production implementation is [`ApiClient`]; tests swap in a
//! recording fake.

mod client;
#[cfg(test)]
pub mod testing;

pub use client::ApiClient;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Per-request data attached to every backend call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// First label of the request hostname, sent as `X-Client`.
    pub client: String,
    /// Bearer token of the logged in user.
    pub token: Option<String>,
    /// Active sub-organization, if the client has entities configured.
    pub entity: Option<String>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn get(
        &self,
        ctx: &RequestContext,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, ApiError>;

    async fn post(&self, ctx: &RequestContext, path: &str, body: Value) -> Result<Value, ApiError>;

    async fn put(&self, ctx: &RequestContext, path: &str, body: Value) -> Result<Value, ApiError>;

    async fn delete(&self, ctx: &RequestContext, path: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out")]
    Timeout,

    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// True when the backend rejected the caller's credentials.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, ApiError::Status { status: 401 | 403, .. })
    }
}

/// Extract the record list from a list response.
///
/// The backend answers either with a bare array or with `{"data": [...]}`.
pub fn records(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Unwrap a single-record response, tolerating a `{"data": {...}}` envelope.
pub fn record(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}
