use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{ApiError, Backend, RequestContext};

/// One call seen by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub ctx: RequestContext,
}

/// In-memory backend that records calls and answers from canned responses
/// keyed by `"METHOD path"`. Unknown keys answer with an empty list.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<Call>>,
    responses: Mutex<HashMap<String, Result<Value, u16>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, method: &str, path: &str, value: Value) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(format!("{} {}", method, path), Ok(value));
        self
    }

    pub fn fail(self, method: &str, path: &str, status: u16) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(format!("{} {}", method, path), Err(status));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }

    fn answer(
        &self,
        method: &'static str,
        ctx: &RequestContext,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            query: query.to_vec(),
            body,
            ctx: ctx.clone(),
        });
        match self
            .responses
            .lock()
            .unwrap()
            .get(&format!("{} {}", method, path))
        {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(status)) => Err(ApiError::Status {
                status: *status,
                message: "canned failure".to_string(),
            }),
            None => Ok(Value::Array(Vec::new())),
        }
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn get(
        &self,
        ctx: &RequestContext,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, ApiError> {
        self.answer("GET", ctx, path, query, None)
    }

    async fn post(&self, ctx: &RequestContext, path: &str, body: Value) -> Result<Value, ApiError> {
        self.answer("POST", ctx, path, &[], Some(body))
    }

    async fn put(&self, ctx: &RequestContext, path: &str, body: Value) -> Result<Value, ApiError> {
        self.answer("PUT", ctx, path, &[], Some(body))
    }

    async fn delete(&self, ctx: &RequestContext, path: &str) -> Result<(), ApiError> {
        self.answer("DELETE", ctx, path, &[], None).map(|_| ())
    }
}
