use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;

use super::{ApiError, Backend, RequestContext};

/// HTTP client for the trust backend.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, ctx: &RequestContext, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header("X-Client", &ctx.client);
        if let Some(token) = &ctx.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, ApiError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else if e.is_connect() {
                ApiError::Unavailable
            } else {
                ApiError::Request(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            log::warn!("Backend returned {}: {}", status, message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Add the entity scope to a JSON object body unless the caller set one.
fn scoped_body(ctx: &RequestContext, mut body: Value) -> Value {
    if let (Some(entity), Value::Object(map)) = (&ctx.entity, &mut body) {
        map.entry("entity")
            .or_insert_with(|| Value::String(entity.clone()));
    }
    body
}

fn scoped_query(ctx: &RequestContext, query: &[(String, String)]) -> Vec<(String, String)> {
    let mut params = query.to_vec();
    if let Some(entity) = &ctx.entity {
        if !params.iter().any(|(key, _)| key == "entity") {
            params.push(("entity".to_string(), entity.clone()));
        }
    }
    params
}

#[async_trait]
impl Backend for ApiClient {
    async fn get(
        &self,
        ctx: &RequestContext,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, ApiError> {
        log::debug!("GET {} {:?}", path, query);
        let builder = self
            .request(Method::GET, ctx, path)
            .query(&scoped_query(ctx, query));
        self.send(builder).await
    }

    async fn post(&self, ctx: &RequestContext, path: &str, body: Value) -> Result<Value, ApiError> {
        log::debug!("POST {}", path);
        let builder = self
            .request(Method::POST, ctx, path)
            .json(&scoped_body(ctx, body));
        self.send(builder).await
    }

    async fn put(&self, ctx: &RequestContext, path: &str, body: Value) -> Result<Value, ApiError> {
        log::debug!("PUT {}", path);
        let builder = self
            .request(Method::PUT, ctx, path)
            .json(&scoped_body(ctx, body));
        self.send(builder).await
    }

    async fn delete(&self, ctx: &RequestContext, path: &str) -> Result<(), ApiError> {
        log::debug!("DELETE {}", path);
        let builder = self
            .request(Method::DELETE, ctx, path)
            .query(&scoped_query(ctx, &[]));
        self.send(builder).await.map(|_| ())
    }
}
