//! HTTP adapters for the remote query and event endpoints.
//!
//! Both talk to one protocol server configured in `[server]`:
//!
//! - `POST {url}/db/query` with a [`QueryRequest`] body, answering a JSON
//!   array of alias-keyed records.
//! - `POST {url}/db/event` with a [`DbEvent`] body, answering the affected
//!   records in the same shape.
//! - `GET {url}/db/acl/{label}` answering a [`LabelAcl`].
//!
//! Reads are retried with exponential backoff on 429, 5xx and network
//! errors. Events are never retried since they are not idempotent.

use std::time::Duration;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use realm_core::events::{DbEvent, EventClient};
use realm_core::models::LabelAcl;
use realm_core::query::{QueryClient, QueryRequest, Record};
use realm_core::{RealmError, Result};

use crate::config::ServerConfig;

const MAX_READ_RETRIES: u32 = 2;

#[derive(Clone)]
struct Endpoint {
    client: reqwest::Client,
    base: String,
}

impl Endpoint {
    fn new(config: &ServerConfig) -> AnyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Send once and decode a JSON body, mapping every failure to `RemoteQuery`.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| RealmError::remote(format!("{what}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RealmError::remote(format!("{what}: HTTP {status}: {body}")));
        }
        response
            .json()
            .await
            .map_err(|e| RealmError::decode(format!("{what}: {e}")))
    }

    /// Like [`Endpoint::send`] but retries transient failures.
    async fn send_idempotent(
        &self,
        build: impl Fn() -> RequestBuilder,
        what: &str,
    ) -> Result<Value> {
        let mut last_err = None;

        for attempt in 0..=MAX_READ_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, ...
                let delay = Duration::from_secs(1 << (attempt - 1));
                tokio::time::sleep(delay).await;
            }

            let response = match build().send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(what, attempt, error = %e, "request failed");
                    last_err = Some(RealmError::remote(format!("{what}: {e}")));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return response
                    .json()
                    .await
                    .map_err(|e| RealmError::decode(format!("{what}: {e}")));
            }

            let body = response.text().await.unwrap_or_default();
            let err = RealmError::remote(format!("{what}: HTTP {status}: {body}"));
            if !is_retryable(status) {
                return Err(err);
            }
            warn!(what, attempt, %status, "retryable server response");
            last_err = Some(err);
        }

        Err(last_err.unwrap_or_else(|| RealmError::remote(format!("{what}: no response"))))
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Accept a bare record array or one wrapped as `{"data": [...]}`.
pub fn parse_records(body: Value, what: &str) -> Result<Vec<Record>> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => return Err(RealmError::decode(format!("{what}: expected a record array"))),
        },
        Value::Null => Vec::new(),
        _ => return Err(RealmError::decode(format!("{what}: expected a record array"))),
    };
    rows.into_iter()
        .map(|row| match row {
            Value::Object(record) => Ok(record),
            other => Err(RealmError::decode(format!("{what}: row is not an object: {other}"))),
        })
        .collect()
}

pub struct HttpQueryClient {
    endpoint: Endpoint,
}

impl HttpQueryClient {
    pub fn new(config: &ServerConfig) -> AnyResult<Self> {
        Ok(Self {
            endpoint: Endpoint::new(config)?,
        })
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn query(&self, request: &QueryRequest) -> Result<Vec<Record>> {
        let url = self.endpoint.url("/db/query");
        debug!(skip = ?request.skip, limit = ?request.limit, "POST /db/query");
        let body = self
            .endpoint
            .send_idempotent(|| self.endpoint.client.post(&url).json(request), "query")
            .await?;
        parse_records(body, "query")
    }
}

pub struct HttpEventClient {
    endpoint: Endpoint,
}

impl HttpEventClient {
    pub fn new(config: &ServerConfig) -> AnyResult<Self> {
        Ok(Self {
            endpoint: Endpoint::new(config)?,
        })
    }
}

#[async_trait]
impl EventClient for HttpEventClient {
    async fn apply_event(&self, event: &DbEvent) -> Result<Vec<Record>> {
        let url = self.endpoint.url("/db/event");
        debug!(event = %event.name, "POST /db/event");
        let body = self
            .endpoint
            .send(self.endpoint.client.post(&url).json(event), &event.name)
            .await?;
        parse_records(body, &event.name)
    }

    async fn label_acl(&self, label: &str) -> Result<LabelAcl> {
        let url = self.endpoint.url(&format!("/db/acl/{label}"));
        let body = self
            .endpoint
            .send_idempotent(|| self.endpoint.client.get(&url), "acl")
            .await?;
        if body.is_null() {
            return Ok(LabelAcl::default());
        }
        serde_json::from_value(body).map_err(|e| RealmError::decode(format!("acl {label}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_array() {
        let rows = parse_records(json!([{ "note": {} }, { "note": {} }]), "query").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains_key("note"));
    }

    #[test]
    fn test_parse_wrapped_array() {
        let rows = parse_records(json!({ "data": [{ "tag": {} }] }), "query").unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_parse_null_is_empty() {
        assert!(parse_records(Value::Null, "event").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_scalar_rows() {
        let err = parse_records(json!([1, 2]), "query").unwrap_err();
        assert!(matches!(err, RealmError::Decode(_)));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let endpoint = Endpoint::new(&ServerConfig {
            url: "https://example.org/".into(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(endpoint.url("/db/query"), "https://example.org/db/query");
    }
}
