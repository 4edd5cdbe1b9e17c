//! [`BlobStore`] over the IPFS HTTP API.
//!
//! `store` posts the bytes as a multipart upload to `/api/v0/add` and
//! returns the `Hash` from the reply; `fetch` reads `/api/v0/cat?arg=<hash>`.

use std::time::Duration;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use realm_core::blob::BlobStore;
use realm_core::error::FetchErrorKind;
use realm_core::{RealmError, Result};

use crate::config::BlobsConfig;

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

pub struct HttpBlobStore {
    client: reqwest::Client,
    api_url: String,
}

impl HttpBlobStore {
    pub fn new(config: &BlobsConfig) -> AnyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

/// How a failed `cat` should be reported.
pub fn fetch_error_kind(status: Option<StatusCode>, timed_out: bool) -> FetchErrorKind {
    if timed_out {
        return FetchErrorKind::Timeout;
    }
    match status {
        Some(StatusCode::NOT_FOUND) => FetchErrorKind::NotFound,
        Some(StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT) => FetchErrorKind::Timeout,
        _ => FetchErrorKind::Unavailable,
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn store(&self, content: &[u8]) -> Result<String> {
        let url = format!("{}/api/v0/add", self.api_url);
        let part = Part::bytes(content.to_vec()).file_name("note.md");
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RealmError::remote(format!("ipfs add: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RealmError::remote(format!("ipfs add: HTTP {status}: {body}")));
        }

        let added: AddResponse = response
            .json()
            .await
            .map_err(|e| RealmError::decode(format!("ipfs add: {e}")))?;
        debug!(hash = %added.hash, bytes = content.len(), "stored blob");
        Ok(added.hash)
    }

    async fn fetch(&self, hash: &str) -> Result<Vec<u8>> {
        let url = format!("{}/api/v0/cat", self.api_url);
        let response = self
            .client
            .post(&url)
            .query(&[("arg", hash)])
            .send()
            .await
            .map_err(|e| RealmError::content(hash, fetch_error_kind(e.status(), e.is_timeout())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RealmError::content(hash, fetch_error_kind(Some(status), false)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RealmError::content(hash, fetch_error_kind(None, e.is_timeout())))?;
        debug!(hash, bytes = bytes.len(), "fetched blob");
        Ok(bytes.to_vec())
    }
}
