use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use url::Url;

use super::{segments, DocumentStore, StoreError};

/// Realtime-Database style REST driver: every path maps to `<base>/<path>.json`
pub struct RestStore {
    client: Client,
    base: Url,
    auth_token: Option<String>,
}

impl RestStore {
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, StoreError> {
        let base = Url::parse(base_url).map_err(|e| StoreError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            auth_token,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Resolve a store path to its REST resource URL
    fn document_url(&self, path: &str) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        let parts = segments(path);
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidUrl(self.base.to_string()))?;
            segs.pop_if_empty();
            match parts.split_last() {
                Some((last, parents)) => {
                    segs.extend(parents);
                    segs.push(&format!("{}.json", last));
                }
                None => {
                    segs.push(".json");
                }
            }
        }
        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    async fn check(path: &str, response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            path: path.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn put(&self, path: &str, doc: &Value) -> Result<(), StoreError> {
        let url = self.document_url(path)?;
        let response = self
            .client
            .put(url)
            .json(doc)
            .send()
            .await
            .map_err(|e| transport(path, e))?;
        Self::check(path, response).await?;
        tracing::debug!("PUT {}", path);
        Ok(())
    }
}

fn transport(path: &str, err: reqwest::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {}", path, err))
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let url = self.document_url(path)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport(path, e))?;
        let response = Self::check(path, response).await?;

        let body: Value = response.json().await.map_err(|e| StoreError::Corrupt {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(match body {
            Value::Null => None,
            other => Some(other),
        })
    }

    async fn set(&self, path: &str, doc: &Value) -> Result<(), StoreError> {
        self.put(path, doc).await
    }

    async fn update(&self, path: &str, doc: &Value) -> Result<(), StoreError> {
        self.put(path, doc).await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let url = self.document_url(path)?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| transport(path, e))?;
        Self::check(path, response).await?;
        tracing::debug!("DELETE {}", path);
        Ok(())
    }
}
