pub mod memory;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::{StoreBackend, StoreConfig};

pub use memory::MemoryStore;
pub use rest::RestStore;

/// Errors surfaced by a document store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store rejected request to '{path}' with status {status}: {message}")]
    Rejected {
        path: String,
        status: u16,
        message: String,
    },

    #[error("Invalid store path: {0}")]
    InvalidPath(String),

    #[error("Corrupt document at '{path}': {message}")]
    Corrupt { path: String, message: String },

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),
}

/// Path-addressed document store with single-path operations only.
///
/// There is no multi-path transaction and no partial merge: `update` is a
/// whole-document replace, same as `set`. Concurrent writers to one path are
/// last-writer-wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the document (or whole subtree) stored at `path`
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the document at `path`, creating it if absent
    async fn set(&self, path: &str, doc: &Value) -> Result<(), StoreError>;

    /// Replace an existing document at `path`
    async fn update(&self, path: &str, doc: &Value) -> Result<(), StoreError>;

    /// Remove the document at `path`; absent paths are a no-op
    async fn delete(&self, path: &str) -> Result<(), StoreError>;
}

/// Characters the hosted store refuses inside a key
const FORBIDDEN_KEY_CHARS: &[char] = &['/', '.', '$', '#', '[', ']'];

/// Check that a single key is usable as one path segment
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.chars().any(|c| FORBIDDEN_KEY_CHARS.contains(&c) || c.is_control())
}

/// Join a collection root and a key into a store path
pub fn child_path(root: &str, key: &str) -> Result<String, StoreError> {
    if !is_valid_segment(key) {
        return Err(StoreError::InvalidPath(key.to_string()));
    }
    Ok(format!("{}/{}", root.trim_end_matches('/'), key))
}

/// Split a path into its non-empty segments
pub(crate) fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Build the configured backend. Called once at startup; the returned handle is
/// cloned into every component that needs it.
pub fn connect(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Rest => {
            let url = config
                .url
                .as_deref()
                .ok_or(StoreError::ConfigMissing("STORE_URL"))?;
            let store = RestStore::new(url, config.auth_token.clone(), config.timeout_secs)?;
            tracing::info!("Using REST document store at {}", store.base_url());
            Ok(Arc::new(store))
        }
    }
}
