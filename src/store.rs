//! Write API of the target document store.
//!
//! The generator only depends on this seam: batched inserts of JSON
//! documents into named collections. Inserts are assumed idempotent-safe
//! because every document carries a unique `_id`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

/// Errors from the target store's write API.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection-level failure (DNS, refused, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The store asked us to slow down.
    #[error("write throttled (status {0})")]
    Throttled(u16),

    /// Server-side failure that may clear up on its own.
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    /// The store rejected the batch outright. Retrying cannot help.
    #[error("batch rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl StoreError {
    /// Whether the writer should retry this failure with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Network(_) | StoreError::Throttled(_) | StoreError::Server { .. }
        )
    }
}

/// Bulk-insert seam over the target store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_batch(&self, collection: &str, documents: &[Value])
        -> Result<(), StoreError>;
}

/// HTTP-backed store client.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    database: String,
}

impl HttpStore {
    /// Create a client for the store's REST write API.
    ///
    /// `base_url` is the server root (e.g. `http://localhost:8800`);
    /// trailing slashes are stripped.
    pub fn new(base_url: &str, database: &str) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            database: database.to_string(),
        })
    }

    fn insert_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/databases/{}/collections/{collection}/insert-many",
            self.base_url, self.database
        )
    }
}

/// Map a non-success HTTP status to the error taxonomy the retry loop
/// keys off: 408/429 and 5xx are transient, everything else is fatal.
fn classify_status(status: u16, message: String) -> StoreError {
    match status {
        408 | 429 => StoreError::Throttled(status),
        500..=599 => StoreError::Server { status, message },
        _ => StoreError::Rejected { status, message },
    }
}

#[async_trait]
impl DocumentStore for HttpStore {
    async fn insert_batch(
        &self,
        collection: &str,
        documents: &[Value],
    ) -> Result<(), StoreError> {
        let url = self.insert_url(collection);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "documents": documents }))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(classify_status(status.as_u16(), message))
    }
}

/// In-memory store used by `--dry-run` and the test suite.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents written to a collection so far.
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .lock()
            .expect("memory store lock poisoned")
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .expect("memory store lock poisoned")
            .get(collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_batch(
        &self,
        collection: &str,
        documents: &[Value],
    ) -> Result<(), StoreError> {
        self.collections
            .lock()
            .expect("memory store lock poisoned")
            .entry(collection.to_string())
            .or_default()
            .extend_from_slice(documents);
        Ok(())
    }
}
