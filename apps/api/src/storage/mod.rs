//! Document store for named JSON documents read and written whole.
//!
//! The pipeline only sees the `DocumentStore` trait. `AppState` holds an
//! `Arc<dyn DocumentStore>` chosen at startup from `STORE_BACKEND`.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub mod fs;
pub mod s3;

pub use fs::FsDocumentStore;
pub use s3::S3DocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document '{0}' not found")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads and parses the document called `name`.
    async fn read_document(&self, name: &str) -> Result<serde_json::Value, StoreError>;

    /// Writes `value` under `name`, replacing any existing document.
    async fn write_document(&self, name: &str, value: &serde_json::Value)
        -> Result<(), StoreError>;
}

/// Name for a document written without an explicit one: `sample-blob-xxxxx.json`.
pub fn generated_document_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("sample-blob-{}.json", &id[..5])
}

/// Serializes a document as JSON indented by four spaces.
pub fn to_document_bytes(value: &serde_json::Value) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}
