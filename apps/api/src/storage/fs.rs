use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::storage::{to_document_bytes, DocumentStore, StoreError};

/// Stores each document as a file under `root`.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StoreError::Backend(format!("invalid document name '{name}'")));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn read_document(&self, name: &str) -> Result<serde_json::Value, StoreError> {
        let path = self.path_for(name)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => {
                return Err(StoreError::Backend(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        info!("Read document {name} from {}", self.root.display());
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_document(
        &self,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        let bytes = to_document_bytes(value)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to create {}: {e}", self.root.display())))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to write {}: {e}", path.display())))?;
        info!("File {name} written to {}", self.root.display());
        Ok(())
    }
}
