//! Storage for registration documents (payment proofs, ID photos, minor
//! authorisations). Records only ever hold the opaque path returned by
//! [`DocumentStore::put`].

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Result, StorageError};

pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "application/pdf"];

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store `bytes` under `folder/name` and return the stored path.
    async fn put(&self, folder: &str, name: &str, bytes: &[u8], content_type: &str) -> Result<String>;

    /// Remove every path. Paths that no longer exist are skipped.
    async fn delete_many(&self, paths: &[String]) -> Result<()>;
}

/// Documents kept on the local filesystem below `root`.
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

        if !safe || relative.as_os_str().is_empty() {
            return Err(StorageError::InvalidInput(format!(
                "Invalid document path: {}",
                relative.display()
            )));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn put(&self, folder: &str, name: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
            return Err(StorageError::InvalidInput(format!(
                "Unsupported document type: {content_type}"
            )));
        }

        let relative = format!("{}/{}", sanitize(folder), sanitize(name));
        let target = self.resolve(&relative)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        tracing::debug!(path = %relative, size = bytes.len(), "Document stored");

        Ok(relative)
    }

    async fn delete_many(&self, paths: &[String]) -> Result<()> {
        for path in paths {
            let target = self.resolve(path)?;
            match tokio::fs::remove_file(&target).await {
                Ok(()) => tracing::debug!(path = %path, "Document removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path, "Document already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Build the stored file name of a registration document, keeping the
/// extension of the uploaded file.
pub fn document_name(owner: &str, kind: &str, original_filename: Option<&str>, stamp: i64) -> String {
    let extension = original_filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string());

    format!("{}_{}_{}.{}", sanitize(owner), kind, stamp, sanitize(&extension))
}

fn sanitize(part: &str) -> String {
    let mut cleaned: String = part
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", "_");
    }

    cleaned.trim_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::new(dir.path());

        let path = store
            .put("payments", "123_proof_1.pdf", b"%PDF-1.4", "application/pdf")
            .await
            .unwrap();
        assert_eq!(path, "payments/123_proof_1.pdf");
        assert!(dir.path().join(&path).exists());

        store.delete_many(&[path.clone()]).await.unwrap();
        assert!(!dir.path().join(&path).exists());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::new(dir.path());

        store
            .delete_many(&["ids/never_uploaded.jpg".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejects_unsupported_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::new(dir.path());

        let result = store.put("ids", "a.exe", b"MZ", "application/x-msdownload").await;
        assert!(matches!(result, Err(StorageError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_traversal_is_neutralised() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::new(dir.path());

        let path = store
            .put("../outside", "../../x.png", b"png", "image/png")
            .await
            .unwrap();
        assert!(!path.contains(".."));
        assert!(dir.path().join(&path).starts_with(dir.path()));

        assert!(store.delete_many(&["../etc/passwd".to_string()]).await.is_err());
    }

    #[test]
    fn test_document_name_keeps_extension() {
        assert_eq!(
            document_name("7654321", "id_front", Some("Scan.JPG"), 1700000000),
            "7654321_id_front_1700000000.jpg"
        );
        assert_eq!(
            document_name("7654321", "proof", None, 1),
            "7654321_proof_1.bin"
        );
    }
}
