//! Storage for uploaded images.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Image extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// URL path under which stored files are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// A file received in a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Errors that can occur while storing or removing files.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file size exceeds {} limit", human_size(*.max_bytes))]
    TooLarge { max_bytes: usize },

    #[error("file type not allowed. Allowed: jpg, jpeg, png, gif, webp")]
    UnsupportedType,

    /// The reference does not point into the managed upload directory.
    #[error("not a stored file reference: {0}")]
    ForeignReference(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Whether the client caused the failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, UploadError::TooLarge { .. } | UploadError::UnsupportedType)
    }
}

fn human_size(bytes: usize) -> String {
    if bytes % (1024 * 1024) == 0 {
        format!("{}MB", bytes / (1024 * 1024))
    } else {
        format!("{bytes} bytes")
    }
}

/// Stores uploaded files and hands out opaque references to them.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores a file under `folder` and returns its public reference.
    async fn store(&self, folder: &str, file: UploadedFile) -> Result<String, UploadError>;

    /// Removes a previously stored file. Missing files are not an error.
    async fn remove(&self, reference: &str) -> Result<(), UploadError>;
}

/// Stores files on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    base_url: String,
    max_bytes: usize,
}

impl LocalFileStorage {
    /// Creates a storage writing under `root`, with references prefixed by
    /// `{base_url}/uploads`.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn reference_prefix(&self) -> String {
        format!("{}{}/", self.base_url, UPLOADS_ROUTE)
    }

    /// Maps a reference back to its path, rejecting anything outside the root.
    fn path_of(&self, reference: &str) -> Result<PathBuf, UploadError> {
        let relative = reference
            .strip_prefix(&self.reference_prefix())
            .ok_or_else(|| UploadError::ForeignReference(reference.to_string()))?;

        let relative = Path::new(relative);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(UploadError::ForeignReference(reference.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

/// Returns the lowercase extension if it is an accepted image type.
fn image_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, folder: &str, file: UploadedFile) -> Result<String, UploadError> {
        if file.bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                max_bytes: self.max_bytes,
            });
        }
        let ext = image_extension(&file.file_name).ok_or(UploadError::UnsupportedType)?;

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!("{}.{ext}", Uuid::new_v4().simple());
        tokio::fs::write(dir.join(&name), &file.bytes).await?;

        let reference = format!("{}{folder}/{name}", self.reference_prefix());
        tracing::debug!(%reference, size = file.bytes.len(), "stored upload");
        Ok(reference)
    }

    async fn remove(&self, reference: &str) -> Result<(), UploadError> {
        if reference.is_empty() {
            return Ok(());
        }
        let path = self.path_of(reference)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(%reference, "removed upload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("storefront-upload-{}", Uuid::new_v4()))
    }

    fn png(size: usize) -> UploadedFile {
        UploadedFile {
            file_name: "Receipt.PNG".to_string(),
            bytes: vec![7; size],
        }
    }

    #[tokio::test]
    async fn stores_and_removes_files() {
        let root = temp_root();
        let storage = LocalFileStorage::new(&root, "http://shop.test/", 1024);

        let reference = storage.store("payments", png(10)).await.unwrap();
        assert!(reference.starts_with("http://shop.test/uploads/payments/"));
        assert!(reference.ends_with(".png"));

        let path = storage.path_of(&reference).unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap().len(), 10);

        storage.remove(&reference).await.unwrap();
        assert!(!path.exists());
        // Removing twice is fine.
        storage.remove(&reference).await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn rejects_oversized_files() {
        let storage = LocalFileStorage::new(temp_root(), "http://shop.test", 5 * 1024 * 1024);
        let result = storage.store("payments", png(5 * 1024 * 1024 + 1)).await;

        match result {
            Err(e @ UploadError::TooLarge { .. }) => {
                assert_eq!(e.to_string(), "file size exceeds 5MB limit");
                assert!(e.is_client_error());
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_unknown_extensions() {
        let storage = LocalFileStorage::new(temp_root(), "http://shop.test", 1024);
        let file = UploadedFile {
            file_name: "script.sh".to_string(),
            bytes: vec![1],
        };
        assert!(matches!(
            storage.store("products", file).await,
            Err(UploadError::UnsupportedType)
        ));
    }

    #[tokio::test]
    async fn refuses_references_outside_the_root() {
        let storage = LocalFileStorage::new(temp_root(), "http://shop.test", 1024);

        assert!(matches!(
            storage.remove("http://elsewhere.test/uploads/a.png").await,
            Err(UploadError::ForeignReference(_))
        ));
        assert!(matches!(
            storage
                .remove("http://shop.test/uploads/../../etc/passwd")
                .await,
            Err(UploadError::ForeignReference(_))
        ));
    }
}
