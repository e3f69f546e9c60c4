//! Durable storage for leave attachments.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::error::LeaveError;

pub const ALLOWED_MIME_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

/// One uploaded file, as received from the client.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AttachmentUpload {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Where a file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_name: String,
    pub file_path: String,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn save_file(&self, bytes: &[u8], suggested_name: &str) -> Result<StoredFile, LeaveError>;

    async fn delete_file(&self, stored_path: &str) -> Result<(), LeaveError>;
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Rejects files the service does not accept: too large, an unsupported
/// MIME type, or an extension that does not belong to one.
pub fn validate_upload(upload: &AttachmentUpload, max_bytes: u64) -> Result<(), LeaveError> {
    if upload.bytes.is_empty() {
        return Err(LeaveError::invalid(format!(
            "Attachment {} is empty",
            upload.original_name
        )));
    }

    if upload.size() > max_bytes {
        return Err(LeaveError::invalid(format!(
            "Attachment {} exceeds the {} byte limit",
            upload.original_name, max_bytes
        )));
    }

    let ext = extension_of(&upload.original_name).unwrap_or_default();
    if !ALLOWED_MIME_TYPES.contains(&upload.mime_type.as_str())
        || !ALLOWED_EXTENSIONS.contains(&ext.as_str())
    {
        return Err(LeaveError::invalid(
            "Only PDF, PNG, JPG and JPEG attachments are allowed",
        ));
    }

    Ok(())
}

/// Files on the local filesystem under one root directory.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save_file(&self, bytes: &[u8], suggested_name: &str) -> Result<StoredFile, LeaveError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let file_name = match extension_of(suggested_name) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let path = self.root.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        debug!(path = %path.display(), size = bytes.len(), "Attachment stored");

        Ok(StoredFile {
            file_name,
            file_path: path.to_string_lossy().into_owned(),
        })
    }

    async fn delete_file(&self, stored_path: &str) -> Result<(), LeaveError> {
        match tokio::fs::remove_file(stored_path).await {
            Ok(()) => Ok(()),
            // already gone is as good as deleted
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, mime: &str, len: usize) -> AttachmentUpload {
        AttachmentUpload {
            original_name: name.into(),
            mime_type: mime.into(),
            bytes: vec![7; len],
        }
    }

    #[test]
    fn accepts_pdf_and_images() {
        assert!(validate_upload(&upload("note.PDF", "application/pdf", 10), 100).is_ok());
        assert!(validate_upload(&upload("scan.jpeg", "image/jpeg", 10), 100).is_ok());
        assert!(validate_upload(&upload("scan.png", "image/png", 10), 100).is_ok());
    }

    #[test]
    fn rejects_mismatched_extension() {
        let err = validate_upload(&upload("note.exe", "application/pdf", 10), 100).unwrap_err();
        assert!(matches!(err, LeaveError::InvalidInput(_)));
    }

    #[test]
    fn rejects_oversized_files() {
        let err = validate_upload(&upload("note.pdf", "application/pdf", 101), 100).unwrap_err();
        assert!(matches!(err, LeaveError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn saves_and_deletes_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("leave"));

        let stored = storage.save_file(b"%PDF-1.4", "Note.PDF").await.unwrap();
        assert!(stored.file_name.ends_with(".pdf"));
        assert_eq!(tokio::fs::read(&stored.file_path).await.unwrap(), b"%PDF-1.4");

        storage.delete_file(&stored.file_path).await.unwrap();
        assert!(!Path::new(&stored.file_path).exists());

        // second delete is a no-op
        storage.delete_file(&stored.file_path).await.unwrap();
    }
}
