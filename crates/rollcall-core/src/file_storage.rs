//! Storage for uploaded ticket attachments.
//!
//! Uploads are validated (size, MIME type) before they reach a backend, and
//! stored under a key derived from a timestamp and the sanitized original
//! file name.
//!
//! ```ignore
//! use rollcall_core::file_storage::{FileStorage, LocalFileStorage, attachment_key};
//!
//! let storage = LocalFileStorage::new(PathBuf::from("storage/uploads"), 5 * 1024 * 1024);
//! storage.validate("application/pdf", bytes.len())?;
//! let key = attachment_key(Utc::now().timestamp_millis(), "medical note.pdf");
//! storage.save(&key, &bytes).await?;
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;
use tokio::fs;

pub const ALLOWED_ATTACHMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

pub trait FileStorage: Send + Sync {
    /// Store `content` under `key`, returning the key.
    fn save<'a>(&'a self, key: &'a str, content: &'a [u8]) -> StorageFuture<'a, String>;

    /// Remove a stored file. Missing files are not an error.
    fn delete<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()>;

    fn max_file_size(&self) -> usize;

    /// Check an upload against the size limit and the allowed document types.
    fn validate(&self, content_type: &str, len: usize) -> Result<(), StorageError> {
        if len > self.max_file_size() {
            return Err(StorageError::InvalidFileSize {
                max_bytes: self.max_file_size(),
            });
        }

        if !ALLOWED_ATTACHMENT_TYPES.contains(&content_type) {
            return Err(StorageError::InvalidMimeType {
                received: content_type.to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File exceeds maximum size of {max_bytes} bytes")]
    InvalidFileSize { max_bytes: usize },

    #[error("Only PDF and Word documents are allowed (received '{received}')")]
    InvalidMimeType { received: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    /// Whether the error was caused by the uploaded file rather than the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFileSize { .. } | Self::InvalidMimeType { .. }
        )
    }
}

/// Replaces every character outside `[A-Za-z0-9.]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // A name made only of dots would otherwise produce a traversal-looking key.
    if sanitized.chars().all(|c| c == '.') {
        return format!("file{}", sanitized.replace('.', "_"));
    }

    let mut sanitized = sanitized;
    while sanitized.contains("..") {
        sanitized = sanitized.replace("..", "_.");
    }
    sanitized
}

pub fn attachment_key(timestamp_millis: i64, original_name: &str) -> String {
    format!(
        "tickets/{}-{}",
        timestamp_millis,
        sanitize_file_name(original_name)
    )
}

#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
    max_file_size: usize,
}

impl LocalFileStorage {
    pub fn new(base_dir: PathBuf, max_file_size: usize) -> Self {
        Self {
            base_dir,
            max_file_size,
        }
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        Self::validate_key(key)?;
        Ok(self.base_dir.join(key))
    }

    fn validate_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Key must not be empty, contain '..', or start with '/'".to_string(),
            ));
        }

        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
        {
            return Err(StorageError::InvalidKey(
                "Key contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }
}

impl FileStorage for LocalFileStorage {
    fn save<'a>(&'a self, key: &'a str, content: &'a [u8]) -> StorageFuture<'a, String> {
        Box::pin(async move {
            let file_path = self.path_for(key)?;

            if content.len() > self.max_file_size {
                return Err(StorageError::InvalidFileSize {
                    max_bytes: self.max_file_size,
                });
            }

            if let Some(parent) = file_path.parent() {
                fs::create_dir_all(parent).await?;
            }

            fs::write(&file_path, content).await?;
            tracing::debug!(key = %key, bytes = content.len(), "Stored attachment");

            Ok(key.to_string())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let file_path = self.path_for(key)?;

            match fs::remove_file(&file_path).await {
                Ok(_) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn max_file_size(&self) -> usize {
        self.max_file_size
    }
}
