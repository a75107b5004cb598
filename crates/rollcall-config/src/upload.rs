use std::env;
use std::path::PathBuf;

use crate::env_or;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

impl UploadConfig {
    pub fn from_env() -> Self {
        Self {
            dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("storage/uploads")),
            max_bytes: env_or("UPLOAD_MAX_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
        }
    }

    /// Request body limit for multipart uploads; leaves room for the text fields.
    pub fn body_limit(&self) -> usize {
        self.max_bytes + 64 * 1024
    }
}
