//! Receipt file storage
//!
//! Receipts live as plain files in the upload directory and are served back
//! under `/uploads/<name>`.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{OrderError, Result};

pub const UPLOADS_PREFIX: &str = "/uploads/";

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref UNSAFE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_.-]").unwrap();
}

/// Reduces a client supplied file name to something safe to use as a single
/// path component. Directory parts are dropped, accented letters are folded to
/// their ASCII base (NFKD), whitespace becomes `_`, and any character outside
/// `[A-Za-z0-9_.-]` is removed.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let decomposed: String = base.nfkd().collect();
    let joined = WHITESPACE.replace_all(decomposed.trim(), "_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

#[derive(Clone, Debug)]
pub struct ReceiptStore {
    upload_dir: PathBuf,
}

impl ReceiptStore {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Creates the upload directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await.map_err(|e| {
            OrderError::Storage(format!(
                "Cannot create upload directory {}: {}",
                self.upload_dir.display(),
                e
            ))
        })
    }

    /// Writes a receipt and returns its public URL path.
    pub async fn save(&self, bytes: &[u8], original_name: &str, order_id: &str) -> Result<String> {
        let base = original_name.rsplit(['/', '\\']).next().unwrap_or_default();
        let stored_name = sanitize_file_name(&format!("{}_{}", order_id, base));
        if stored_name.is_empty() {
            return Err(OrderError::Storage(format!(
                "Cannot derive a file name for order {}",
                order_id
            )));
        }

        let path = self.upload_dir.join(&stored_name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            tracing::error!("Failed to write receipt {}: {}", path.display(), e);
            OrderError::Storage(format!("Failed to write receipt {}: {}", stored_name, e))
        })?;

        tracing::debug!(order_id = %order_id, "Stored receipt {} ({} bytes)", stored_name, bytes.len());
        Ok(format!("{}{}", UPLOADS_PREFIX, stored_name))
    }

    /// Reads a stored receipt by its exact stored name.
    pub async fn fetch(&self, file_name: &str) -> Result<Vec<u8>> {
        // Anything that is not already a sanitized single component was never written by `save`
        if file_name.is_empty() || sanitize_file_name(file_name) != file_name {
            return Err(OrderError::NotFound(format!("receipt {}", file_name)));
        }

        match tokio::fs::read(self.upload_dir.join(file_name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OrderError::NotFound(format!("receipt {}", file_name)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
