//! Bank-transfer receipt intake.
//!
//! Manual-transfer orders end with the customer uploading a receipt for
//! finance to reconcile. This module validates the file (jpeg/png/pdf,
//! at most 5 MiB), hands the bytes to a storage adapter, and records the
//! upload as `pending_review`. Approval and rejection belong to the
//! external reconciliation process; nothing here mutates review status.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;

pub const MAX_RECEIPT_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    PendingReview,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptUpload {
    pub id: Uuid,
    pub order_id: u64,
    pub file_path: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub review_status: ReviewStatus,
    pub uploaded_at: DateTime<Utc>,
}

/// An uploaded file as received from the multipart request.
#[derive(Debug, Clone)]
pub struct ReceiptFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Storage port: where receipt bytes actually go.
#[async_trait]
pub trait ReceiptStorage: Send + Sync {
    /// Persist the file, returning the stored path.
    async fn store(&self, order_id: u64, file: &ReceiptFile) -> Result<String, AppError>;
}

/// Writes receipts under `<root>/<order_id>/<uuid>.<ext>`.
pub struct FilesystemReceiptStorage {
    root: PathBuf,
}

impl FilesystemReceiptStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn extension(mime_type: &str, file_name: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "application/pdf" => "pdf",
            _ => {
                // Validated upstream; fall back to the original extension's
                // closest match for safety.
                if file_name.ends_with(".pdf") {
                    "pdf"
                } else {
                    "bin"
                }
            }
        }
    }
}

#[async_trait]
impl ReceiptStorage for FilesystemReceiptStorage {
    async fn store(&self, order_id: u64, file: &ReceiptFile) -> Result<String, AppError> {
        let dir = self.root.join(order_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        let name = format!(
            "{}.{}",
            Uuid::new_v4(),
            Self::extension(&file.mime_type, &file.file_name)
        );
        let path = dir.join(name);
        tokio::fs::write(&path, &file.bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }
}

pub struct ReceiptIntake {
    storage: Arc<dyn ReceiptStorage>,
    records: RwLock<Vec<ReceiptUpload>>,
}

impl ReceiptIntake {
    pub fn new(storage: Arc<dyn ReceiptStorage>) -> Self {
        Self {
            storage,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Validate and store a receipt. The violated constraint is named in
    /// the error so the customer can fix the upload.
    pub async fn submit(&self, order_id: u64, file: ReceiptFile) -> Result<ReceiptUpload, AppError> {
        if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
            return Err(AppError::InvalidFile {
                constraint: format!(
                    "unsupported file type {:?}; allowed: {}",
                    file.mime_type,
                    ALLOWED_MIME_TYPES.join(", ")
                ),
            });
        }
        if file.bytes.is_empty() {
            return Err(AppError::InvalidFile {
                constraint: "file is empty".to_string(),
            });
        }
        if file.bytes.len() > MAX_RECEIPT_BYTES {
            return Err(AppError::InvalidFile {
                constraint: format!(
                    "file size {} bytes exceeds the {} byte limit",
                    file.bytes.len(),
                    MAX_RECEIPT_BYTES
                ),
            });
        }

        let file_path = self.storage.store(order_id, &file).await?;
        let upload = ReceiptUpload {
            id: Uuid::new_v4(),
            order_id,
            file_path,
            mime_type: file.mime_type,
            size_bytes: file.bytes.len() as u64,
            review_status: ReviewStatus::PendingReview,
            uploaded_at: Utc::now(),
        };

        let mut records = self.records.write().await;
        records.push(upload.clone());
        info!(
            order_id,
            receipt_id = %upload.id,
            size_bytes = upload.size_bytes,
            "transfer receipt stored for review"
        );
        Ok(upload)
    }

    pub async fn for_order(&self, order_id: u64) -> Vec<ReceiptUpload> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect()
    }
}
