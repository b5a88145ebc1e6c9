use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::errors::ErrorCategory;
use crate::retry::Retryable;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("storage permission denied: {0}")]
    PermissionDenied(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            StorageError::Unavailable(_) => ErrorCategory::Network,
            _ => ErrorCategory::DataStorage,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "STORAGE_NOT_FOUND",
            StorageError::QuotaExceeded(_) => "STORAGE_QUOTA_EXCEEDED",
            StorageError::PermissionDenied(_) => "STORAGE_PERMISSION_DENIED",
            StorageError::Unavailable(_) => "STORAGE_UNAVAILABLE",
            StorageError::Backend(_) => "STORAGE_ERROR",
        }
    }

    fn from_sdk<E, R>(path: &str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        match err.code() {
            Some("NoSuchKey") | Some("NotFound") => return StorageError::NotFound(path.to_string()),
            Some("AccessDenied") | Some("Forbidden") => {
                return StorageError::PermissionDenied(path.to_string())
            }
            Some("QuotaExceeded") | Some("EntityTooLarge") => {
                return StorageError::QuotaExceeded(path.to_string())
            }
            _ => {}
        }
        let detail = DisplayErrorContext(&err).to_string();
        match err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
                StorageError::Unavailable(detail)
            }
            _ => StorageError::Backend(detail),
        }
    }
}

/// Quota and permission failures never retry.
impl Retryable for StorageError {
    fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

/// Named blobs under one bucket.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;

    async fn download(&self, path: &str) -> Result<Bytes, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

#[derive(Clone)]
pub struct S3BlobStorage {
    client: S3Client,
    bucket: String,
}

impl S3BlobStorage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl BlobStorage for S3BlobStorage {
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk(path, e))?;

        info!("Uploaded {size} bytes to s3://{}/{path}", self.bucket);
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk(path, e))?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Unavailable(format!("reading {path}: {e}")))?;
        Ok(data.into_bytes())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk(path, e))?;

        info!("Deleted s3://{}/{path}", self.bucket);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory bucket. `set_unavailable(true)` makes downloads fail.
    #[derive(Default)]
    pub struct MemoryBlobStorage {
        pub objects: Mutex<HashMap<String, Bytes>>,
        unavailable: AtomicBool,
    }

    impl MemoryBlobStorage {
        pub fn set_unavailable(&self, value: bool) {
            self.unavailable.store(value, Ordering::SeqCst);
        }

        pub fn contains(&self, path: &str) -> bool {
            self.objects.lock().unwrap().contains_key(path)
        }
    }

    #[async_trait]
    impl BlobStorage for MemoryBlobStorage {
        async fn upload(
            &self,
            path: &str,
            bytes: Bytes,
            _content_type: &str,
        ) -> Result<(), StorageError> {
            self.objects.lock().unwrap().insert(path.to_string(), bytes);
            Ok(())
        }

        async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("bucket offline".to_string()));
            }
            self.objects
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(path.to_string()))
        }

        async fn delete(&self, path: &str) -> Result<(), StorageError> {
            self.objects.lock().unwrap().remove(path);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryBlobStorage;
    use super::*;

    #[test]
    fn test_only_unavailability_retries() {
        assert!(StorageError::Unavailable("timeout".into()).is_retryable());
        assert!(!StorageError::QuotaExceeded("full".into()).is_retryable());
        assert!(!StorageError::PermissionDenied("nope".into()).is_retryable());
        assert!(!StorageError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            StorageError::Unavailable("x".into()).category(),
            ErrorCategory::Network
        );
        assert_eq!(
            StorageError::QuotaExceeded("x".into()).category(),
            ErrorCategory::DataStorage
        );
        assert_eq!(
            StorageError::PermissionDenied("x".into()).code(),
            "STORAGE_PERMISSION_DENIED"
        );
    }

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemoryBlobStorage::default();
        storage
            .upload("u/cv.pdf", Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();
        assert_eq!(storage.download("u/cv.pdf").await.unwrap(), Bytes::from_static(b"%PDF"));

        storage.set_unavailable(true);
        assert!(matches!(
            storage.download("u/cv.pdf").await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(storage.contains("u/cv.pdf"));
    }
}
