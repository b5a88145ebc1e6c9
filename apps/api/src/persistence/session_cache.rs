use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::persistence::kv::KeyValueStore;
use crate::validation::PDF_CONTENT_TYPE;

const DATA_URL_PREFIX: &str = "data:application/pdf;base64,";

/// A file reconstructed from the session cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

/// Session-scoped copy of uploaded files, encoded as data URLs. Consulted only
/// when the authoritative download is unavailable. No eviction beyond `clear`.
#[derive(Clone)]
pub struct SessionFileCache {
    store: Arc<dyn KeyValueStore>,
}

impl SessionFileCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(path: &str) -> String {
        format!("file:{path}")
    }

    pub async fn store(&self, path: &str, bytes: &[u8]) {
        let data_url = format!("{DATA_URL_PREFIX}{}", BASE64.encode(bytes));
        match self.store.set(&Self::key(path), &data_url).await {
            Ok(()) => debug!("Cached {} bytes for {path}", bytes.len()),
            Err(e) => warn!("Failed to cache file {path} for this session: {e:#}"),
        }
    }

    /// Absent or malformed entries yield `None`, never an error.
    pub async fn retrieve(&self, path: &str) -> Option<CachedFile> {
        let data_url = match self.store.get(&Self::key(path)).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!("No session copy cached for {path}");
                return None;
            }
            Err(e) => {
                warn!("Failed to read session copy of {path}: {e:#}");
                return None;
            }
        };

        let Some((_, payload)) = data_url.split_once(";base64,") else {
            warn!("Session copy of {path} is not a base64 data URL");
            return None;
        };

        match BASE64.decode(payload) {
            Ok(decoded) => Some(CachedFile {
                file_name: path.rsplit('/').next().unwrap_or(path).to_string(),
                content_type: PDF_CONTENT_TYPE,
                bytes: Bytes::from(decoded),
            }),
            Err(e) => {
                warn!("Session copy of {path} has an invalid payload: {e}");
                None
            }
        }
    }

    pub async fn clear(&self, path: &str) {
        if let Err(e) = self.store.remove(&Self::key(path)).await {
            warn!("Failed to clear session copy of {path}: {e:#}");
        }
    }
}
