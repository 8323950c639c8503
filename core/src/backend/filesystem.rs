use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{PollStatus, TransferBackend, TransferError};

/// Local `cp`-style back-end: copies synchronously under the hood but
/// reports through the same asynchronous contract as every other back-end.
///
/// Grounded on `original_source/.../transfer/cp.py`: jobs are always
/// immediately `DONE` once submission has returned an id.
pub struct FilesystemBackend {
    counter: AtomicU64,
}

impl FilesystemBackend {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    fn local_path(uri: &str) -> String {
        uri.trim_start_matches("file://")
            .splitn(2, '/')
            .last()
            .map(|rest| format!("/{rest}"))
            .unwrap_or_else(|| uri.to_string())
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<Option<String>, TransferError> {
        let src_path = Self::local_path(src);
        let dst_path = Self::local_path(dst);

        if let Some(parent) = std::path::Path::new(&dst_path).parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TransferError::SubmissionFailed(e.to_string()))?;
        }
        tokio::fs::copy(&src_path, &dst_path)
            .await
            .map_err(|e| TransferError::SubmissionFailed(e.to_string()))?;

        let pid = std::process::id();
        let counter = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(Some(format!("{pid}_{counter}")))
    }
}

impl Default for FilesystemBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransferBackend for FilesystemBackend {
    fn key(&self) -> &'static str {
        "cp"
    }

    async fn archive(&self, src: &str, dst: &str) -> Result<Option<String>, TransferError> {
        self.copy(src, dst).await
    }

    async fn stage(&self, src: &str, dst: &str) -> Result<Option<String>, TransferError> {
        self.copy(src, dst).await
    }

    async fn transfer_status(&self, _method_id: &str) -> Result<PollStatus, TransferError> {
        Ok(PollStatus::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_file_prefix_to_local_path() {
        assert_eq!(FilesystemBackend::local_path("file://host/data/f.root"), "/data/f.root");
        assert_eq!(FilesystemBackend::local_path("/already/local"), "/already/local");
    }
}
