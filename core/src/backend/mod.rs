pub mod filesystem;
pub mod registry;
pub mod wide_area;

use async_trait::async_trait;
use thiserror::Error;

pub use filesystem::FilesystemBackend;
pub use registry::BackendRegistry;
pub use wide_area::WideAreaBackend;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Outcome of polling a back-end for the status of a submitted job.
///
/// Only `Done`/`Failed` are meaningful to the core; anything else is an
/// opaque, back-end-native token surfaced purely for diagnostics (spec §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Done,
    Failed(Option<String>),
    InProgress(String),
    Unknown,
}

/// The copy-engine contract every cold-storage back-end implements.
///
/// `archive`/`stage` submit asynchronously and return immediately with an
/// opaque job id; `transfer_status` polls that id later, possibly after a
/// process restart, so back-ends must be stateless with respect to the
/// submitting process (identified only by the registry key in §4.1).
#[async_trait]
pub trait TransferBackend: Send + Sync {
    /// Stable registry key persisted on the `Transfer` row (e.g. `cp`, `fts`).
    fn key(&self) -> &'static str;

    async fn archive(&self, src: &str, dst: &str) -> Result<Option<String>, TransferError>;

    async fn stage(&self, src: &str, dst: &str) -> Result<Option<String>, TransferError>;

    async fn transfer_status(&self, method_id: &str) -> Result<PollStatus, TransferError>;
}
