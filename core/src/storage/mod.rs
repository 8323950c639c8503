//! Storage Router: maps URIs between the hot and cold tiers and dispatches
//! asynchronous copies through the bound back-end (spec §4.2).

use std::sync::Arc;

use adler32::adler32;

use crate::backend::{BackendRegistry, TransferBackend};
use crate::model::files::File;
use crate::model::locations::Location;
use crate::model::transfers::TransferAction;

/// A submission ready to be persisted as a `Transfer` row.
pub struct DispatchedTransfer {
    pub action: TransferAction,
    pub new_filename: String,
    pub filename: String,
    pub method: String,
    pub method_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyFailure {
    DoesNotExist,
    DifferentSize,
    DifferentChecksum,
    UnsupportedScheme,
}

impl std::fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            VerifyFailure::DoesNotExist => "File does not exist",
            VerifyFailure::DifferentSize => "different size",
            VerifyFailure::DifferentChecksum => "different checksum",
            VerifyFailure::UnsupportedScheme => "Unsupported URI scheme",
        };
        f.write_str(msg)
    }
}

pub struct StorageRouter {
    locations: Vec<Location>,
    backends: BackendRegistry,
    http: reqwest::Client,
}

impl StorageRouter {
    pub fn new(locations: Vec<Location>, backends: BackendRegistry) -> Self {
        Self {
            locations,
            backends,
            http: reqwest::Client::new(),
        }
    }

    fn prefix<'a>(location: &'a Location, action: TransferAction) -> &'a str {
        match action {
            TransferAction::Archive => &location.hot_path,
            TransferAction::Stage => &location.cold_path,
        }
    }

    fn peer_prefix<'a>(location: &'a Location, action: TransferAction) -> &'a str {
        match action {
            TransferAction::Archive => &location.cold_path,
            TransferAction::Stage => &location.hot_path,
        }
    }

    /// Longest-prefix match over the known locations (spec §4.2).
    pub fn find_url(&self, action: TransferAction, uri: &str) -> Option<(String, &Location)> {
        let location = self
            .locations
            .iter()
            .filter(|l| uri.starts_with(Self::prefix(l, action)))
            .max_by_key(|l| Self::prefix(l, action).len())?;

        let src_prefix = Self::prefix(location, action);
        let peer = format!(
            "{}{}",
            Self::peer_prefix(location, action),
            &uri[src_prefix.len()..]
        );
        Some((peer, location))
    }

    fn backend_for(&self, location: &Location) -> Option<Arc<dyn TransferBackend>> {
        self.backends.get(&location.manager_class)
    }

    pub async fn archive(&self, file: &File) -> Option<DispatchedTransfer> {
        let (dest, location) = self.find_url(TransferAction::Archive, &file.uri_hot)?;
        let backend = self.backend_for(location)?;
        let method_id = backend.archive(&file.uri_hot, &dest).await.ok()??;
        Some(DispatchedTransfer {
            action: TransferAction::Archive,
            new_filename: dest,
            filename: file.uri_hot.clone(),
            method: backend.key().to_string(),
            method_id: Some(method_id),
        })
    }

    pub async fn stage(&self, file: &File) -> Option<DispatchedTransfer> {
        let source = file.uri_cold.clone()?;
        let (dest, location) = self.find_url(TransferAction::Stage, &source)?;
        let backend = self.backend_for(location)?;
        let method_id = backend.stage(&source, &dest).await.ok()??;
        Some(DispatchedTransfer {
            action: TransferAction::Stage,
            new_filename: dest,
            filename: source,
            method: backend.key().to_string(),
            method_id: Some(method_id),
        })
    }

    /// Strips a `root://host/` or `file://host/` prefix down to a local path.
    fn local_path(uri: &str) -> Option<String> {
        for scheme in ["file://", "root://"] {
            if let Some(rest) = uri.strip_prefix(scheme) {
                let path = rest.splitn(2, '/').nth(1)?;
                return Some(format!("/{path}"));
            }
        }
        None
    }

    /// Deletes the local hot copy. Idempotent: a missing file logs a warning
    /// and returns `false` rather than propagating an error (spec §4.2).
    pub async fn clear_hot(&self, uri: &str) -> bool {
        let Some(path) = Self::local_path(uri) else {
            tracing::warn!(uri, "clear_hot: cannot derive a local path");
            return false;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(uri, path, "clear_hot: hot copy already absent");
                false
            }
            Err(e) => {
                tracing::warn!(uri, path, error = %e, "clear_hot: failed to delete hot copy");
                false
            }
        }
    }

    /// Stats `uri` and compares size and `adler32` checksum against the
    /// catalog's expectation. Remote (`https://`) URIs are checked for
    /// existence and size only; no portable way to retrieve a remote
    /// checksum without a back-end-specific API exists at this layer.
    pub async fn verify_file(
        &self,
        uri: &str,
        expected_size: i64,
        expected_checksum: &str,
    ) -> Result<(), VerifyFailure> {
        if uri.starts_with("file://") {
            let path = Self::local_path(uri).ok_or(VerifyFailure::UnsupportedScheme)?;
            return self.verify_local(&path, expected_size, expected_checksum).await;
        }
        if uri.starts_with("https://") || uri.starts_with("http://") {
            return self.verify_remote(uri, expected_size).await;
        }
        Err(VerifyFailure::UnsupportedScheme)
    }

    async fn verify_local(
        &self,
        path: &str,
        expected_size: i64,
        expected_checksum: &str,
    ) -> Result<(), VerifyFailure> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|_| VerifyFailure::DoesNotExist)?;
        if bytes.len() as i64 != expected_size {
            return Err(VerifyFailure::DifferentSize);
        }
        let checksum = format!("adler32:{:08x}", adler32(std::io::Cursor::new(&bytes)).unwrap_or(0));
        if checksum != expected_checksum {
            return Err(VerifyFailure::DifferentChecksum);
        }
        Ok(())
    }

    async fn verify_remote(&self, uri: &str, expected_size: i64) -> Result<(), VerifyFailure> {
        let response = self
            .http
            .head(uri)
            .send()
            .await
            .map_err(|_| VerifyFailure::DoesNotExist)?;
        if !response.status().is_success() {
            return Err(VerifyFailure::DoesNotExist);
        }
        if let Some(len) = response.content_length() {
            if len as i64 != expected_size {
                return Err(VerifyFailure::DifferentSize);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FilesystemBackend;
    use chrono::Utc;
    use uuid::Uuid;

    fn location(hot: &str, cold: &str, manager_class: &str) -> Location {
        Location {
            id: Uuid::new_v4(),
            hot_path: hot.to_string(),
            cold_path: cold.to_string(),
            manager_class: manager_class.to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }

    fn router() -> StorageRouter {
        let mut backends = BackendRegistry::new();
        backends.register(Arc::new(FilesystemBackend::new()));
        StorageRouter::new(
            vec![
                location("hot://X", "cold://Y", "cp"),
                location("hot://X/special", "cold://Z", "cp"),
            ],
            backends,
        )
    }

    #[test]
    fn find_url_picks_longest_prefix_match() {
        let router = router();
        let (peer, location) = router
            .find_url(TransferAction::Archive, "hot://X/special/f.root")
            .unwrap();
        assert_eq!(peer, "cold://Z/f.root");
        assert_eq!(location.cold_path, "cold://Z");
    }

    #[test]
    fn find_url_falls_back_to_shorter_prefix() {
        let router = router();
        let (peer, _) = router
            .find_url(TransferAction::Archive, "hot://X/plain/f.root")
            .unwrap();
        assert_eq!(peer, "cold://Y/plain/f.root");
    }

    #[test]
    fn find_url_returns_none_when_no_location_matches() {
        let router = router();
        assert!(router.find_url(TransferAction::Archive, "hot://other/f").is_none());
    }

    #[test]
    fn local_path_strips_host_qualified_prefixes() {
        assert_eq!(StorageRouter::local_path("file://host/data/f.root").unwrap(), "/data/f.root");
        assert_eq!(StorageRouter::local_path("root://host/data/f.root").unwrap(), "/data/f.root");
        assert!(StorageRouter::local_path("https://host/data/f.root").is_none());
    }
}
