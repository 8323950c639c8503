//! Human-readable rendering helpers: byte-size formatting and `tabled` rows.

use serde::Deserialize;
use tabled::Tabled;

const SUFFIXES: [&str; 9] = ["bytes", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

/// log2-based human-readable byte size, matching the original CLI's
/// `file_size()` helper (examples/original_source/.../cli.py).
pub fn file_size(size: i64) -> String {
    if size <= 0 {
        return format!("0 {}", SUFFIXES[0]);
    }
    let order = ((size as f64).log2() / 10.0) as usize;
    let order = order.min(SUFFIXES.len() - 1);
    let scaled = size as f64 / (1u64 << (order * 10)) as f64;
    format!("{scaled:.4} {}", SUFFIXES[order])
}

#[derive(Debug, Deserialize)]
pub struct FileReport {
    pub key: String,
    pub uri_hot: String,
    pub uri_cold: Option<String>,
    pub hot_deleted: bool,
    pub size: i64,
    pub verify_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordReport {
    pub recid: String,
    pub availability: String,
    pub files: Vec<FileReport>,
    pub hot_copies: usize,
    pub cold_copies: usize,
}

#[derive(Tabled)]
pub struct FileRow {
    #[tabled(rename = "key")]
    pub key: String,
    #[tabled(rename = "hot copy")]
    pub hot: String,
    #[tabled(rename = "cold copy")]
    pub cold: String,
    #[tabled(rename = "size")]
    pub size: String,
    #[tabled(rename = "issue")]
    pub issue: String,
}

impl From<&FileReport> for FileRow {
    fn from(file: &FileReport) -> Self {
        Self {
            key: file.key.clone(),
            hot: if file.hot_deleted {
                "-".to_string()
            } else {
                file.uri_hot.clone()
            },
            cold: file.uri_cold.clone().unwrap_or_else(|| "-".to_string()),
            size: file_size(file.size),
            issue: file.verify_error.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Location {
    pub id: uuid::Uuid,
    pub hot_path: String,
    pub cold_path: String,
    pub manager_class: String,
}

#[derive(Tabled)]
pub struct LocationRow {
    #[tabled(rename = "id")]
    pub id: String,
    #[tabled(rename = "hot path")]
    pub hot_path: String,
    #[tabled(rename = "cold path")]
    pub cold_path: String,
    #[tabled(rename = "back-end")]
    pub manager_class: String,
}

impl From<&Location> for LocationRow {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id.to_string(),
            hot_path: location.hot_path.clone(),
            cold_path: location.cold_path.clone(),
            manager_class: location.manager_class.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OperationReport {
    pub done: usize,
    pub scheduled: usize,
    pub error: usize,
    pub registered: usize,
    pub inconsistent: usize,
    pub to_register: usize,
    pub dry: usize,
    pub created: usize,
}

impl OperationReport {
    pub fn has_failures(&self) -> bool {
        self.error > 0 || self.inconsistent > 0
    }

    pub fn summary(&self) -> String {
        format!(
            "done={} scheduled={} created={} registered={} to_register={} inconsistent={} dry={} error={}",
            self.done, self.scheduled, self.created, self.registered, self.to_register, self.inconsistent, self.dry, self.error,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_size_matches_the_original_suffix_table() {
        assert_eq!(file_size(0), "0 bytes");
        assert_eq!(file_size(1053), "1.028 KiB");
        assert_eq!(file_size(1 << 20), "1.000 MiB");
    }
}
