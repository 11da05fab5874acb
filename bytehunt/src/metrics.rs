use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Counters for one search job, shared between the walker and the scanner
#[derive(Debug, Clone, Default)]
pub struct ScanMetrics {
    dirs_visited: Arc<AtomicU64>,
    dirs_skipped: Arc<AtomicU64>,
    files_scanned: Arc<AtomicU64>,
    files_matched: Arc<AtomicU64>,
    files_unreadable: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dir_visited(&self) {
        self.dirs_visited.fetch_add(1, Ordering::Relaxed);
    }

    /// A directory that could not be enumerated
    pub fn record_dir_skipped(&self) {
        self.dirs_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_scanned(&self, matched: bool) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        if matched {
            self.files_matched.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_file_unreadable(&self) {
        self.files_unreadable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bytes_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            dirs_visited: self.dirs_visited.load(Ordering::Relaxed),
            dirs_skipped: self.dirs_skipped.load(Ordering::Relaxed),
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_matched: self.files_matched.load(Ordering::Relaxed),
            files_unreadable: self.files_unreadable.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Scan stats:\n\
             Directories visited/skipped: {}/{}\n\
             Files scanned/matched/unreadable: {}/{}/{}\n\
             Bytes read: {}",
            stats.dirs_visited,
            stats.dirs_skipped,
            stats.files_scanned,
            stats.files_matched,
            stats.files_unreadable,
            stats.bytes_read
        );
    }
}

/// Point-in-time copy of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub dirs_visited: u64,
    pub dirs_skipped: u64,
    pub files_scanned: u64,
    pub files_matched: u64,
    pub files_unreadable: u64,
    pub bytes_read: u64,
}
