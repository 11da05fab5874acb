use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, trace};

use super::cancel::Cancellation;
use super::matcher::ByteMatcher;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::ScanMetrics;

/// Scans one file at a time for the needle
#[derive(Debug, Clone)]
pub struct FileScanner {
    matcher: ByteMatcher,
    metrics: ScanMetrics,
}

impl FileScanner {
    pub fn new(matcher: ByteMatcher, metrics: ScanMetrics) -> Self {
        Self { matcher, metrics }
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// True if the file contains the needle. Open and read failures count as
    /// "no match"; the handle is closed on every path when `file` drops.
    pub fn file_matches(&self, path: &Path, cancel: &Cancellation) -> bool {
        match self.scan_file(path, cancel) {
            Ok(matched) => {
                self.metrics.record_file_scanned(matched);
                matched
            }
            Err(e) => {
                debug!("Skipping unreadable file {}: {}", path.display(), e);
                self.metrics.record_file_unreadable();
                false
            }
        }
    }

    fn scan_file(&self, path: &Path, cancel: &Cancellation) -> SearchResult<bool> {
        trace!("Scanning file: {}", path.display());

        let file = File::open(path).map_err(|e| SearchError::from_io(e, path))?;
        let reader = CountingReader {
            inner: file,
            metrics: &self.metrics,
        };
        self.matcher
            .contains_cancellable(reader, cancel)
            .map_err(|e| SearchError::from_io(e, path))
    }
}

/// Forwards reads and adds the byte counts to the job metrics
struct CountingReader<'a, R> {
    inner: R,
    metrics: &'a ScanMetrics,
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.metrics.record_bytes_read(n as u64);
        Ok(n)
    }
}
