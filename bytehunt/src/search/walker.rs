use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::cancel::Cancellation;
use crate::filters::{is_candidate, NamePattern};
use crate::metrics::ScanMetrics;

/// Pending work for one directory: candidates still to yield, then the
/// subdirectories still to descend into
#[derive(Debug)]
struct Frame {
    files: VecDeque<PathBuf>,
    subdirs: VecDeque<PathBuf>,
}

/// Lazy depth-first walk yielding candidate files.
///
/// Per directory, every name pattern is applied in order to the sorted entry
/// list, so a file matching two patterns is yielded twice. Subdirectories are
/// visited after all of the directory's own candidates. An explicit stack
/// replaces recursion; cancellation is checked before every item and before
/// every descent.
#[derive(Debug)]
pub struct TreeWalker {
    patterns: Vec<NamePattern>,
    recurse: bool,
    cancel: Cancellation,
    metrics: ScanMetrics,
    root: Option<PathBuf>,
    stack: Vec<Frame>,
}

impl TreeWalker {
    pub fn new(
        root: impl Into<PathBuf>,
        patterns: Vec<NamePattern>,
        recurse: bool,
        cancel: Cancellation,
        metrics: ScanMetrics,
    ) -> Self {
        Self {
            patterns,
            recurse,
            cancel,
            metrics,
            root: Some(root.into()),
            stack: Vec::new(),
        }
    }

    /// Enumerates `dir` once and pushes its frame. An unreadable directory
    /// is skipped without stopping the walk.
    fn enter(&mut self, dir: &Path) {
        let mut entries = match read_sorted(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping unreadable directory {}: {}", dir.display(), e);
                self.metrics.record_dir_skipped();
                return;
            }
        };
        self.metrics.record_dir_visited();

        let mut files = VecDeque::new();
        for pattern in &self.patterns {
            files.extend(
                entries
                    .iter()
                    .filter(|entry| pattern.matches_name(&entry.name))
                    .filter(|entry| is_candidate(&entry.path))
                    .map(|entry| entry.path.clone()),
            );
        }

        let subdirs = if self.recurse {
            entries
                .drain(..)
                .filter(|entry| entry.is_dir)
                .map(|entry| entry.path)
                .collect()
        } else {
            VecDeque::new()
        };

        self.stack.push(Frame { files, subdirs });
    }
}

impl Iterator for TreeWalker {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        if let Some(root) = self.root.take() {
            if self.cancel.is_cancelled() {
                return None;
            }
            self.enter(&root);
        }

        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            let frame = self.stack.last_mut()?;
            if let Some(file) = frame.files.pop_front() {
                return Some(file);
            }
            match frame.subdirs.pop_front() {
                Some(dir) => self.enter(&dir),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[derive(Debug)]
struct DirEntry {
    name: std::ffi::OsString,
    path: PathBuf,
    /// Real directory; symlinks to directories are not followed
    is_dir: bool,
}

fn read_sorted(dir: &Path) -> std::io::Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        entries.push(DirEntry {
            name: entry.file_name(),
            path: entry.path(),
            is_dir,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
