/// Name pattern matching and the candidate filter used by the tree walker.
///
/// Enumeration and filtering are kept apart on purpose: a name pattern such
/// as `*.txt*` may select directories as well as files, and only
/// [`is_candidate`] decides whether an entry is scanned.
use glob::{MatchOptions, Pattern};
use std::ffi::OsStr;
use std::path::Path;

use crate::errors::{SearchError, SearchResult};

/// The pattern the original search form used for its text-only mode
pub const DEFAULT_NAME_PATTERN: &str = "*.txt*";

/// A compiled directory-glob matched against entry names only
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    pattern: Pattern,
}

impl NamePattern {
    pub fn new(source: &str) -> SearchResult<Self> {
        let pattern = Pattern::new(source)
            .map_err(|e| SearchError::invalid_name_pattern(source, e.msg))?;
        Ok(Self {
            source: source.to_string(),
            pattern,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Checks a single file name (never a full path)
    pub fn matches_name(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        self.pattern.matches_with(&name, name_match_options())
    }
}

/// Platform-native name matching: case-insensitive on Windows only.
/// Wildcards never cross a separator and leading dots are not special.
fn name_match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: !cfg!(windows),
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// Compiles every pattern, failing on the first invalid one
pub fn compile_name_patterns(patterns: &[String]) -> SearchResult<Vec<NamePattern>> {
    patterns.iter().map(|p| NamePattern::new(p)).collect()
}

/// Whether an enumerated entry is scanned: it must resolve to a regular file.
/// Symlinks are followed; broken links and directories are rejected.
pub fn is_candidate(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}
