use std::path::{Path, PathBuf};

use crate::encoding::QueryEncoding;
use crate::errors::{SearchError, SearchResult};
use crate::filters::{compile_name_patterns, NamePattern, DEFAULT_NAME_PATTERN};

/// One search, fixed at construction and owned by the job that runs it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    root_dir: PathBuf,
    recurse_subdirs: bool,
    name_patterns: Vec<String>,
    needle: Vec<u8>,
    encoding: QueryEncoding,
}

impl SearchRequest {
    /// Builds a request, encoding `query` into the needle once. An empty
    /// query is accepted here and rejected when the request is submitted.
    pub fn new(
        root_dir: impl Into<PathBuf>,
        recurse_subdirs: bool,
        name_patterns: Vec<String>,
        query: &str,
        encoding: QueryEncoding,
    ) -> Self {
        Self {
            root_dir: root_dir.into(),
            recurse_subdirs,
            name_patterns,
            needle: encoding.encode(query),
            encoding,
        }
    }

    /// Recursive ASCII search of `*.txt*` files, as the original form did
    pub fn text_files(root_dir: impl Into<PathBuf>, query: &str) -> Self {
        Self::new(
            root_dir,
            true,
            vec![DEFAULT_NAME_PATTERN.to_string()],
            query,
            QueryEncoding::Ascii,
        )
    }

    /// Splits a `;`-separated pattern list, trimming items and dropping
    /// empty ones: `"*.txt; *.log;"` gives `["*.txt", "*.log"]`
    pub fn parse_name_patterns(list: &str) -> Vec<String> {
        list.split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn recurse_subdirs(&self) -> bool {
        self.recurse_subdirs
    }

    pub fn name_patterns(&self) -> &[String] {
        &self.name_patterns
    }

    pub fn needle(&self) -> &[u8] {
        &self.needle
    }

    pub fn encoding(&self) -> QueryEncoding {
        self.encoding
    }

    /// Pre-flight checks, in the order the user sees them reported: the root
    /// directory first, then the query, then the name patterns
    pub fn validate(&self) -> SearchResult<Vec<NamePattern>> {
        if self.root_dir.as_os_str().is_empty() {
            return Err(SearchError::root_not_found(&self.root_dir));
        }
        match self.root_dir.metadata() {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(SearchError::root_not_directory(&self.root_dir)),
            Err(_) => return Err(SearchError::root_not_found(&self.root_dir)),
        }
        if self.needle.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        compile_name_patterns(&self.name_patterns)
    }
}
