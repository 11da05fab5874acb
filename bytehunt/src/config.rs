use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::encoding::QueryEncoding;
use crate::errors::{SearchError, SearchResult};
use crate::filters::DEFAULT_NAME_PATTERN;
use crate::search::{SearchRequest, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};

/// Search defaults, read from YAML and overlaid with command-line values.
///
/// # Configuration Locations
///
/// Loaded in order of increasing precedence:
/// 1. Global `$CONFIG_DIR/bytehunt/config.yaml`
/// 2. Local `.bytehunt.yaml` in the current directory
/// 3. A file passed with `--config`
///
/// Nothing is ever written back.
///
/// # Configuration Format
///
/// ```yaml
/// # Directory to search
/// root_path: "/data"
///
/// # Descend into subdirectories
/// recurse_subdirs: true
///
/// # Name globs, applied in order to each directory's entries
/// name_patterns:
///   - "*.txt*"
///   - "*.log"
///
/// # Default text to look for
/// query: "NEEDLE"
///
/// # How the query becomes bytes (ascii, utf-8, utf-16le, utf-16be, latin1)
/// encoding: "utf-8"
///
/// # Bytes read per block, at most 64 MiB
/// block_size: 4096
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Root directory to start the search from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    #[serde(default = "default_recurse")]
    pub recurse_subdirs: bool,

    /// Directory-glob patterns matched against entry names
    #[serde(default = "default_name_patterns")]
    pub name_patterns: Vec<String>,

    /// Text to search for; usually supplied on the command line
    #[serde(default)]
    pub query: String,

    #[serde(default)]
    pub encoding: QueryEncoding,

    /// Bytes read from a file per block
    #[serde(default = "default_block_size")]
    pub block_size: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_recurse() -> bool {
    true
}

fn default_name_patterns() -> Vec<String> {
    vec![DEFAULT_NAME_PATTERN.to_string()]
}

fn default_block_size() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_BLOCK_SIZE).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            recurse_subdirs: default_recurse(),
            name_patterns: default_name_patterns(),
            query: String::new(),
            encoding: QueryEncoding::default(),
            block_size: default_block_size(),
            log_level: default_log_level(),
        }
    }
}

/// Command-line values; `None` leaves the file value in place
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_path: Option<PathBuf>,
    pub recurse_subdirs: Option<bool>,
    pub name_patterns: Option<Vec<String>>,
    pub query: Option<String>,
    pub encoding: Option<QueryEncoding>,
    pub block_size: Option<NonZeroUsize>,
    pub log_level: Option<String>,
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads the default locations plus `config_path`, which must exist
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("bytehunt/config.yaml")),
            Some(PathBuf::from(".bytehunt.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SearchError::config_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no search could run with
    pub fn validate(&self) -> SearchResult<()> {
        if self.block_size.get() > MAX_BLOCK_SIZE {
            return Err(SearchError::config_error(format!(
                "block_size {} exceeds the maximum of {}",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        Ok(())
    }

    /// Command-line values take precedence over configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(root_path) = cli.root_path {
            self.root_path = root_path;
        }
        if let Some(recurse) = cli.recurse_subdirs {
            self.recurse_subdirs = recurse;
        }
        if let Some(patterns) = cli.name_patterns.filter(|p| !p.is_empty()) {
            self.name_patterns = patterns;
        }
        if let Some(query) = cli.query {
            self.query = query;
        }
        if let Some(encoding) = cli.encoding {
            self.encoding = encoding;
        }
        if let Some(block_size) = cli.block_size {
            self.block_size = block_size;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    pub fn to_request(&self) -> SearchRequest {
        SearchRequest::new(
            &self.root_path,
            self.recurse_subdirs,
            self.name_patterns.clone(),
            &self.query,
            self.encoding,
        )
    }
}
