pub mod config;
pub mod encoding;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod results;
pub mod search;

pub use config::SearchConfig;
pub use encoding::QueryEncoding;
pub use errors::{SearchError, SearchResult};
pub use metrics::{ScanMetrics, ScanStats};
pub use results::{JobId, JobResult, MatchEvent, ScanOutcome, SearchEvent};
pub use search::{
    ByteMatcher, Cancellation, FileScanner, SearchJob, SearchRequest, TreeWalker,
    DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE,
};
