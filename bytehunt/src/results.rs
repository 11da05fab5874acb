/// Notifications emitted by a search job.
///
/// A job produces zero or more [`MatchEvent`]s followed by exactly one
/// [`JobResult`]. Both carry the `job_id` handed out at submission so that an
/// observer shared between consecutive jobs can tell them apart.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::metrics::ScanStats;

/// Identifier of one submission, unique per `SearchJob` instance
pub type JobId = u64;

/// One file whose contents contain the needle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub job_id: JobId,
    pub path: PathBuf,
}

/// The terminal notification of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: JobId,
    /// False when the request failed validation or the scan aborted
    pub succeeded: bool,
    /// Human-readable reason; empty on success
    pub error_message: String,
    /// The walk stopped early because cancellation was requested
    pub cancelled: bool,
    pub stats: ScanStats,
}

impl JobResult {
    pub fn completed(job_id: JobId, stats: ScanStats) -> Self {
        Self {
            job_id,
            succeeded: true,
            error_message: String::new(),
            cancelled: false,
            stats,
        }
    }

    /// Cancellation is a successful outcome, only flagged as such
    pub fn cancelled(job_id: JobId, stats: ScanStats) -> Self {
        Self {
            cancelled: true,
            ..Self::completed(job_id, stats)
        }
    }

    pub fn failed(job_id: JobId, message: impl Into<String>) -> Self {
        Self {
            job_id,
            succeeded: false,
            error_message: message.into(),
            cancelled: false,
            stats: ScanStats::default(),
        }
    }
}

/// Either notification, as delivered through `SearchJob::subscribe`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SearchEvent {
    Match(MatchEvent),
    Finished(JobResult),
}

impl SearchEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Match(event) => event.job_id,
            Self::Finished(result) => result.job_id,
        }
    }
}

/// Everything one job reported, gathered from a subscription channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub matches: Vec<PathBuf>,
    pub result: JobResult,
}

impl ScanOutcome {
    /// Drains events of the job named by the first event received, up to
    /// and including its `Finished`. Events of other jobs are discarded.
    /// Returns `None` if the channel closes or `timeout` passes first.
    pub fn collect(events: &Receiver<SearchEvent>, timeout: Duration) -> Option<Self> {
        Self::gather(events, None, timeout)
    }

    /// Like [`collect`](Self::collect) for a known job
    pub fn collect_job(
        events: &Receiver<SearchEvent>,
        job_id: JobId,
        timeout: Duration,
    ) -> Option<Self> {
        Self::gather(events, Some(job_id), timeout)
    }

    fn gather(
        events: &Receiver<SearchEvent>,
        mut job_id: Option<JobId>,
        timeout: Duration,
    ) -> Option<Self> {
        let deadline = Instant::now() + timeout;
        let mut matches = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = match events.recv_timeout(remaining) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            };
            let id = event.job_id();
            if *job_id.get_or_insert(id) != id {
                continue;
            }
            match event {
                SearchEvent::Match(event) => matches.push(event.path),
                SearchEvent::Finished(result) => return Some(Self { matches, result }),
            }
        }
    }
}
