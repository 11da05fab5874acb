use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use super::cancel::Cancellation;
use super::matcher::{ByteMatcher, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};
use super::processor::FileScanner;
use super::request::SearchRequest;
use super::walker::TreeWalker;
use crate::errors::{SearchError, SearchResult};
use crate::filters::NamePattern;
use crate::metrics::ScanMetrics;
use crate::results::{JobId, JobResult, MatchEvent, SearchEvent};

type MatchObserver = Arc<dyn Fn(&MatchEvent) + Send + Sync>;
type FinishedObserver = Arc<dyn Fn(&JobResult) + Send + Sync>;

#[derive(Default)]
struct Observers {
    on_match: RwLock<Vec<MatchObserver>>,
    on_finished: RwLock<Vec<FinishedObserver>>,
}

impl Observers {
    // Callbacks run on a snapshot, outside the lock, so an observer may
    // register more observers without deadlocking.
    fn emit_match(&self, event: &MatchEvent) {
        let observers = self
            .on_match
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in &observers {
            observer(event);
        }
    }

    fn emit_finished(&self, result: &JobResult) {
        let observers = self
            .on_finished
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in &observers {
            observer(result);
        }
    }
}

/// State shared between the submitting side and the background thread
#[derive(Default)]
struct Shared {
    running: AtomicBool,
    cancel: Cancellation,
    next_job_id: AtomicU64,
    observers: Observers,
}

impl Shared {
    fn next_job_id(&self) -> JobId {
        self.next_job_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Marks the job Idle when the background thread exits, even by panic
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs one search at a time on a background thread.
///
/// A job is Idle or Running. [`submit`](Self::submit) starts a search only
/// when Idle; observers registered with [`on_match`](Self::on_match) and
/// [`on_finished`](Self::on_finished) (or a [`subscribe`](Self::subscribe)
/// channel) receive a `MatchEvent` per matching file, in walk order, and
/// then exactly one `JobResult`. Observers run on the background thread;
/// moving results onto a UI thread is the caller's business.
///
/// Instances are independent of each other. Dropping a `SearchJob` requests
/// cancellation of its running search.
pub struct SearchJob {
    shared: Arc<Shared>,
    block_size: usize,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SearchJob {
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    /// Block size used by the byte matcher, clamped to `1..=MAX_BLOCK_SIZE`
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            block_size: block_size.clamp(1, MAX_BLOCK_SIZE),
            handle: Mutex::new(None),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn on_match<F>(&self, observer: F)
    where
        F: Fn(&MatchEvent) + Send + Sync + 'static,
    {
        self.shared
            .observers
            .on_match
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    pub fn on_finished<F>(&self, observer: F)
    where
        F: Fn(&JobResult) + Send + Sync + 'static,
    {
        self.shared
            .observers
            .on_finished
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    /// Registers a channel receiving every event of every later job.
    /// Events are dropped silently once the receiver is gone.
    pub fn subscribe(&self) -> Receiver<SearchEvent> {
        let (tx, rx) = mpsc::channel();
        let tx = Arc::new(Mutex::new(tx));

        let match_tx = Arc::clone(&tx);
        self.on_match(move |event| {
            let tx = match_tx.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = tx.send(SearchEvent::Match(event.clone()));
        });
        self.on_finished(move |result| {
            let tx = tx.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = tx.send(SearchEvent::Finished(result.clone()));
        });
        rx
    }

    /// Starts `request` if no search is running.
    ///
    /// Returns false when busy (nothing is emitted) and when the request is
    /// invalid (a failed `JobResult` is emitted on the calling thread first).
    pub fn submit(&self, request: SearchRequest) -> bool {
        self.try_submit(request).is_ok()
    }

    /// Like [`submit`](Self::submit), reporting why a request did not start
    pub fn try_submit(&self, request: SearchRequest) -> SearchResult<JobId> {
        // Running is claimed before validation; a rejected request never
        // reports while another search is running.
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Rejecting submission, a search is already running");
            return Err(SearchError::JobBusy);
        }

        let validated = request.validate().and_then(|patterns| {
            ByteMatcher::new(request.needle(), self.block_size)
                .map(|matcher| (patterns, matcher))
                .ok_or(SearchError::EmptyQuery)
        });
        let (patterns, matcher) = match validated {
            Ok(parts) => parts,
            Err(e) => {
                let job_id = self.shared.next_job_id();
                warn!("Search job {} rejected: {}", job_id, e);
                self.shared.running.store(false, Ordering::Release);
                self.shared
                    .observers
                    .emit_finished(&JobResult::failed(job_id, e.to_string()));
                return Err(e);
            }
        };

        self.shared.cancel.reset();

        let job_id = self.shared.next_job_id();
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("bytehunt-job-{}", job_id))
            .spawn(move || run_job(&shared, job_id, request, patterns, matcher));

        match spawned {
            Ok(handle) => {
                *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                Ok(job_id)
            }
            Err(e) => {
                error!("Failed to start search thread: {}", e);
                self.shared.running.store(false, Ordering::Release);
                Err(SearchError::IoError(e))
            }
        }
    }

    /// Asks the running search to stop at its next checkpoint. Never blocks;
    /// does nothing when Idle.
    pub fn request_cancel(&self) {
        if self.is_running() {
            debug!("Cancellation requested");
            self.shared.cancel.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Waits for the most recent background thread to exit. Must not be
    /// called from inside an observer.
    pub fn join(&self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Search thread panicked");
            }
        }
    }
}

impl Default for SearchJob {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SearchJob {
    fn drop(&mut self) {
        self.request_cancel();
    }
}

fn run_job(
    shared: &Shared,
    job_id: JobId,
    request: SearchRequest,
    patterns: Vec<NamePattern>,
    matcher: ByteMatcher,
) {
    let guard = RunningGuard(&shared.running);
    info!(
        "Starting search job {} in {} for {} byte needle ({})",
        job_id,
        request.root_dir().display(),
        request.needle().len(),
        request.encoding()
    );

    let metrics = ScanMetrics::new();
    let scanner = FileScanner::new(matcher, metrics.clone());
    let walker = TreeWalker::new(
        request.root_dir(),
        patterns,
        request.recurse_subdirs(),
        shared.cancel.clone(),
        metrics.clone(),
    );

    // A panic in the walk or in a match observer still ends the job with
    // a JobResult.
    let scan = panic::catch_unwind(AssertUnwindSafe(|| {
        for path in walker {
            if scanner.file_matches(&path, &shared.cancel) {
                shared
                    .observers
                    .emit_match(&MatchEvent { job_id, path });
            }
        }
    }));

    metrics.log_stats();
    let stats = metrics.get_stats();
    let result = match scan {
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!("Search job {} aborted: {}", job_id, reason);
            JobResult {
                stats,
                ..JobResult::failed(job_id, format!("Search aborted: {}", reason))
            }
        }
        Ok(()) if shared.cancel.is_cancelled() => {
            info!("Search job {} cancelled", job_id);
            JobResult::cancelled(job_id, stats)
        }
        Ok(()) => {
            info!(
                "Search job {} complete. Found {} matching files",
                job_id, stats.files_matched
            );
            JobResult::completed(job_id, stats)
        }
    };

    // Idle first, so an observer may submit the next search from its
    // finished callback.
    drop(guard);
    shared.observers.emit_finished(&result);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
