use anyhow::Result;
use bytehunt::{
    JobResult, QueryEncoding, ScanOutcome, SearchEvent, SearchJob, SearchRequest,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

const WAIT: Duration = Duration::from_secs(10);

// Helper function to create test files
fn create_test_files(dir: impl AsRef<Path>, files: &[(&str, &str)]) -> Result<()> {
    for (name, content) in files {
        let path = dir.as_ref().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(())
}

fn run(job: &SearchJob, request: SearchRequest) -> Result<ScanOutcome> {
    let events = job.subscribe();
    job.submit(request);
    let outcome = ScanOutcome::collect(&events, WAIT)
        .ok_or_else(|| anyhow::anyhow!("search did not finish"))?;
    job.join();
    Ok(outcome)
}

/// Blocks the background thread inside the first match callback until the
/// test opens the gate
fn gate_first_match(job: &SearchJob) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (open_tx, open_rx) = mpsc::channel::<()>();
    let entered_tx = Mutex::new(entered_tx);
    let open_rx = Mutex::new(open_rx);
    let seen = AtomicUsize::new(0);
    job.on_match(move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            let _ = entered_tx.lock().unwrap().send(());
            let _ = open_rx.lock().unwrap().recv();
        }
    });
    (entered_rx, open_tx)
}

#[test]
fn test_scenario_depth_first_matches() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        &dir,
        &[
            ("a.txt", "xxNEEDLExx"),
            ("b.txt", "no match here"),
            ("sub/c.txt", "NEEDLE"),
        ],
    )?;

    let outcome = run(&SearchJob::new(), SearchRequest::text_files(dir.path(), "NEEDLE"))?;

    assert_eq!(
        outcome.matches,
        vec![dir.path().join("a.txt"), dir.path().join("sub").join("c.txt")]
    );
    assert!(outcome.result.succeeded);
    assert!(outcome.result.error_message.is_empty());
    assert_eq!(outcome.result.stats.files_scanned, 3);
    assert_eq!(outcome.result.stats.files_matched, 2);
    Ok(())
}

#[test]
fn test_empty_query_fails_without_matches() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, &[("a.txt", "anything")])?;

    let job = SearchJob::new();
    let events = job.subscribe();
    assert!(!job.submit(SearchRequest::text_files(dir.path(), "")));

    let outcome = ScanOutcome::collect(&events, WAIT).expect("failed result");
    assert!(outcome.matches.is_empty());
    assert!(!outcome.result.succeeded);
    assert!(outcome.result.error_message.contains("can not be empty"));
    assert!(!job.is_running());
    Ok(())
}

#[test]
fn test_missing_root_names_directory() -> Result<()> {
    let dir = tempdir()?;
    let missing = dir.path().join("data");

    let job = SearchJob::new();
    let events = job.subscribe();
    assert!(!job.submit(SearchRequest::text_files(&missing, "NEEDLE")));

    let outcome = ScanOutcome::collect(&events, WAIT).expect("failed result");
    assert!(outcome.matches.is_empty());
    assert!(!outcome.result.succeeded);
    assert!(outcome
        .result
        .error_message
        .contains(&missing.display().to_string()));
    assert!(outcome.result.error_message.contains("does not exist"));
    Ok(())
}

#[test]
fn test_same_request_twice_gives_same_order() -> Result<()> {
    let dir = tempdir()?;
    let mut files = Vec::new();
    for i in 0..20 {
        files.push((format!("d{}/f{}.txt", i % 4, i), format!("line {} NEEDLE", i)));
        files.push((format!("d{}/g{}.txt", i % 3, i), "plain".to_string()));
    }
    let borrowed: Vec<(&str, &str)> = files.iter().map(|(n, c)| (n.as_str(), c.as_str())).collect();
    create_test_files(&dir, &borrowed)?;

    let job = SearchJob::new();
    let first = run(&job, SearchRequest::text_files(dir.path(), "NEEDLE"))?;
    let second = run(&job, SearchRequest::text_files(dir.path(), "NEEDLE"))?;

    assert_eq!(first.matches.len(), 20);
    assert_eq!(first.matches, second.matches);
    Ok(())
}

#[test]
fn test_submit_while_running_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, &[("a.txt", "NEEDLE"), ("b.txt", "NEEDLE")])?;

    let job = SearchJob::new();
    let (entered, open) = gate_first_match(&job);
    let events = job.subscribe();

    assert!(job.submit(SearchRequest::text_files(dir.path(), "NEEDLE")));
    entered.recv_timeout(WAIT)?;
    assert!(job.is_running());

    // Neither a valid nor an invalid request may start or emit anything
    assert!(!job.submit(SearchRequest::text_files(dir.path(), "NEEDLE")));
    assert!(!job.submit(SearchRequest::text_files(dir.path(), "")));
    open.send(())?;

    let outcome = ScanOutcome::collect(&events, WAIT).expect("job finished");
    assert_eq!(outcome.matches.len(), 2);
    assert!(outcome.result.succeeded);
    job.join();
    assert!(events.try_recv().is_err());
    Ok(())
}

#[test]
fn test_cancel_while_running_ends_successfully() -> Result<()> {
    let dir = tempdir()?;
    let names: Vec<String> = (0..50).map(|i| format!("f{:02}.txt", i)).collect();
    let files: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "NEEDLE")).collect();
    create_test_files(&dir, &files)?;

    let job = SearchJob::new();
    let (entered, open) = gate_first_match(&job);
    let events = job.subscribe();

    assert!(job.submit(SearchRequest::text_files(dir.path(), "NEEDLE")));
    entered.recv_timeout(WAIT)?;
    job.request_cancel();
    open.send(())?;

    let outcome = ScanOutcome::collect(&events, WAIT).expect("job finished");
    assert!(outcome.result.succeeded);
    assert!(outcome.result.cancelled);
    // The gated match is delivered, nothing after it
    assert_eq!(outcome.matches, vec![dir.path().join("f00.txt")]);
    job.join();
    assert!(!job.is_running());
    Ok(())
}

#[test]
fn test_cancel_then_resubmit_runs_to_completion() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, &[("a.txt", "NEEDLE"), ("b.txt", "NEEDLE")])?;

    let job = SearchJob::new();
    let (entered, open) = gate_first_match(&job);
    let events = job.subscribe();

    assert!(job.submit(SearchRequest::text_files(dir.path(), "NEEDLE")));
    entered.recv_timeout(WAIT)?;
    job.request_cancel();
    open.send(())?;
    let cancelled = ScanOutcome::collect(&events, WAIT).expect("first job");
    assert!(cancelled.result.cancelled);
    job.join();

    assert!(job.submit(SearchRequest::text_files(dir.path(), "NEEDLE")));
    let complete = ScanOutcome::collect(&events, WAIT).expect("second job");
    assert!(!complete.result.cancelled);
    assert_eq!(complete.matches.len(), 2);
    Ok(())
}

#[test]
fn test_callbacks_and_channels_see_the_same_events() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, &[("a.txt", "NEEDLE"), ("x/b.txt", "NEEDLE")])?;

    let job = SearchJob::new();
    let seen: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
    let finished: Arc<Mutex<Vec<JobResult>>> = Arc::default();
    {
        let seen = Arc::clone(&seen);
        job.on_match(move |event| seen.lock().unwrap().push(event.path.clone()));
        let finished = Arc::clone(&finished);
        job.on_finished(move |result| finished.lock().unwrap().push(result.clone()));
    }

    let outcome = run(&job, SearchRequest::text_files(dir.path(), "NEEDLE"))?;
    assert_eq!(*seen.lock().unwrap(), outcome.matches);
    assert_eq!(finished.lock().unwrap().len(), 1);
    assert_eq!(finished.lock().unwrap()[0], outcome.result);
    Ok(())
}

#[test]
fn test_events_arrive_in_order_with_single_terminal() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, &[("a.txt", "NEEDLE"), ("b.txt", "NEEDLE")])?;

    let job = SearchJob::new();
    let events = job.subscribe();
    assert!(job.submit(SearchRequest::text_files(dir.path(), "NEEDLE")));
    job.join();

    let received: Vec<SearchEvent> = events.try_iter().collect();
    assert_eq!(received.len(), 3);
    assert!(matches!(received[0], SearchEvent::Match(_)));
    assert!(matches!(received[1], SearchEvent::Match(_)));
    assert!(matches!(received[2], SearchEvent::Finished(_)));
    Ok(())
}

#[test]
fn test_independent_jobs_run_concurrently() -> Result<()> {
    let first_dir = tempdir()?;
    let second_dir = tempdir()?;
    create_test_files(&first_dir, &[("a.txt", "ALPHA")])?;
    create_test_files(&second_dir, &[("b.txt", "BETA")])?;

    let first = SearchJob::new();
    let second = SearchJob::new();
    let first_events = first.subscribe();
    let second_events = second.subscribe();

    assert!(first.submit(SearchRequest::text_files(first_dir.path(), "ALPHA")));
    assert!(second.submit(SearchRequest::text_files(second_dir.path(), "BETA")));

    let a = ScanOutcome::collect(&first_events, WAIT).expect("first job");
    let b = ScanOutcome::collect(&second_events, WAIT).expect("second job");
    assert_eq!(a.matches, vec![first_dir.path().join("a.txt")]);
    assert_eq!(b.matches, vec![second_dir.path().join("b.txt")]);
    Ok(())
}

#[test]
fn test_non_recursive_multi_pattern_request() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        &dir,
        &[
            ("a.log", "NEEDLE"),
            ("b.txt", "NEEDLE"),
            ("c.md", "NEEDLE"),
            ("sub/d.log", "NEEDLE"),
        ],
    )?;

    let request = SearchRequest::new(
        dir.path(),
        false,
        SearchRequest::parse_name_patterns("*.log; *.txt"),
        "NEEDLE",
        QueryEncoding::Ascii,
    );
    let outcome = run(&SearchJob::new(), request)?;
    assert_eq!(
        outcome.matches,
        vec![dir.path().join("a.log"), dir.path().join("b.txt")]
    );
    Ok(())
}

#[test]
fn test_utf16_query_matches_raw_bytes() -> Result<()> {
    let dir = tempdir()?;
    let mut utf16: Vec<u8> = vec![0xFF, 0xFE];
    utf16.extend("some NEEDLE text".encode_utf16().flat_map(u16::to_le_bytes));
    fs::write(dir.path().join("wide.txt"), &utf16)?;
    fs::write(dir.path().join("narrow.txt"), "some NEEDLE text")?;

    let request = SearchRequest::new(
        dir.path(),
        true,
        vec!["*.txt".to_string()],
        "NEEDLE",
        QueryEncoding::Utf16Le,
    );
    let outcome = run(&SearchJob::new(), request)?;
    assert_eq!(outcome.matches, vec![dir.path().join("wide.txt")]);
    Ok(())
}

#[test]
fn test_small_blocks_find_boundary_matches() -> Result<()> {
    let dir = tempdir()?;
    let mut content = vec![b'x'; 8 * 37 + 3];
    content.extend_from_slice(b"NEEDLE");
    content.extend_from_slice(&[b'x'; 5]);
    fs::write(dir.path().join("big.txt"), &content)?;

    let outcome = run(
        &SearchJob::with_block_size(8),
        SearchRequest::text_files(dir.path(), "NEEDLE"),
    )?;
    assert_eq!(outcome.matches, vec![dir.path().join("big.txt")]);
    assert!(outcome.result.stats.bytes_read <= content.len() as u64);
    Ok(())
}
