use anyhow::{Context, Result};
use bytehunt::{
    config::CliOverrides, JobResult, MatchEvent, QueryEncoding, SearchConfig, SearchEvent,
    SearchJob, SearchRequest,
};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(author, version, about = "Find files containing a literal byte sequence", long_about = None)]
struct Cli {
    /// Text to search for, encoded with --encoding
    query: Option<String>,

    /// Root directory to search in
    #[arg(short = 'd', long)]
    root: Option<PathBuf>,

    /// Only search the root directory itself
    #[arg(long)]
    no_recurse: bool,

    /// File name glob (repeatable; ';' separates several in one value)
    #[arg(short = 'n', long = "name")]
    names: Vec<String>,

    /// How the query becomes bytes (ascii|utf-8|utf-16le|utf-16be|latin1)
    #[arg(short = 'e', long)]
    encoding: Option<QueryEncoding>,

    /// Bytes read from each file per block
    #[arg(long)]
    block_size: Option<NonZeroUsize>,

    /// Configuration file (YAML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Print one JSON object per event instead of plain paths
    #[arg(long)]
    json: bool,

    /// No spinner and no summary
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let names: Vec<String> = self
            .names
            .iter()
            .flat_map(|n| SearchRequest::parse_name_patterns(n))
            .collect();
        CliOverrides {
            root_path: self.root.clone(),
            recurse_subdirs: self.no_recurse.then_some(false),
            name_patterns: (!names.is_empty()).then_some(names),
            query: self.query.clone(),
            encoding: self.encoding,
            block_size: self.block_size,
            log_level: self.log_level.clone(),
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = SearchConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?
        .merge_with_cli(cli.overrides());
    config.validate()?;
    init_tracing(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupted))
        .context("failed to install Ctrl-C handler")?;

    let job = SearchJob::with_block_size(config.block_size.get());
    let events = job.subscribe();
    let started = Instant::now();
    job.submit(config.to_request());

    let spinner = if cli.quiet || cli.json {
        ProgressBar::hidden()
    } else {
        new_spinner(&config)
    };

    let mut matched = 0usize;
    let result = loop {
        if interrupted.swap(false, Ordering::Relaxed) {
            spinner.set_message("stopping...");
            job.request_cancel();
        }
        match events.recv_timeout(POLL_INTERVAL) {
            Ok(SearchEvent::Match(event)) => {
                matched += 1;
                spinner.suspend(|| print_match(&event, cli.json));
                spinner.set_message(format!("{} matching files", matched));
            }
            Ok(SearchEvent::Finished(result)) => break result,
            Err(RecvTimeoutError::Timeout) => spinner.tick(),
            Err(RecvTimeoutError::Disconnected) => {
                anyhow::bail!("search ended without a result")
            }
        }
    };
    spinner.finish_and_clear();
    job.join();

    print_result(&result, started.elapsed(), &cli);

    Ok(if !result.succeeded {
        ExitCode::from(2)
    } else if matched > 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn new_spinner(config: &SearchConfig) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} [{elapsed}] {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("searching {}", config.root_path.display()));
    spinner
}

fn print_match(event: &MatchEvent, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(&SearchEvent::Match(event.clone())) {
            println!("{}", line);
        }
    } else {
        println!("{}", event.path.display().to_string().blue());
    }
}

fn print_result(result: &JobResult, elapsed: Duration, cli: &Cli) {
    if cli.json {
        if let Ok(line) = serde_json::to_string(&SearchEvent::Finished(result.clone())) {
            println!("{}", line);
        }
        return;
    }

    if !result.succeeded {
        eprintln!("{} {}", "error:".red().bold(), result.error_message);
        return;
    }
    if cli.quiet {
        return;
    }

    // Millisecond precision is plenty for a summary line
    let elapsed = Duration::from_millis(elapsed.as_millis() as u64);
    let stats = &result.stats;
    let status = if result.cancelled {
        "Search cancelled".yellow()
    } else {
        "Search complete".green()
    };
    eprintln!(
        "\n{}: {} of {} files matched in {} ({} directories, {} unreadable files skipped)",
        status,
        stats.files_matched,
        stats.files_scanned,
        humantime::format_duration(elapsed),
        stats.dirs_visited,
        stats.files_unreadable
    );
}
