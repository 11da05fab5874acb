//! The scanning engine.
//!
//! Leaves first:
//!
//! - [`matcher::ByteMatcher`] decides whether a needle occurs in a byte
//!   stream, reading it in bounded blocks and carrying `needle.len() - 1`
//!   bytes across block boundaries.
//! - [`processor::FileScanner`] runs the matcher over one file and turns
//!   I/O failures into "no match".
//! - [`walker::TreeWalker`] lazily yields candidate files depth-first.
//! - [`engine::SearchJob`] runs walker and scanner on a background thread,
//!   one search at a time, and notifies observers.
//!
//! ```rust,ignore
//! let job = SearchJob::new();
//! let events = job.subscribe();
//! job.submit(SearchRequest::text_files("/data", "NEEDLE"));
//! while let Ok(event) = events.recv() {
//!     match event {
//!         SearchEvent::Match(m) => println!("{}", m.path.display()),
//!         SearchEvent::Finished(_) => break,
//!     }
//! }
//! ```
pub mod cancel;
pub mod engine;
pub mod matcher;
pub mod processor;
pub mod request;
pub mod walker;

pub use cancel::Cancellation;
pub use engine::SearchJob;
pub use matcher::{ByteMatcher, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};
pub use processor::FileScanner;
pub use request::SearchRequest;
pub use walker::TreeWalker;
