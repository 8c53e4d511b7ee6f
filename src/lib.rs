//! sqsearch - parallel consecutive-squares search
//!
//! Finds starting points `s` in `1..=N` such that
//! `s² + (s+1)² + ... + (s+k-1)²` is a perfect square.
//!
//! # Architecture
//!
//! - **Partitioner**: splits `[1, N]` into disjoint work units
//! - **Worker pool**: a bounded set of threads evaluating one unit at a time
//! - **Coordinator**: single-threaded message loop that counts completions,
//!   enforces a deadline and merges results into a sorted answer
//! - **Output**: console printer and metrics report
//!
//! # Example
//!
//! ```
//! use sqsearch::coordinator::{Coordinator, SearchJob};
//!
//! let outcome = Coordinator::new(SearchJob::new(40, 24)).run()?;
//! assert!(outcome.solutions.contains(&1));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod output;
pub mod partition;
pub mod predicate;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{Coordinator, RunOutcome, RunStatus, SearchJob};
pub use error::SearchError;

/// Result type used throughout sqsearch
pub type Result<T> = anyhow::Result<T>;
