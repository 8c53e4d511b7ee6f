//! Coordinator module
//!
//! Partitions the search range, dispatches units to the worker pool, and
//! aggregates worker messages into a single [`RunOutcome`].
//!
//! The coordinator runs its message loop on the calling thread. It blocks in
//! exactly one place: waiting for the next worker message or the deadline,
//! whichever comes first.
//!
//! # Example
//!
//! ```
//! use sqsearch::coordinator::{Coordinator, RunStatus, SearchJob};
//!
//! let outcome = Coordinator::new(SearchJob::new(25, 2).with_unit_size(5)).run()?;
//! assert_eq!(outcome.status, RunStatus::Complete);
//! assert_eq!(outcome.solutions, vec![3, 20]);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod merge;
pub mod policy;
pub mod state;

use crate::config::Config;
use crate::error::SearchError;
use crate::partition::{default_unit_size, partition, verify_partition};
use crate::worker::pool::WorkerPool;
use crate::worker::{CandidateEvaluator, ComputeRequest, SquareSumEvaluator, WorkerMessage};
use crate::Result;
use chrono::{DateTime, Local};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError};
use policy::TimeoutPolicy;
use serde::Serialize;
use state::{CoordinatorState, Phase};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Parameters of one search run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchJob {
    /// Search upper bound (inclusive)
    pub n: u64,
    /// Run length
    pub k: u64,
    /// Candidates per unit; derived from `threads` when `None`
    pub unit_size: Option<u64>,
    /// Concurrency ceiling
    pub threads: usize,
    pub timeout: TimeoutPolicy,
}

impl SearchJob {
    /// Job with one thread per CPU and the default timeout policy
    pub fn new(n: u64, k: u64) -> Self {
        Self {
            n,
            k,
            unit_size: None,
            threads: num_cpus::get().max(1),
            timeout: TimeoutPolicy::default(),
        }
    }

    /// Build a job from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let n = config
            .search
            .n
            .ok_or_else(|| SearchError::invalid("missing N (search upper bound)"))?;
        let k = config
            .search
            .k
            .ok_or_else(|| SearchError::invalid("missing k (run length)"))?;

        let timeout = match config.runtime.timeout_duration()? {
            Some(d) => TimeoutPolicy::Fixed(d),
            None => TimeoutPolicy::default(),
        };

        Ok(Self {
            n,
            k,
            unit_size: config.workers.unit_size,
            threads: config.workers.effective_threads(),
            timeout,
        })
    }

    pub fn with_unit_size(mut self, unit_size: u64) -> Self {
        self.unit_size = Some(unit_size);
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_timeout(mut self, timeout: TimeoutPolicy) -> Self {
        self.timeout = timeout;
        self
    }

    /// Unit size actually used for partitioning
    pub fn effective_unit_size(&self) -> u64 {
        self.unit_size
            .unwrap_or_else(|| default_unit_size(self.n, self.threads))
    }

    fn validate(&self) -> std::result::Result<(), SearchError> {
        if self.n == 0 {
            return Err(SearchError::invalid("N must be at least 1"));
        }
        if self.k == 0 {
            return Err(SearchError::invalid("k must be at least 1"));
        }
        if self.threads == 0 {
            return Err(SearchError::invalid("threads must be at least 1"));
        }
        if self.unit_size == Some(0) {
            return Err(SearchError::invalid("unit size must be at least 1"));
        }
        Ok(())
    }
}

/// Final disposition of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every unit reported `Done`
    Complete,
    /// Deadline elapsed first; solutions are partial
    TimedOut,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Complete => write!(f, "complete"),
            RunStatus::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Monotonic start/end of a run, plus the wall-clock start for reports
#[derive(Debug, Clone, Copy)]
pub struct RunTiming {
    pub started: Instant,
    pub finished: Instant,
    pub started_at: DateTime<Local>,
}

impl RunTiming {
    pub fn elapsed(&self) -> Duration {
        self.finished.duration_since(self.started)
    }
}

/// Counters describing how a run was executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub n: u64,
    pub k: u64,
    pub unit_size: u64,
    pub units_expected: usize,
    pub units_completed: usize,
    pub worker_threads: usize,
    pub candidates_evaluated: u64,
    /// Deadline the run committed to
    pub deadline: Duration,
}

/// Terminal result of a search
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Matching starting points, ascending and unique
    pub solutions: Vec<u64>,
    pub timing: RunTiming,
    pub stats: RunStats,
    /// Faults isolated to individual units
    pub faults: Vec<SearchError>,
}

impl RunOutcome {
    /// Whether `solutions` may be missing matches
    pub fn is_partial(&self) -> bool {
        self.status == RunStatus::TimedOut || !self.faults.is_empty()
    }
}

/// Dispatches work units and aggregates worker results
pub struct Coordinator {
    job: SearchJob,
    evaluator: Arc<dyn CandidateEvaluator>,
}

impl Coordinator {
    pub fn new(job: SearchJob) -> Self {
        Self::with_evaluator(job, Arc::new(SquareSumEvaluator))
    }

    /// Coordinator using a custom per-candidate evaluator
    pub fn with_evaluator(job: SearchJob, evaluator: Arc<dyn CandidateEvaluator>) -> Self {
        Self { job, evaluator }
    }

    /// Run the search to a terminal outcome
    ///
    /// Consumes the coordinator, so each coordinator produces exactly one
    /// outcome.
    pub fn run(self) -> Result<RunOutcome> {
        self.job.validate()?;

        let started = Instant::now();
        let started_at = Local::now();
        let job = self.job;

        let unit_size = job.effective_unit_size();
        let units = partition(job.n, unit_size)?;
        debug_assert!(verify_partition(&units, job.n).is_ok());

        let expected = units.len();
        let threads = job.threads.min(expected);
        let deadline_after = job.timeout.deadline_for(job.n, expected);
        // A deadline past the end of the monotonic clock means no deadline
        let deadline = started.checked_add(deadline_after);
        if deadline.is_none() {
            debug!(deadline = ?deadline_after, "deadline beyond clock range, waiting for completion");
        }

        info!(
            n = job.n,
            k = job.k,
            unit_size,
            units = expected,
            threads,
            deadline = ?deadline_after,
            "starting search"
        );

        let pool = WorkerPool::new(threads, self.evaluator)?;
        let (reply_to, inbox) = unbounded::<WorkerMessage>();

        for (unit_id, unit) in units.into_iter().enumerate() {
            pool.submit(ComputeRequest {
                unit_id,
                unit,
                k: job.k,
                reply_to: reply_to.clone(),
            })?;
        }
        // Workers hold the only remaining senders: disconnect means they are all gone
        drop(reply_to);
        debug!(units = expected, "all units queued");

        let mut state = CoordinatorState::new(expected);
        await_units(&inbox, &mut state, deadline, deadline_after);

        let finished = Instant::now();
        let finalized = state.finalize();
        if finalized.cancelled_units > 0 {
            debug!(units = finalized.cancelled_units, "units reported cancelled");
        }

        let status = match finalized.phase {
            Phase::Complete => {
                pool.shutdown()?;
                RunStatus::Complete
            }
            _ => {
                pool.abandon();
                RunStatus::TimedOut
            }
        };

        Ok(RunOutcome {
            status,
            solutions: finalized.solutions,
            timing: RunTiming {
                started,
                finished,
                started_at,
            },
            stats: RunStats {
                n: job.n,
                k: job.k,
                unit_size,
                units_expected: expected,
                units_completed: finalized.units_completed,
                worker_threads: threads,
                candidates_evaluated: finalized.candidates_evaluated,
                deadline: deadline_after,
            },
            faults: finalized.faults,
        })
    }
}

/// Fold worker messages into `state` until it reaches a terminal phase
///
/// Both an elapsed deadline and a disconnected inbox end the wait as
/// `TimedOut`.
fn await_units(
    inbox: &Receiver<WorkerMessage>,
    state: &mut CoordinatorState,
    deadline: Option<Instant>,
    deadline_after: Duration,
) {
    while !state.phase().is_terminal() {
        let received = match deadline {
            Some(deadline) => inbox.recv_deadline(deadline),
            None => inbox.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(WorkerMessage::Result(report)) => {
                if let Some(fault) = report.status.fault() {
                    warn!(unit_id = report.unit_id, error = %fault, "unit reported a fault");
                }
                state.on_result(report);
            }
            Ok(WorkerMessage::Done { unit_id, worker_id }) => {
                let phase = state.on_done(unit_id);
                debug!(
                    unit_id,
                    worker_id,
                    completed = state.completed(),
                    expected = state.expected(),
                    "unit done"
                );
                if phase == Phase::Complete {
                    info!(units = state.expected(), "all units complete");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    completed = state.completed(),
                    expected = state.expected(),
                    deadline = ?deadline_after,
                    "deadline elapsed, returning partial result"
                );
                state.on_deadline();
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(
                    completed = state.completed(),
                    expected = state.expected(),
                    "all workers exited before completing, returning partial result"
                );
                state.on_deadline();
            }
        }
    }
}
