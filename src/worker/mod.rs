//! Worker implementation
//!
//! A worker evaluates the predicate for every candidate of one [`WorkUnit`]
//! and reports back to the coordinator with exactly two messages: a
//! [`WorkerMessage::Result`] carrying the matches, then a
//! [`WorkerMessage::Done`] marker.
//!
//! # Fault isolation
//!
//! A failing candidate (arithmetic overflow, or a panic inside the evaluator)
//! ends the unit early. The report still carries every match found before the
//! fault, tagged [`UnitStatus::Partial`], and the `Done` marker is still sent.
//! Sibling workers and the coordinator are unaffected.
//!
//! # Example
//!
//! ```
//! use sqsearch::partition::WorkUnit;
//! use sqsearch::worker::{ComputeRequest, Worker, WorkerMessage};
//! use crossbeam::channel::unbounded;
//!
//! let (tx, rx) = unbounded();
//! let worker = Worker::with_default_evaluator(0);
//! worker.run(ComputeRequest {
//!     unit_id: 0,
//!     unit: WorkUnit::new(1, 25),
//!     k: 2,
//!     reply_to: tx,
//! });
//!
//! match rx.recv().unwrap() {
//!     WorkerMessage::Result(report) => assert_eq!(report.solutions, vec![3, 20]),
//!     other => panic!("unexpected message: {:?}", other),
//! }
//! assert!(matches!(rx.recv().unwrap(), WorkerMessage::Done { unit_id: 0, .. }));
//! ```

pub mod pool;

use crate::error::SearchError;
use crate::partition::WorkUnit;
use crate::predicate::{is_perfect_square, sum_of_squares};
use crossbeam::channel::Sender;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Candidates evaluated between two checks of the cancellation flag
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Per-candidate test applied by workers
///
/// The production implementation is [`SquareSumEvaluator`]. The trait is the
/// seam that lets tests drive the coordinator with slow or faulty evaluators.
pub trait CandidateEvaluator: Send + Sync {
    /// Whether candidate `s` is a solution for run length `k`
    fn evaluate(&self, s: u64, k: u64) -> Result<bool, SearchError>;
}

/// Tests whether `s² + (s+1)² + ... + (s+k-1)²` is a perfect square
#[derive(Debug, Clone, Copy, Default)]
pub struct SquareSumEvaluator;

impl CandidateEvaluator for SquareSumEvaluator {
    #[inline]
    fn evaluate(&self, s: u64, k: u64) -> Result<bool, SearchError> {
        Ok(is_perfect_square(sum_of_squares(s, k)?))
    }
}

/// Work dispatched to a worker; consumed exactly once
#[derive(Debug)]
pub struct ComputeRequest {
    /// Index of the unit in the partition
    pub unit_id: usize,
    pub unit: WorkUnit,
    /// Run length
    pub k: u64,
    /// Coordinator inbox
    pub reply_to: Sender<WorkerMessage>,
}

/// How far a worker got through its unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// Every candidate was evaluated
    Complete,
    /// A candidate failed after some candidates were evaluated
    Partial(SearchError),
    /// The first candidate already failed
    Failed(SearchError),
    /// The run was cancelled before the unit finished
    Cancelled,
}

impl UnitStatus {
    /// The fault behind a `Partial` or `Failed` unit
    pub fn fault(&self) -> Option<&SearchError> {
        match self {
            UnitStatus::Partial(err) | UnitStatus::Failed(err) => Some(err),
            UnitStatus::Complete | UnitStatus::Cancelled => None,
        }
    }
}

/// Matches found in one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub unit_id: usize,
    pub worker_id: usize,
    pub unit: WorkUnit,
    /// Matching starting points, ascending
    pub solutions: Vec<u64>,
    /// Candidates evaluated successfully
    pub evaluated: u64,
    pub status: UnitStatus,
}

/// Worker → coordinator messages
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// Matches for a unit; sent at most once per request
    Result(UnitReport),
    /// Completion marker; sent exactly once per request, after `Result`
    Done { unit_id: usize, worker_id: usize },
}

/// Stateless executor for compute requests
///
/// Workers hold no mutable state. The only thing shared with other threads is
/// the read-only cancellation flag.
#[derive(Clone)]
pub struct Worker {
    id: usize,
    evaluator: Arc<dyn CandidateEvaluator>,
    cancel: Arc<AtomicBool>,
}

impl Worker {
    pub fn new(id: usize, evaluator: Arc<dyn CandidateEvaluator>, cancel: Arc<AtomicBool>) -> Self {
        Self {
            id,
            evaluator,
            cancel,
        }
    }

    /// Worker using [`SquareSumEvaluator`] and a flag nobody sets
    pub fn with_default_evaluator(id: usize) -> Self {
        Self::new(
            id,
            Arc::new(SquareSumEvaluator),
            Arc::new(AtomicBool::new(false)),
        )
    }

    /// Evaluate the request's unit and send `Result` then `Done`
    ///
    /// Send failures mean the coordinator has already finished (timed out)
    /// and abandoned this worker; they are ignored.
    pub fn run(&self, request: ComputeRequest) {
        let ComputeRequest {
            unit_id,
            unit,
            k,
            reply_to,
        } = request;

        let report = self.evaluate_unit(unit_id, unit, k);
        if let Some(fault) = report.status.fault() {
            warn!(worker = self.id, unit_id, %unit, error = %fault, "unit ended early");
        }
        debug!(
            worker = self.id,
            unit_id,
            %unit,
            found = report.solutions.len(),
            evaluated = report.evaluated,
            of = unit.size(),
            "unit finished"
        );

        if reply_to.send(WorkerMessage::Result(report)).is_err() {
            return;
        }
        let _ = reply_to.send(WorkerMessage::Done {
            unit_id,
            worker_id: self.id,
        });
    }

    /// Evaluate every candidate of `unit`, isolating faults to this unit
    pub fn evaluate_unit(&self, unit_id: usize, unit: WorkUnit, k: u64) -> UnitReport {
        let mut solutions = Vec::new();
        let mut evaluated = 0u64;
        let mut status = UnitStatus::Complete;

        for s in unit.candidates() {
            if evaluated % CANCEL_CHECK_INTERVAL == 0 && self.cancel.load(Ordering::Relaxed) {
                status = UnitStatus::Cancelled;
                break;
            }

            match self.evaluate_candidate(s, k, unit_id) {
                Ok(true) => solutions.push(s),
                Ok(false) => {}
                Err(err) => {
                    status = if evaluated == 0 {
                        UnitStatus::Failed(err)
                    } else {
                        UnitStatus::Partial(err)
                    };
                    break;
                }
            }
            evaluated += 1;
        }

        UnitReport {
            unit_id,
            worker_id: self.id,
            unit,
            solutions,
            evaluated,
            status,
        }
    }

    fn evaluate_candidate(&self, s: u64, k: u64, unit_id: usize) -> Result<bool, SearchError> {
        let evaluator = &self.evaluator;
        match panic::catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(s, k))) {
            Ok(Ok(hit)) => Ok(hit),
            Ok(Err(err)) => Err(SearchError::WorkerFault {
                unit_id,
                candidate: s,
                reason: err.to_string(),
            }),
            Err(payload) => Err(SearchError::WorkerFault {
                unit_id,
                candidate: s,
                reason: format!("evaluator panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("cancelled", &self.cancel.load(Ordering::Relaxed))
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;

    /// Fails on one specific candidate
    struct FaultAt(u64);

    impl CandidateEvaluator for FaultAt {
        fn evaluate(&self, s: u64, k: u64) -> Result<bool, SearchError> {
            if s == self.0 {
                return Err(SearchError::Overflow { start: s, k });
            }
            SquareSumEvaluator.evaluate(s, k)
        }
    }

    struct PanicAt(u64);

    impl CandidateEvaluator for PanicAt {
        fn evaluate(&self, s: u64, k: u64) -> Result<bool, SearchError> {
            if s == self.0 {
                panic!("boom at {}", s);
            }
            SquareSumEvaluator.evaluate(s, k)
        }
    }

    fn worker_with(evaluator: impl CandidateEvaluator + 'static) -> Worker {
        Worker::new(7, Arc::new(evaluator), Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn test_evaluate_unit_k2() {
        let worker = Worker::with_default_evaluator(0);
        let report = worker.evaluate_unit(0, WorkUnit::new(1, 25), 2);
        assert_eq!(report.solutions, vec![3, 20]);
        assert_eq!(report.evaluated, 25);
        assert_eq!(report.status, UnitStatus::Complete);
    }

    #[test]
    fn test_evaluate_unit_k24() {
        let worker = Worker::with_default_evaluator(0);
        let report = worker.evaluate_unit(0, WorkUnit::new(1, 40), 24);
        assert!(report.solutions.contains(&1));
    }

    #[test]
    fn test_run_sends_result_then_done() {
        let (tx, rx) = unbounded();
        let worker = Worker::with_default_evaluator(3);
        worker.run(ComputeRequest {
            unit_id: 5,
            unit: WorkUnit::new(1, 3),
            k: 2,
            reply_to: tx,
        });

        match rx.recv().unwrap() {
            WorkerMessage::Result(report) => {
                assert_eq!(report.unit_id, 5);
                assert_eq!(report.worker_id, 3);
                assert_eq!(report.solutions, vec![3]);
            }
            other => panic!("expected Result, got {:?}", other),
        }
        match rx.recv().unwrap() {
            WorkerMessage::Done { unit_id, worker_id } => {
                assert_eq!(unit_id, 5);
                assert_eq!(worker_id, 3);
            }
            other => panic!("expected Done, got {:?}", other),
        }
        // Sender dropped with the request: nothing else arrives
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_fault_keeps_earlier_matches() {
        let worker = worker_with(FaultAt(10));
        let report = worker.evaluate_unit(2, WorkUnit::new(1, 25), 2);

        assert_eq!(report.solutions, vec![3]);
        assert_eq!(report.evaluated, 9);
        match report.status {
            UnitStatus::Partial(SearchError::WorkerFault {
                unit_id, candidate, ..
            }) => {
                assert_eq!(unit_id, 2);
                assert_eq!(candidate, 10);
            }
            other => panic!("expected partial, got {:?}", other),
        }
    }

    #[test]
    fn test_fault_on_first_candidate_is_failure() {
        let worker = worker_with(FaultAt(1));
        let report = worker.evaluate_unit(0, WorkUnit::new(1, 5), 2);
        assert!(report.solutions.is_empty());
        assert_eq!(report.evaluated, 0);
        assert!(matches!(report.status, UnitStatus::Failed(_)));
    }

    #[test]
    fn test_panic_is_isolated() {
        let worker = worker_with(PanicAt(4));
        let report = worker.evaluate_unit(0, WorkUnit::new(1, 10), 2);
        assert_eq!(report.solutions, vec![3]);
        match report.status.fault() {
            Some(SearchError::WorkerFault { reason, .. }) => {
                assert!(reason.contains("boom at 4"), "reason: {}", reason);
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_real_overflow_is_reported() {
        let worker = Worker::with_default_evaluator(0);
        let report = worker.evaluate_unit(0, WorkUnit::new(u64::MAX - 1, u64::MAX), u64::MAX);
        assert!(matches!(report.status, UnitStatus::Failed(_)));
    }

    #[test]
    fn test_cancelled_worker_stops() {
        let cancel = Arc::new(AtomicBool::new(true));
        let worker = Worker::new(0, Arc::new(SquareSumEvaluator), cancel);
        let report = worker.evaluate_unit(0, WorkUnit::new(1, 1_000_000), 2);
        assert_eq!(report.status, UnitStatus::Cancelled);
        assert_eq!(report.evaluated, 0);
    }

    #[test]
    fn test_run_ignores_closed_inbox() {
        let (tx, rx) = unbounded();
        drop(rx);
        let worker = Worker::with_default_evaluator(0);
        worker.run(ComputeRequest {
            unit_id: 0,
            unit: WorkUnit::new(1, 10),
            k: 2,
            reply_to: tx,
        });
    }
}
