//! Coordinator aggregation state
//!
//! `CoordinatorState` is owned by the coordinator thread and mutated only from
//! its message loop, one message at a time. No locks are involved.
//!
//! ```text
//!              Done (completed == expected)
//!   Awaiting ───────────────────────────────▶ Complete
//!      │
//!      │ deadline elapsed
//!      ▼
//!   TimedOut
//! ```

use super::merge::merge;
use crate::error::SearchError;
use crate::worker::{UnitReport, UnitStatus};
use tracing::warn;

/// Coordinator lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `0 <= completed < expected`
    Awaiting,
    /// Every unit reported `Done`
    Complete,
    /// Deadline elapsed while awaiting
    TimedOut,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Phase::Awaiting)
    }
}

/// Aggregation state for one run
#[derive(Debug)]
pub struct CoordinatorState {
    expected: usize,
    completed: usize,
    /// Per-unit `Done` flags; a second `Done` for a unit is ignored
    done: Vec<bool>,
    accumulated: Vec<u64>,
    evaluated: u64,
    faults: Vec<SearchError>,
    cancelled_units: usize,
    phase: Phase,
}

/// Terminal snapshot handed back to the coordinator
#[derive(Debug)]
pub struct Finalized {
    pub phase: Phase,
    pub solutions: Vec<u64>,
    pub units_completed: usize,
    pub candidates_evaluated: u64,
    /// Units whose report came back cancelled
    pub cancelled_units: usize,
    pub faults: Vec<SearchError>,
}

impl CoordinatorState {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            completed: 0,
            done: vec![false; expected],
            accumulated: Vec::new(),
            evaluated: 0,
            faults: Vec::new(),
            cancelled_units: 0,
            phase: if expected == 0 {
                Phase::Complete
            } else {
                Phase::Awaiting
            },
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Fold a unit report into the state
    ///
    /// Reports arriving after a terminal transition are dropped.
    pub fn on_result(&mut self, report: UnitReport) {
        if self.phase.is_terminal() {
            return;
        }

        self.evaluated += report.evaluated;
        for &s in &report.solutions {
            if report.unit.contains(s) {
                self.accumulated.push(s);
            } else {
                warn!(unit_id = report.unit_id, candidate = s, unit = %report.unit, "solution outside its unit dropped");
            }
        }
        match report.status {
            UnitStatus::Complete => {}
            UnitStatus::Partial(fault) | UnitStatus::Failed(fault) => self.faults.push(fault),
            UnitStatus::Cancelled => self.cancelled_units += 1,
        }
    }

    /// Count a `Done` marker; returns the phase after the transition
    pub fn on_done(&mut self, unit_id: usize) -> Phase {
        if self.phase.is_terminal() {
            return self.phase;
        }

        match self.done.get_mut(unit_id) {
            Some(flag) if !*flag => {
                *flag = true;
                self.completed += 1;
            }
            Some(_) => warn!(unit_id, "duplicate Done ignored"),
            None => warn!(unit_id, expected = self.expected, "Done for unknown unit ignored"),
        }

        if self.completed == self.expected {
            self.phase = Phase::Complete;
        }
        self.phase
    }

    /// Deadline elapsed; only effective while awaiting
    pub fn on_deadline(&mut self) -> Phase {
        if self.phase == Phase::Awaiting {
            self.phase = Phase::TimedOut;
        }
        self.phase
    }

    /// Sort what has been accumulated and consume the state
    ///
    /// Must only be called once a terminal phase has been reached.
    pub fn finalize(self) -> Finalized {
        debug_assert!(self.phase.is_terminal(), "finalize while awaiting");
        Finalized {
            phase: self.phase,
            solutions: merge(self.accumulated),
            units_completed: self.completed,
            candidates_evaluated: self.evaluated,
            cancelled_units: self.cancelled_units,
            faults: self.faults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::WorkUnit;

    fn report(unit_id: usize, solutions: Vec<u64>, status: UnitStatus) -> UnitReport {
        UnitReport {
            unit_id,
            worker_id: 0,
            unit: WorkUnit::new(1, 10_000),
            evaluated: 10,
            solutions,
            status,
        }
    }

    #[test]
    fn test_completes_after_all_done() {
        let mut state = CoordinatorState::new(2);
        assert_eq!(state.phase(), Phase::Awaiting);

        state.on_result(report(1, vec![20], UnitStatus::Complete));
        assert_eq!(state.on_done(1), Phase::Awaiting);
        state.on_result(report(0, vec![3], UnitStatus::Complete));
        assert_eq!(state.on_done(0), Phase::Complete);

        let done = state.finalize();
        assert_eq!(done.phase, Phase::Complete);
        assert_eq!(done.solutions, vec![3, 20]);
        assert_eq!(done.units_completed, 2);
        assert_eq!(done.candidates_evaluated, 20);
    }

    #[test]
    fn test_completed_never_exceeds_expected() {
        let mut state = CoordinatorState::new(2);
        state.on_done(0);
        state.on_done(0);
        assert_eq!(state.completed(), 1);
        state.on_done(99);
        assert_eq!(state.completed(), 1);
        state.on_done(1);
        state.on_done(1);
        assert_eq!(state.completed(), 2);
        state.on_done(0);
        assert_eq!(state.completed(), 2);
    }

    #[test]
    fn test_deadline_while_awaiting() {
        let mut state = CoordinatorState::new(3);
        state.on_result(report(2, vec![119], UnitStatus::Complete));
        state.on_done(2);
        assert_eq!(state.on_deadline(), Phase::TimedOut);

        // Late messages do not change a terminal state
        state.on_result(report(0, vec![3], UnitStatus::Complete));
        assert_eq!(state.on_done(0), Phase::TimedOut);

        let done = state.finalize();
        assert_eq!(done.phase, Phase::TimedOut);
        assert_eq!(done.solutions, vec![119]);
        assert_eq!(done.units_completed, 1);
    }

    #[test]
    fn test_deadline_after_complete_is_noop() {
        let mut state = CoordinatorState::new(1);
        state.on_done(0);
        assert_eq!(state.on_deadline(), Phase::Complete);
    }

    #[test]
    fn test_faults_are_collected() {
        let mut state = CoordinatorState::new(2);
        let fault = SearchError::WorkerFault {
            unit_id: 0,
            candidate: 7,
            reason: "overflow".to_string(),
        };
        state.on_result(report(0, vec![3], UnitStatus::Partial(fault.clone())));
        state.on_done(0);
        state.on_result(report(1, vec![], UnitStatus::Cancelled));
        state.on_done(1);

        let done = state.finalize();
        assert_eq!(done.faults, vec![fault]);
        assert_eq!(done.solutions, vec![3]);
    }

    #[test]
    fn test_arrival_order_does_not_matter() {
        let mut a = CoordinatorState::new(3);
        let mut b = CoordinatorState::new(3);
        let reports = vec![
            report(0, vec![3], UnitStatus::Complete),
            report(1, vec![20], UnitStatus::Complete),
            report(2, vec![119, 696], UnitStatus::Complete),
        ];
        for r in reports.iter().cloned() {
            let id = r.unit_id;
            a.on_result(r);
            a.on_done(id);
        }
        for r in reports.into_iter().rev() {
            let id = r.unit_id;
            b.on_result(r);
            b.on_done(id);
        }
        assert_eq!(a.finalize().solutions, b.finalize().solutions);
    }

    #[test]
    fn test_solution_outside_unit_is_dropped() {
        let mut state = CoordinatorState::new(1);
        state.on_result(UnitReport {
            unit_id: 0,
            worker_id: 0,
            unit: WorkUnit::new(1, 10),
            evaluated: 10,
            solutions: vec![3, 20],
            status: UnitStatus::Complete,
        });
        state.on_done(0);
        assert_eq!(state.finalize().solutions, vec![3]);
    }

    #[test]
    fn test_zero_units_is_complete() {
        let state = CoordinatorState::new(0);
        assert_eq!(state.phase(), Phase::Complete);
    }
}
