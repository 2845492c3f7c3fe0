//! Cooperative time slicing for work that is too long for one frame.
//!
//! A `SlicedTask` is a resumable state machine: every call to `step()` does one
//! small unit of work and reports whether more is ready. `TimeSlicer` drives a
//! task once per host frame and keeps stepping until the frame budget is used
//! up, the task asks to wait for the next frame, or it finishes.
//!
//! Two guarantees matter to callers:
//!  1. **Forward progress** -- every resumption performs at least one step, even
//!     with a zero budget, so a slow frame never starves the scan.
//!  2. **Error isolation** -- a failing step is logged and ends the current
//!     tick. The task owns its resume point, so the next tick picks up wherever
//!     the task decided to continue.

use std::fmt::Display;
use std::time::Duration;

use crate::time::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// More work is ready; keep stepping while budget remains.
    Continue,
    /// Suspend until the next frame regardless of remaining budget.
    YieldFrame,
    /// Nothing left to do. The slicer stops resuming the task.
    Finished,
}

pub trait SlicedTask {
    type Error: Display;

    fn step(&mut self) -> Result<StepOutcome, Self::Error>;
}

/// Why a tick ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspension {
    BudgetExhausted,
    FrameYield,
    Failed,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub steps: usize,
    pub elapsed: Duration,
    pub suspension: Suspension,
}

pub struct TimeSlicer {
    budget: Duration,
    finished: bool,
}

impl TimeSlicer {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            finished: false,
        }
    }

    pub fn from_millis(budget_ms: f64) -> Self {
        Self::new(Duration::from_secs_f64(budget_ms.max(0.0) / 1000.0))
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Takes effect on the next resumption.
    pub fn set_budget(&mut self, budget: Duration) {
        self.budget = budget;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Resume `task` for one host tick.
    ///
    /// The budget check happens after each step, so a step that overruns the
    /// budget still completes; the slicer only refuses to start another one.
    pub fn run_tick<T: SlicedTask>(&mut self, task: &mut T, clock: &impl Clock) -> TickReport {
        if self.finished {
            return TickReport {
                steps: 0,
                elapsed: Duration::ZERO,
                suspension: Suspension::Finished,
            };
        }

        let started = clock.now();
        let mut steps = 0usize;
        loop {
            let outcome = task.step();
            steps += 1;
            let elapsed = clock.now().saturating_duration_since(started);

            let suspension = match outcome {
                Ok(StepOutcome::Continue) if elapsed < self.budget => continue,
                Ok(StepOutcome::Continue) => Suspension::BudgetExhausted,
                Ok(StepOutcome::YieldFrame) => Suspension::FrameYield,
                Ok(StepOutcome::Finished) => {
                    self.finished = true;
                    Suspension::Finished
                }
                Err(err) => {
                    log::warn!("Sliced task step failed (step {steps} this tick): {err}");
                    Suspension::Failed
                }
            };
            if suspension == Suspension::BudgetExhausted {
                log::trace!(
                    "Slice budget {:?} used after {steps} step(s) ({:?})",
                    self.budget,
                    elapsed
                );
            }
            return TickReport {
                steps,
                elapsed,
                suspension,
            };
        }
    }
}
