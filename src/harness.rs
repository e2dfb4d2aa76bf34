//! Wall-clock driven refinement loop shared by every solver.
//!
//! A solver only knows how to make one refinement step ([`RefineStep::refine`]);
//! [`RunHarness`] repeats that step while the budget lasts and the previous step made
//! progress, owns the [`RunStatus`] state machine and produces the run summary.

use crate::error::{Result, WdpError};
use crate::instance::AuctionInstance;
use crate::solution::Solution;
use crate::summary::RunSummary;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Lifecycle of a run; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    NotStarted,
    PartiallyOptimized,
    Finished,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStatus::NotStarted => "NotStarted",
            RunStatus::PartiallyOptimized => "PartiallyOptimized",
            RunStatus::Finished => "Finished",
        };
        write!(f, "{}", name)
    }
}

/// A validated, finite, strictly positive time budget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeout(Duration);

impl Timeout {
    pub fn from_secs_f64(secs: Option<f64>) -> Result<Self> {
        let secs = secs.ok_or_else(|| WdpError::config("a timeout is required"))?;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(WdpError::config(format!(
                "timeout must be a finite number of seconds > 0, got {}",
                secs
            )));
        }
        let duration = Duration::try_from_secs_f64(secs)
            .map_err(|e| WdpError::config(format!("timeout {}: {}", secs, e)))?;
        if duration.is_zero() {
            return Err(WdpError::config(format!(
                "timeout {} rounds down to zero",
                secs
            )));
        }
        Ok(Timeout(duration))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let secs: f64 = text
            .trim()
            .parse()
            .map_err(|_| WdpError::config(format!("timeout '{}' is not a number", text)))?;
        Self::from_secs_f64(Some(secs))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }
}

impl std::str::FromStr for Timeout {
    type Err = WdpError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One solver as seen by the harness
pub trait RefineStep {
    /// Solver name recorded in summaries
    fn name(&self) -> &str;

    /// Make one refinement step within `remaining`; returns whether it made progress.
    /// Single-pass solvers do all their work in the first call and return `false`.
    fn refine(&mut self, remaining: Duration) -> Result<bool>;

    /// Reported profit
    fn profit(&self) -> f64;

    /// Conflict-free profit when it can differ from [`RefineStep::profit`]
    fn feasible_profit(&self) -> Option<f64> {
        None
    }

    /// Backend status string, recorded instead of the run status when present
    fn native_status(&self) -> Option<String> {
        None
    }

    fn solution(&self) -> Solution;
}

/// Final figures of a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub elapsed: Duration,
    pub steps: usize,
    pub profit: f64,
}

/// Drives a solver under a time budget
pub struct RunHarness<S: RefineStep> {
    solver: S,
    timeout: Timeout,
    status: RunStatus,
    elapsed: Duration,
    steps: usize,
    num_items: usize,
    num_bids: usize,
    name: String,
    file_path: String,
}

impl<S: RefineStep> RunHarness<S> {
    pub fn new(solver: S, instance: &AuctionInstance, timeout: Timeout) -> Self {
        RunHarness {
            solver,
            timeout,
            status: RunStatus::NotStarted,
            elapsed: Duration::ZERO,
            steps: 0,
            num_items: instance.num_items(),
            num_bids: instance.num_bids(),
            name: instance.name.clone(),
            file_path: instance.file_path(),
        }
    }

    /// Refine until the budget is spent or a step makes no progress.
    ///
    /// The budget is only checked between steps. A finished run is not restarted.
    pub fn run(&mut self) -> Result<RunOutcome> {
        if self.status == RunStatus::Finished {
            return Ok(self.outcome());
        }

        let budget = self.timeout.as_duration();
        let start = Instant::now();

        while start.elapsed() <= budget {
            let remaining = budget.saturating_sub(start.elapsed());
            let progress = self.solver.refine(remaining);
            self.elapsed = start.elapsed();
            let progress = progress?;

            self.steps += 1;
            self.status = RunStatus::PartiallyOptimized;
            if !progress {
                break;
            }
        }

        self.status = RunStatus::Finished;
        self.elapsed = start.elapsed();
        Ok(self.outcome())
    }

    fn outcome(&self) -> RunOutcome {
        RunOutcome {
            status: self.status,
            elapsed: self.elapsed,
            steps: self.steps,
            profit: self.solver.profit(),
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    /// Summary record of the run so far
    pub fn summary(&self) -> RunSummary {
        let feasible_profit = self.solver.feasible_profit();
        RunSummary {
            status: self
                .solver
                .native_status()
                .unwrap_or_else(|| self.status.to_string()),
            delta_time: self.elapsed.as_secs_f64(),
            nr_items: self.num_items,
            nr_orders: self.num_bids,
            profit: self.solver.profit(),
            file_path: self.file_path.clone(),
            name: self.name.clone(),
            solver: self.solver.name().to_string(),
            timeout: self.timeout.as_secs_f64(),
            feasible_profit,
            epochs: feasible_profit.map(|_| self.steps),
        }
    }

    /// Log the headline figures of the run
    pub fn log_summary(&self) {
        let summary = self.summary();
        let secs = self.elapsed.as_secs();
        log::info!("Total profit      => {}", summary.profit);
        if let Some(feasible) = summary.feasible_profit {
            log::info!("Feasible profit   => {}", feasible);
        }
        log::info!("Status            => {}", summary.status);
        log::info!(
            "Took              => {} minutes and {} seconds",
            secs / 60,
            secs % 60
        );
    }
}
