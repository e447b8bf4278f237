use std::time::Duration;

/// Tunable knobs for the history-recovery loop.
///
/// The defaults mirror the behavior the exporter needs against the two
/// supported front-ends; tests override `round_delay` with zero to avoid
/// real-time waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverySettings {
    /// Hard ceiling on recovery rounds, convergence or not.
    pub max_rounds: u32,
    /// Consecutive unchanged-extent rounds that count as convergence.
    pub stall_limit: u32,
    /// Pause after each synthetic scroll gesture, giving the host page time
    /// to materialize lazy content.
    pub round_delay: Duration,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            max_rounds: 60,
            stall_limit: 3,
            round_delay: Duration::from_millis(1200),
        }
    }
}

/// Why the recovery loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The scrollable extent stopped growing for `stall_limit` rounds.
    Converged,
    /// `max_rounds` elapsed while the extent was still changing.
    CeilingReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    Continue,
    Stop(StopReason),
}

/// Pure convergence detector for the recovery loop.
///
/// The loop driver measures the container's scrollable extent once per round
/// and feeds it to [`RecoveryPolicy::observe`]; the policy tracks the stall
/// counter and the round ceiling. Keeping this separate from the async loop
/// makes the stop conditions testable without any timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPolicy {
    settings: RecoverySettings,
    baseline: u64,
    stalls: u32,
    rounds: u32,
}

impl RecoveryPolicy {
    /// Start tracking from the extent measured before the first round.
    pub fn begin(settings: RecoverySettings, initial_extent: u64) -> Self {
        Self {
            settings,
            baseline: initial_extent,
            stalls: 0,
            rounds: 0,
        }
    }

    /// Record the extent measured at the end of one round and decide whether
    /// the loop should keep going.
    pub fn observe(&mut self, extent: u64) -> RecoveryDecision {
        self.rounds += 1;
        if extent == self.baseline {
            self.stalls += 1;
        } else {
            self.baseline = extent;
            self.stalls = 0;
        }

        if self.stalls >= self.settings.stall_limit {
            RecoveryDecision::Stop(StopReason::Converged)
        } else if self.rounds >= self.settings.max_rounds {
            RecoveryDecision::Stop(StopReason::CeilingReached)
        } else {
            RecoveryDecision::Continue
        }
    }

    /// Rounds observed so far.
    pub fn rounds_completed(&self) -> u32 {
        self.rounds
    }

    /// 1-based number of the round about to run.
    pub fn next_round(&self) -> u32 {
        self.rounds + 1
    }

    /// Latest extent accepted as the comparison baseline.
    pub fn baseline(&self) -> u64 {
        self.baseline
    }
}
