//! Per-turn timings, collected by the verbose turn path.

use std::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TurnMetrics {
    /// Total elapsed time for the turn, including waiting for the user's lock.
    pub total: Duration,
    /// Time spent in intent detection.
    pub detect: Duration,
    /// Time spent selecting the transition and running actions.
    pub transition: Duration,
}
