//! Advisory fair-play signals.
//!
//! Counters only ever go up and are never consulted by the state
//! machine. They are surfaced to clients for display; this is not a
//! security control.

/// Think time below which a move counts as "fast".
pub const FAST_MOVE_THRESHOLD_MS: u64 = 1_000;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FairplaySignals {
    pub move_count: u32,
    pub fast_move_count: u32,
    pub suspicion_score: u32,
}

impl FairplaySignals {
    pub fn new() -> Self {
        FairplaySignals::default()
    }

    /// Record one accepted move that took `think_time_ms`.
    pub fn record(&mut self, think_time_ms: u64) {
        self.move_count = self.move_count.saturating_add(1);
        if think_time_ms < FAST_MOVE_THRESHOLD_MS {
            self.fast_move_count = self.fast_move_count.saturating_add(1);
            self.suspicion_score = self.suspicion_score.saturating_add(1);
        }
    }
}
