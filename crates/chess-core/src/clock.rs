//! Dual countdown clock with increment.
//!
//! There is no ticker: the side to move loses time only when the clock
//! is *settled*. Between settlements the remaining time is derived from
//! `now - last_decision_at`, so an idle session costs nothing.
//!
//! Timestamps are plain milliseconds from a [`TimeSource`], which keeps
//! the clock deterministic in tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::color::Color;
use crate::time_control::TimeControl;

/// Monotonic millisecond source.
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Milliseconds since the source was created.
#[derive(Debug)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        SystemTimeSource {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven time, for tests and replays.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(start_ms: u64) -> Self {
        ManualTimeSource {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Result of settling the mover's clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Time was deducted and the increment added.
    Continued { remaining_ms: u64 },

    /// The mover's time reached zero; the clock is stopped.
    Flagged,
}

/// Point-in-time view of both clocks, as the clients should display them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub white_ms: u64,
    pub black_ms: u64,
    pub increment_ms: u64,
    pub running: bool,
}

#[derive(Debug, Clone)]
pub struct GameClock {
    white_ms: u64,
    black_ms: u64,
    increment_ms: u64,

    /// When the clock last changed hands. `None` while stopped.
    last_decision_at: Option<u64>,
}

impl GameClock {
    pub fn new(time_control: TimeControl) -> Self {
        let base = time_control.base_ms();
        GameClock {
            white_ms: base,
            black_ms: base,
            increment_ms: time_control.increment_ms(),
            last_decision_at: None,
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        self.last_decision_at = Some(now_ms);
    }

    /// Freeze both sides. Stored values are kept as-is.
    pub fn stop(&mut self) {
        self.last_decision_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.last_decision_at.is_some()
    }

    pub fn increment_ms(&self) -> u64 {
        self.increment_ms
    }

    /// Stored (unsettled) remaining time.
    pub fn remaining_ms(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_ms,
            Color::Black => self.black_ms,
        }
    }

    pub fn set_remaining_ms(&mut self, color: Color, ms: u64) {
        match color {
            Color::White => self.white_ms = ms,
            Color::Black => self.black_ms = ms,
        }
    }

    /// Time since the clock last changed hands (0 when stopped).
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        self.last_decision_at
            .map(|last| now_ms.saturating_sub(last))
            .unwrap_or(0)
    }

    /// Remaining time as a client should see it right now.
    pub fn effective_remaining_ms(&self, color: Color, turn: Color, now_ms: u64) -> u64 {
        let stored = self.remaining_ms(color);
        if color == turn {
            stored.saturating_sub(self.elapsed_ms(now_ms))
        } else {
            stored
        }
    }

    /// True if settling `color` now would flag. Reaching exactly zero counts.
    pub fn has_flagged(&self, color: Color, now_ms: u64) -> bool {
        self.is_running() && self.remaining_ms(color) <= self.elapsed_ms(now_ms)
    }

    /// Charge the elapsed time to `color`, then either flag or add the
    /// increment and hand the clock over.
    ///
    /// The other color's stored time is never touched.
    pub fn settle(&mut self, color: Color, now_ms: u64) -> Settlement {
        if !self.is_running() {
            return Settlement::Continued {
                remaining_ms: self.remaining_ms(color),
            };
        }

        let elapsed = self.elapsed_ms(now_ms);
        let left = self.remaining_ms(color).saturating_sub(elapsed);

        if left == 0 {
            self.set_remaining_ms(color, 0);
            self.stop();
            return Settlement::Flagged;
        }

        let remaining_ms = left.saturating_add(self.increment_ms);
        self.set_remaining_ms(color, remaining_ms);
        self.last_decision_at = Some(now_ms);
        Settlement::Continued { remaining_ms }
    }

    pub fn snapshot(&self, turn: Color, now_ms: u64) -> ClockSnapshot {
        ClockSnapshot {
            white_ms: self.effective_remaining_ms(Color::White, turn, now_ms),
            black_ms: self.effective_remaining_ms(Color::Black, turn, now_ms),
            increment_ms: self.increment_ms,
            running: self.is_running(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_clock(minutes: u32, increment_secs: u32, start: u64) -> GameClock {
        let mut clock = GameClock::new(TimeControl::new(minutes, increment_secs));
        clock.start(start);
        clock
    }

    #[test]
    fn stopped_clock_does_not_lose_time() {
        let clock = GameClock::new(TimeControl::new(5, 0));
        assert!(!clock.is_running());
        assert_eq!(clock.effective_remaining_ms(Color::White, Color::White, 99_999), 300_000);
    }

    #[test]
    fn only_side_to_move_is_charged_lazily() {
        let clock = running_clock(1, 0, 1_000);
        assert_eq!(clock.effective_remaining_ms(Color::White, Color::White, 11_000), 50_000);
        assert_eq!(clock.effective_remaining_ms(Color::Black, Color::White, 11_000), 60_000);
    }

    #[test]
    fn settle_deducts_then_adds_increment() {
        let mut clock = running_clock(1, 2, 0);
        let s = clock.settle(Color::White, 5_000);
        assert_eq!(s, Settlement::Continued { remaining_ms: 57_000 });
        assert_eq!(clock.remaining_ms(Color::Black), 60_000);
        // Clock handed over at 5s: black is charged from there.
        assert_eq!(clock.effective_remaining_ms(Color::Black, Color::Black, 6_000), 59_000);
    }

    #[test]
    fn reaching_exactly_zero_flags() {
        let mut clock = running_clock(1, 5, 0);
        clock.set_remaining_ms(Color::White, 100);
        assert!(clock.has_flagged(Color::White, 100));
        assert_eq!(clock.settle(Color::White, 100), Settlement::Flagged);
        assert_eq!(clock.remaining_ms(Color::White), 0);
        assert!(!clock.is_running());
    }

    #[test]
    fn flag_never_gets_increment() {
        let mut clock = running_clock(1, 30, 0);
        clock.set_remaining_ms(Color::Black, 10);
        assert_eq!(clock.settle(Color::Black, 50), Settlement::Flagged);
        assert_eq!(clock.remaining_ms(Color::Black), 0);
    }

    #[test]
    fn snapshot_clamps_at_zero() {
        let mut clock = running_clock(1, 0, 0);
        clock.set_remaining_ms(Color::White, 10);
        let snap = clock.snapshot(Color::White, 1_000);
        assert_eq!(snap.white_ms, 0);
        assert_eq!(snap.black_ms, 60_000);
        assert!(snap.running);
    }

    #[test]
    fn manual_time_source_advances() {
        let time = ManualTimeSource::new(10);
        time.advance(5);
        assert_eq!(time.now_ms(), 15);
        time.set(100);
        assert_eq!(time.now_ms(), 100);
    }
}
