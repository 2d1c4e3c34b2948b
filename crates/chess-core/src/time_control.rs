//! Time control (base minutes + per-move increment).

/// Base time per side and Fischer increment.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeControl {
    /// Starting time per side, in whole minutes.
    pub minutes: u32,

    /// Seconds added to the mover's clock after each accepted move.
    pub increment_secs: u32,
}

impl TimeControl {
    pub const DEFAULT_MINUTES: u32 = 10;
    pub const DEFAULT_INCREMENT_SECS: u32 = 0;

    pub const MIN_MINUTES: u32 = 1;
    pub const MAX_MINUTES: u32 = 180;
    pub const MAX_INCREMENT_SECS: u32 = 60;

    pub fn new(minutes: u32, increment_secs: u32) -> Self {
        TimeControl {
            minutes,
            increment_secs,
        }
    }

    /// Fill missing request fields with the defaults.
    pub fn from_optional(minutes: Option<u32>, increment_secs: Option<u32>) -> Self {
        TimeControl {
            minutes: minutes.unwrap_or(Self::DEFAULT_MINUTES),
            increment_secs: increment_secs.unwrap_or(Self::DEFAULT_INCREMENT_SECS),
        }
    }

    pub fn is_within_limits(&self) -> bool {
        (Self::MIN_MINUTES..=Self::MAX_MINUTES).contains(&self.minutes)
            && self.increment_secs <= Self::MAX_INCREMENT_SECS
    }

    pub fn base_ms(&self) -> u64 {
        u64::from(self.minutes) * 60_000
    }

    pub fn increment_ms(&self) -> u64 {
        u64::from(self.increment_secs) * 1_000
    }
}

impl Default for TimeControl {
    fn default() -> Self {
        TimeControl::new(Self::DEFAULT_MINUTES, Self::DEFAULT_INCREMENT_SECS)
    }
}
