//! Per-move time budgets.

use std::time::Duration;

/// Safety buffer in milliseconds to avoid time forfeit.
pub const TIME_BUFFER_MS: u64 = 50;

/// Default base thinking time per move.
pub const DEFAULT_MOVE_TIME_MS: u64 = 3_000;

/// Splits the game clock into per-move budgets.
///
/// A move gets the base move time while more than three quarters of the
/// initial clock remain, then 75%, 50% and 25% of it as the clock drops below
/// each further quarter. The budget never exceeds the remaining clock minus
/// [`TIME_BUFFER_MS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeManager {
    move_time: Duration,
    initial_clock_ms: i32,
}

impl TimeManager {
    /// Creates a time manager.
    ///
    /// # Arguments
    ///
    /// * `move_time` - Budget of a move while the clock is still full
    /// * `initial_clock_ms` - Clock at the start of the game
    pub fn new(move_time: Duration, initial_clock_ms: i32) -> Self {
        TimeManager {
            move_time,
            initial_clock_ms: initial_clock_ms.max(1),
        }
    }

    /// Scale applied to the base move time for a given remaining clock.
    pub fn scale(&self, remaining_ms: i32) -> f64 {
        let fraction = f64::from(remaining_ms) / f64::from(self.initial_clock_ms);
        if fraction > 0.75 {
            1.0
        } else if fraction > 0.5 {
            0.75
        } else if fraction > 0.25 {
            0.5
        } else {
            0.25
        }
    }

    /// Returns the thinking time for the next move.
    ///
    /// # Arguments
    ///
    /// * `remaining_ms` - Clock left for the side to move
    ///
    /// # Returns
    ///
    /// The budget, at least one millisecond.
    pub fn budget(&self, remaining_ms: i32) -> Duration {
        let scaled = (self.move_time.as_millis() as f64 * self.scale(remaining_ms)) as u64;
        let cap = u64::try_from(remaining_ms)
            .unwrap_or(0)
            .saturating_sub(TIME_BUFFER_MS);
        Duration::from_millis(scaled.min(cap).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_by_quarter() {
        let tm = TimeManager::new(Duration::from_millis(3000), 100_000);
        assert_eq!(tm.budget(100_000), Duration::from_millis(3000));
        assert_eq!(tm.budget(75_001), Duration::from_millis(3000));
        assert_eq!(tm.budget(75_000), Duration::from_millis(2250));
        assert_eq!(tm.budget(50_000), Duration::from_millis(1500));
        assert_eq!(tm.budget(25_000), Duration::from_millis(750));
    }

    #[test]
    fn test_budget_respects_remaining_clock() {
        let tm = TimeManager::new(Duration::from_millis(3000), 100_000);
        assert_eq!(tm.budget(500), Duration::from_millis(450));
        assert_eq!(tm.budget(20), Duration::from_millis(1));
        assert_eq!(tm.budget(-5), Duration::from_millis(1));
    }
}
