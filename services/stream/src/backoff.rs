//! Reconnection backoff policy.

use std::time::Duration;

/// Exponential backoff schedule for reconnect attempts.
///
/// The Nth scheduled retry (N starting at 0) waits
/// `min(base × 2^N, max)`. The attempt counter only resets on a successful
/// connection, so a flapping feed walks back up the schedule immediately.
/// There is no attempt cutoff: the worst case is an indefinitely retried
/// loop at the capped delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    attempt: u32,
}

impl Backoff {
    /// Create a schedule with the given base and cap in milliseconds.
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            attempt: 0,
        }
    }

    /// Delay for the current attempt; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        // Shift capped well below 64 so the multiplier cannot overflow
        // before the max cap applies.
        let factor = 1u64 << self.attempt.min(20);
        let delay_ms = self.base_ms.saturating_mul(factor).min(self.max_ms);
        self.attempt += 1;
        Duration::from_millis(delay_ms)
    }

    /// Number of the next attempt (0 before any delay was handed out).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Reset the schedule after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
