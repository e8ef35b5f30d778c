//! Monotonic clock seam
//!
//! Every hardware timeout loop in the drivers needs two primitives: a
//! monotonic millisecond reading and a blocking delay. How they are backed
//! (RTC periodic tick, PIT, a syscall) is the platform's business.

/// Monotonic clock with a blocking delay.
pub trait Clock {
    /// Milliseconds since some fixed point in the past.
    fn now_ms(&self) -> u64;

    /// Block the calling context for at least `ms` milliseconds.
    fn sleep_ms(&self, ms: u64);
}
