//! Bounded polling
//!
//! Every hardware wait in this driver is "check a condition at an interval,
//! give up after a budget". Centralizing it keeps each timeout budget in
//! one place at the call site and makes them testable against a fake
//! clock.

use halcyon_driver_traits::Clock;

/// Poll `cond` until it holds, sleeping `interval_ms` between checks.
///
/// Returns `false` if the condition still does not hold after `attempts`
/// sleeps (total budget `attempts * interval_ms`). The condition is
/// checked before the first sleep, so an already-satisfied wait costs
/// nothing.
pub(crate) fn poll_until<C: Clock>(
    clock: &C,
    interval_ms: u64,
    attempts: u32,
    mut cond: impl FnMut() -> bool,
) -> bool {
    let mut remaining = attempts;
    loop {
        if cond() {
            return true;
        }
        if remaining == 0 {
            return false;
        }
        clock.sleep_ms(interval_ms);
        remaining -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FakeClock;

    #[test]
    fn test_satisfied_condition_never_sleeps() {
        let clock = FakeClock::new();
        assert!(poll_until(&clock, 10, 100, || true));
        assert_eq!(clock.sleeps.get(), 0);
    }

    #[test]
    fn test_timeout_consumes_exact_budget() {
        let clock = FakeClock::new();
        assert!(!poll_until(&clock, 10, 200, || false));
        assert_eq!(clock.sleeps.get(), 200);
        assert_eq!(clock.slept_ms.get(), 2000);
    }

    #[test]
    fn test_condition_satisfied_midway() {
        let clock = FakeClock::new();
        let mut calls = 0;
        assert!(poll_until(&clock, 1, 500, || {
            calls += 1;
            calls == 4
        }));
        assert_eq!(clock.sleeps.get(), 3);
    }
}
