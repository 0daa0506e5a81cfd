//! Poll-driven debouncing.
//!
//! The event loop owns a monotonic millisecond clock and polls each
//! debouncer on every tick. Queuing a value replaces (cancels) whatever was
//! pending, so only the last value queued inside a quiescence window fires.

/// A cancellable one-shot timer keyed on a caller-supplied clock.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay_ms: u64,
    pending: Option<(T, u64)>,
}

impl<T> Debouncer<T> {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    /// Schedule `value` to fire `delay_ms` after `now_ms`, replacing any
    /// pending value.
    pub fn queue(&mut self, value: T, now_ms: u64) {
        self.pending = Some((value, now_ms));
    }

    /// Take the pending value once its window has elapsed.
    pub fn take_ready(&mut self, now_ms: u64) -> Option<T> {
        let queued_at = self.pending.as_ref()?.1;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    /// Drop the pending value without firing it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub const fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// Milliseconds until the pending value fires, if any.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        let (_, queued_at) = self.pending.as_ref()?;
        Some(
            queued_at
                .saturating_add(self.delay_ms)
                .saturating_sub(now_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_delay() {
        let mut d = Debouncer::new(300);
        d.queue("a", 1_000);
        assert_eq!(d.take_ready(1_299), None);
        assert_eq!(d.take_ready(1_300), Some("a"));
        assert!(!d.is_pending());
    }

    #[test]
    fn test_requeue_restarts_window_and_keeps_latest() {
        let mut d = Debouncer::new(300);
        d.queue(1, 0);
        d.queue(2, 200);
        assert_eq!(d.take_ready(300), None, "first window was superseded");
        assert_eq!(d.take_ready(500), Some(2));
        assert_eq!(d.take_ready(900), None, "fires only once");
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut d = Debouncer::new(10);
        d.queue((), 0);
        d.cancel();
        assert_eq!(d.take_ready(1_000), None);
    }

    #[test]
    fn test_remaining_ms_counts_down() {
        let mut d = Debouncer::new(1_000);
        assert_eq!(d.remaining_ms(0), None);
        d.queue((), 100);
        assert_eq!(d.remaining_ms(600), Some(500));
        assert_eq!(d.remaining_ms(5_000), Some(0));
    }
}
