//! Deferred one-shot tasks and timed effects
//!
//! Nothing here waits. Each tick polls "has this deadline passed" against the
//! tick's single timestamp.

use serde::Serialize;

/// Identifies one scheduling of a [`OneShot`]. Rescheduling invalidates
/// older tokens, so a stale cancel cannot kill a newer deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelToken(u64);

/// A cancellable one-shot deadline
#[derive(Debug, Clone, Default)]
pub struct OneShot {
    deadline: Option<f64>,
    generation: u64,
}

impl OneShot {
    /// Arm (or re-arm) the task to fire `delay_ms` after `now`
    pub fn schedule(&mut self, now: f64, delay_ms: f64) -> CancelToken {
        self.generation += 1;
        self.deadline = Some(now + delay_ms);
        CancelToken(self.generation)
    }

    /// Cancel the scheduling identified by `token`. Returns false if the
    /// token is stale or the task already fired.
    pub fn cancel(&mut self, token: CancelToken) -> bool {
        if token.0 == self.generation && self.deadline.is_some() {
            self.deadline = None;
            true
        } else {
            false
        }
    }

    /// Drop any pending deadline regardless of token
    pub fn clear(&mut self) {
        self.deadline = None;
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once, on the first poll at or after the deadline
    pub fn poll(&mut self, now: f64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// A boolean effect that holds until an expiry timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimedBuff {
    pub until: Option<f64>,
}

impl TimedBuff {
    /// Grant for `duration_ms`; an already longer-running grant is kept
    pub fn grant(&mut self, now: f64, duration_ms: f64) {
        let until = now + duration_ms;
        self.until = Some(self.until.map_or(until, |current| current.max(until)));
    }

    #[inline]
    pub fn is_active(&self, now: f64) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    pub fn remaining(&self, now: f64) -> f64 {
        self.until.map_or(0.0, |until| (until - now).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_fires_once() {
        let mut task = OneShot::default();
        task.schedule(1_000.0, 500.0);
        assert!(!task.poll(1_499.0));
        assert!(task.poll(1_500.0));
        assert!(!task.poll(1_600.0));
        assert!(!task.is_pending());
    }

    #[test]
    fn test_stale_token_cannot_cancel() {
        let mut task = OneShot::default();
        let old = task.schedule(0.0, 100.0);
        let current = task.schedule(50.0, 100.0);

        assert!(!task.cancel(old));
        assert!(task.is_pending());
        assert!(task.cancel(current));
        assert!(!task.poll(1_000.0));
    }

    #[test]
    fn test_timed_buff() {
        let mut buff = TimedBuff::default();
        assert!(!buff.is_active(0.0));

        buff.grant(0.0, 8_000.0);
        buff.grant(1_000.0, 2_000.0);
        assert!(buff.is_active(7_999.0));
        assert!(!buff.is_active(8_000.0));
        assert_eq!(buff.remaining(6_000.0), 2_000.0);
    }
}
