//! Leading+trailing tick throttle.
//!
//! Fires at most once per period, always fires on the first event, and
//! always fires once more after the last event of a burst. The owner keeps
//! the trailing deadline armed in its select loop.

use std::time::{Duration, Instant};

/// Leading+trailing edge throttle.
#[derive(Debug)]
pub struct Throttle {
    period: Duration,
    last_fire: Option<Instant>,
    trailing: Option<Instant>,
}

impl Throttle {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_fire: None,
            trailing: None,
        }
    }

    /// Record an event at `now`. Returns `true` when the caller should
    /// fire immediately (leading edge); otherwise a trailing fire is armed.
    pub fn on_event(&mut self, now: Instant) -> bool {
        match self.last_fire {
            Some(last) if now.duration_since(last) < self.period => {
                self.trailing = Some(last + self.period);
                false
            }
            _ => {
                self.last_fire = Some(now);
                self.trailing = None;
                true
            }
        }
    }

    /// Deadline of the armed trailing fire, if any.
    pub fn trailing_deadline(&self) -> Option<Instant> {
        self.trailing
    }

    /// Consume the armed trailing fire. Returns `true` if one was armed.
    pub fn fire_trailing(&mut self, now: Instant) -> bool {
        if self.trailing.take().is_some() {
            self.last_fire = Some(now);
            true
        } else {
            false
        }
    }

    /// Disarm any pending trailing fire (shutdown path).
    pub fn cancel(&mut self) {
        self.trailing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(100);

    #[test]
    fn test_first_event_fires_immediately() {
        let mut t = Throttle::new(PERIOD);
        assert!(t.on_event(Instant::now()));
    }

    #[test]
    fn test_burst_defers_to_trailing() {
        let mut t = Throttle::new(PERIOD);
        let t0 = Instant::now();
        assert!(t.on_event(t0));
        // Burst within the period: no leading fires, one armed trailing.
        assert!(!t.on_event(t0 + Duration::from_millis(10)));
        assert!(!t.on_event(t0 + Duration::from_millis(20)));
        assert_eq!(t.trailing_deadline(), Some(t0 + PERIOD));
        // The trailing edge fires exactly once.
        assert!(t.fire_trailing(t0 + PERIOD));
        assert!(!t.fire_trailing(t0 + PERIOD));
    }

    #[test]
    fn test_event_after_period_fires_leading() {
        let mut t = Throttle::new(PERIOD);
        let t0 = Instant::now();
        assert!(t.on_event(t0));
        assert!(t.on_event(t0 + PERIOD));
        assert_eq!(t.trailing_deadline(), None);
    }

    #[test]
    fn test_leading_fire_disarms_trailing() {
        let mut t = Throttle::new(PERIOD);
        let t0 = Instant::now();
        assert!(t.on_event(t0));
        assert!(!t.on_event(t0 + Duration::from_millis(50)));
        assert!(t.trailing_deadline().is_some());
        // Next event lands beyond the period: fires and clears the trailing.
        assert!(t.on_event(t0 + PERIOD + Duration::from_millis(1)));
        assert_eq!(t.trailing_deadline(), None);
    }

    #[test]
    fn test_cancel_disarms() {
        let mut t = Throttle::new(PERIOD);
        let t0 = Instant::now();
        t.on_event(t0);
        t.on_event(t0 + Duration::from_millis(10));
        t.cancel();
        assert_eq!(t.trailing_deadline(), None);
        assert!(!t.fire_trailing(t0 + PERIOD));
    }
}
