//! Idle/active transition tracking for watch mode.
//!
//! Reports a transition the first time it sees the session and then only
//! when the session crosses the idle threshold in either direction.

use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::domain::Activity;
use crate::monitor::classify;

/// A change in session activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Previous activity, `None` on the first observation.
    pub from: Option<Activity>,
    pub to: Activity,
    /// Idle time that triggered the change.
    pub idle_time: Duration,
}

/// One watch-mode line, e.g. `[IDLE] idle_time=61.0s`.
impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] idle_time={:.1}s",
            self.to.as_str().to_uppercase(),
            self.idle_time.as_secs_f64()
        )
    }
}

/// Transition state machine.
#[derive(Debug)]
pub struct IdleTracker {
    threshold: Duration,
    current: Option<Activity>,
}

impl IdleTracker {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            current: None,
        }
    }

    pub fn current(&self) -> Option<Activity> {
        self.current
    }

    /// Record an idle time reading; returns a transition if activity changed.
    pub fn observe(&mut self, idle_time: Duration) -> Option<Transition> {
        let activity = classify(idle_time, self.threshold);

        if self.current == Some(activity) {
            debug!("Still {} (idle {:?})", activity, idle_time);
            return None;
        }

        let from = self.current.replace(activity);
        debug!("Activity changed: {:?} -> {}", from, activity);
        Some(Transition {
            from,
            to: activity,
            idle_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_secs(60);

    #[test]
    fn test_first_observation_reports() {
        let mut tracker = IdleTracker::new(THRESHOLD);
        assert!(tracker.current().is_none());

        let t = tracker
            .observe(Duration::from_secs(3))
            .expect("first reading should report");
        assert_eq!(t.from, None);
        assert_eq!(t.to, Activity::Active);
        assert_eq!(tracker.current(), Some(Activity::Active));
    }

    #[test]
    fn test_no_transition_while_unchanged() {
        let mut tracker = IdleTracker::new(THRESHOLD);
        tracker.observe(Duration::from_secs(1));

        assert!(tracker.observe(Duration::from_secs(10)).is_none());
        assert!(tracker.observe(THRESHOLD).is_none());
    }

    #[test]
    fn test_idle_then_active_sequence() {
        let mut tracker = IdleTracker::new(THRESHOLD);
        tracker.observe(Duration::from_secs(1));

        let idle = tracker.observe(Duration::from_secs(61)).unwrap();
        assert_eq!(idle.from, Some(Activity::Active));
        assert_eq!(idle.to, Activity::Idle);
        assert_eq!(idle.idle_time, Duration::from_secs(61));

        assert!(tracker.observe(Duration::from_secs(90)).is_none());

        let active = tracker.observe(Duration::ZERO).unwrap();
        assert_eq!(active.from, Some(Activity::Idle));
        assert_eq!(active.to, Activity::Active);
    }

    #[test]
    fn test_first_observation_idle() {
        let mut tracker = IdleTracker::new(THRESHOLD);
        let t = tracker.observe(Duration::from_secs(600)).unwrap();
        assert_eq!(t.from, None);
        assert_eq!(t.to, Activity::Idle);
    }

    #[test]
    fn test_transition_display() {
        let mut tracker = IdleTracker::new(THRESHOLD);
        let idle = tracker.observe(Duration::from_millis(61_400)).unwrap();
        assert_eq!(idle.to_string(), "[IDLE] idle_time=61.4s");

        let active = tracker.observe(Duration::from_secs(2)).unwrap();
        assert_eq!(active.to_string(), "[ACTIVE] idle_time=2.0s");
    }
}
