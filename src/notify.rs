//! Transient toast notifications.

use std::time::{Duration, Instant};

pub const DISPLAY_DURATION: Duration = Duration::from_millis(3000);
pub const EXIT_TRANSITION: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Visible,
    Leaving,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub text: String,
    pub severity: Severity,
    created_at: Instant,
}

impl Notification {
    pub fn phase(&self, now: Instant) -> Phase {
        if now.saturating_duration_since(self.created_at) < DISPLAY_DURATION {
            Phase::Visible
        } else {
            Phase::Leaving
        }
    }

    fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= DISPLAY_DURATION + EXIT_TRANSITION
    }
}

/// Notifications in creation order. Each one expires on its own clock.
#[derive(Debug, Default)]
pub struct Notifier {
    active: Vec<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, text: impl Into<String>, severity: Severity) {
        self.emit_at(text, severity, Instant::now());
    }

    pub fn emit_at(&mut self, text: impl Into<String>, severity: Severity, now: Instant) {
        let text = text.into();
        tracing::debug!(?severity, %text, "notification");
        self.active.push(Notification {
            text,
            severity,
            created_at: now,
        });
    }

    /// Drops every notification past its exit transition. Returns how many went.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.active.len();
        self.active.retain(|n| !n.expired(now));
        before - self.active.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_phases() {
        let start = Instant::now();
        let mut notifier = Notifier::new();
        notifier.emit_at("saved", Severity::Success, start);

        let toast = notifier.iter().next().unwrap().clone();
        assert_eq!(toast.phase(start + Duration::from_millis(2999)), Phase::Visible);
        assert_eq!(toast.phase(start + Duration::from_millis(3000)), Phase::Leaving);

        assert_eq!(notifier.prune(start + Duration::from_millis(3299)), 0);
        assert_eq!(notifier.prune(start + Duration::from_millis(3300)), 1);
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_independent_expiry() {
        let start = Instant::now();
        let mut notifier = Notifier::new();
        notifier.emit_at("first", Severity::Info, start);
        notifier.emit_at("second", Severity::Error, start + Duration::from_secs(2));

        notifier.prune(start + Duration::from_millis(3400));

        let texts: Vec<&str> = notifier.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["second"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut notifier = Notifier::new();
        notifier.emit("same", Severity::Error);
        notifier.emit("same", Severity::Error);
        assert_eq!(notifier.len(), 2);
    }
}
