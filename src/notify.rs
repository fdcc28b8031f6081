//! Self-expiring feedback for write outcomes.
//!
//! A [`Notifier`] is a single slot: posting overwrites whatever is there and
//! restarts the timer. Nothing is queued.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default time a notification stays visible.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(3);

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time source.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven time source for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn set(&self, to: Duration) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// Outcome class of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
}

/// A message shown to the viewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    posted_at: Duration,
}

/// Single-slot, self-clearing notification channel.
pub struct Notifier {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    slot: Mutex<Option<Notification>>,
}

impl Notifier {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Notifier on the system clock with the default lifetime.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock::new()), DEFAULT_NOTIFICATION_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Replace the current notification and restart its timer.
    pub fn post(&self, kind: NotificationKind, message: impl Into<String>) {
        let notification = Notification {
            kind,
            message: message.into(),
            posted_at: self.clock.now(),
        };
        *self.slot.lock() = Some(notification);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.post(NotificationKind::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.post(NotificationKind::Error, message);
    }

    /// The visible notification, if it has not expired yet.
    pub fn current(&self) -> Option<Notification> {
        let mut slot = self.slot.lock();
        let expired = match slot.as_ref() {
            Some(n) => self.clock.now().saturating_sub(n.posted_at) >= self.ttl,
            None => return None,
        };
        if expired {
            *slot = None;
        }
        slot.clone()
    }

    /// Clear the slot immediately.
    pub fn dismiss(&self) {
        *self.slot.lock() = None;
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("ttl", &self.ttl)
            .field("slot", &*self.slot.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual() -> (Arc<ManualClock>, Notifier) {
        let clock = Arc::new(ManualClock::new());
        let notifier = Notifier::new(clock.clone(), DEFAULT_NOTIFICATION_TTL);
        (clock, notifier)
    }

    #[test]
    fn test_expires_after_ttl() {
        let (clock, notifier) = manual();
        clock.set(Duration::from_secs(10));
        notifier.success("Food offer posted successfully!");

        clock.advance(Duration::from_millis(2999));
        let visible = notifier.current().unwrap();
        assert_eq!(visible.kind, NotificationKind::Success);

        clock.advance(Duration::from_millis(1));
        assert!(notifier.current().is_none());
    }

    #[test]
    fn test_overwrite_restarts_timer() {
        let (clock, notifier) = manual();
        notifier.success("first");
        clock.advance(Duration::from_secs(2));
        notifier.error("second");
        clock.advance(Duration::from_secs(2));

        let visible = notifier.current().unwrap();
        assert_eq!(visible.message, "second");
        assert_eq!(visible.kind, NotificationKind::Error);

        clock.advance(Duration::from_secs(1));
        assert!(notifier.current().is_none());
    }

    #[test]
    fn test_dismiss() {
        let (_clock, notifier) = manual();
        notifier.success("done");
        notifier.dismiss();
        assert!(notifier.current().is_none());
    }
}
