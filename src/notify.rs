//! User-facing operation outcomes
//!
//! Panels report the outcome of an operation through a [`Notifier`]. The
//! presenter on the other side decides how long a message stays visible; the
//! reporting side never waits on it.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    Success,
    Error,
}

/// A transient message describing how an operation went
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Sink for operation outcomes. Fire-and-forget.
pub trait Notifier {
    fn notify_success(&mut self, message: String);
    fn notify_error(&mut self, message: String);
}

/// Keeps every notification, oldest first
impl Notifier for Vec<Notification> {
    fn notify_success(&mut self, message: String) {
        self.push(Notification::success(message));
    }

    fn notify_error(&mut self, message: String) {
        self.push(Notification::error(message));
    }
}

/// Keeps only the latest notification
impl Notifier for Option<Notification> {
    fn notify_success(&mut self, message: String) {
        *self = Some(Notification::success(message));
    }

    fn notify_error(&mut self, message: String) {
        *self = Some(Notification::error(message));
    }
}
