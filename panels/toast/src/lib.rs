//! Toast Panel
//!
//! Shows each [`Notification`] for a fixed time and then drops it. A clock
//! subscription runs only while at least one toast is visible. The panel
//! emits no output; the view reads [`ToastState::toasts`].
//!
//! # Example
//!
//! ```ignore
//! let toasts = builder.install(ToastPanel::new(Duration::from_secs(4)));
//!
//! // forward every notification the key/value panel emits
//! Message::Notified(notification) => {
//!     return toasts.dispatch(ToastMessage::Push(notification)).map(Message::Panel);
//! }
//! ```

use std::convert::Infallible;

use iced::time::{Duration, Instant, every};
use iced::{Subscription, Task};
use keystash::{Notification, Panel};

const TICK: Duration = Duration::from_millis(250);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub notification: Notification,
    pub expires_at: Instant,
}

#[derive(Clone, Debug)]
pub enum ToastMessage {
    /// Show a notification
    Push(Notification),
    /// Close one toast early
    Dismiss(u64),
    /// Clock tick; drops toasts that expired by then
    Tick(Instant),
}

#[derive(Debug, Default)]
pub struct ToastState {
    toasts: Vec<Toast>,
    next_id: u64,
}

impl ToastState {
    /// Visible toasts, oldest first
    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    fn push(&mut self, notification: Notification, ttl: Duration) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.toasts.push(Toast {
            id,
            notification,
            expires_at: Instant::now() + ttl,
        });
        id
    }

    fn dismiss(&mut self, id: u64) {
        self.toasts.retain(|toast| toast.id != id);
    }

    /// Drop every toast due by `now`, returning how many went
    fn expire(&mut self, now: Instant) -> usize {
        let before = self.toasts.len();
        self.toasts.retain(|toast| toast.expires_at > now);
        before - self.toasts.len()
    }
}

#[derive(Clone, Debug)]
pub struct ToastPanel {
    ttl: Duration,
}

impl ToastPanel {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

impl Default for ToastPanel {
    fn default() -> Self {
        Self::new(Duration::from_secs(4))
    }
}

impl Panel for ToastPanel {
    type Message = ToastMessage;
    type State = ToastState;
    type Output = Infallible;

    fn name(&self) -> &'static str {
        "toast"
    }

    fn init(&self) -> (Self::State, Task<Self::Message>) {
        (ToastState::default(), Task::none())
    }

    fn update(
        &self,
        state: &mut Self::State,
        message: Self::Message,
    ) -> (Task<Self::Message>, Option<Self::Output>) {
        match message {
            ToastMessage::Push(notification) => {
                let id = state.push(notification.clone(), self.ttl);
                tracing::debug!(id, level = ?notification.level, text = %notification, "toast shown");
            }
            ToastMessage::Dismiss(id) => state.dismiss(id),
            ToastMessage::Tick(now) => {
                let expired = state.expire(now);
                if expired > 0 {
                    tracing::trace!(expired, "toasts expired");
                }
            }
        }

        (Task::none(), None)
    }

    fn subscription(&self, state: &Self::State) -> Subscription<Self::Message> {
        if state.is_empty() {
            Subscription::none()
        } else {
            every(TICK).map(ToastMessage::Tick)
        }
    }
}
