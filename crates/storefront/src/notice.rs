//! User-facing notices.
//!
//! Managers report the outcome of shopper actions ("Item added to cart!")
//! on a broadcast channel. Front ends subscribe and render them however
//! they like; nothing is lost if nobody is listening.

use std::fmt;

use tokio::sync::broadcast;

/// Buffered notices per subscriber before the oldest are dropped.
const NOTICE_CAPACITY: usize = 64;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// One toast-style message for the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

/// Shared sender for notices. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTICE_CAPACITY);
        Self { sender }
    }

    /// Receive every notice sent after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    pub fn send(&self, notice: Notice) {
        // No subscribers is fine
        let _ = self.sender.send(notice);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(Notice::success(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(Notice::error(message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(Notice::info(message));
    }
}

/// Drain every notice already queued on `receiver`.
///
/// Skips over any notices lost to lag.
pub fn drain(receiver: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(notice) => notices.push(notice),
            Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            Err(_) => return notices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_reach_subscribers_in_order() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        notifier.success("Item added to cart!");
        notifier.error("Failed to add item to cart");

        assert_eq!(
            drain(&mut rx),
            vec![
                Notice::success("Item added to cart!"),
                Notice::error("Failed to add item to cart"),
            ]
        );
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_send_without_subscribers_is_silent() {
        Notifier::new().info("nobody listening");
    }

    #[test]
    fn test_display() {
        assert_eq!(Notice::success("Cart cleared").to_string(), "[ok] Cart cleared");
    }
}
