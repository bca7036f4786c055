//! Operator notices: short status lines that expire after a fixed interval.

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A single status line shown to the operator after a bed-count update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub success: bool,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.success {
            write!(f, "[ok] {}", self.message)
        } else {
            write!(f, "[!!] {}", self.message)
        }
    }
}

#[derive(Debug)]
struct PostedNotice {
    notice: Notice,
    posted_at: Instant,
}

/// Holds the most recent notice and drops it once its TTL elapses.
///
/// Posting replaces any previous notice immediately; expiry happens on the
/// read side, so no timer task is needed.
#[derive(Debug)]
pub struct NoticeBoard {
    current: ArcSwapOption<PostedNotice>,
    ttl: Duration,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            ttl,
        }
    }

    pub fn post(&self, notice: Notice) {
        self.current.store(Some(Arc::new(PostedNotice {
            notice,
            posted_at: Instant::now(),
        })));
    }

    /// The live notice, or `None` once the TTL has elapsed.
    pub fn current(&self) -> Option<Notice> {
        let posted = self.current.load_full()?;
        if posted.posted_at.elapsed() >= self.ttl {
            self.current.store(None);
            return None;
        }
        Some(posted.notice.clone())
    }

    pub fn clear(&self) {
        self.current.store(None);
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(Duration::from_millis(3_000))
    }
}
