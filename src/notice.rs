use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::Timestamp;

pub const DEFAULT_NOTICE_TTL_SECS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub expires_at: Timestamp,
}

/// Transient messages that disappear on their own after `ttl`.
#[derive(Debug, Clone)]
pub struct Notices {
    ttl: Duration,
    items: Vec<Notice>,
}

impl Default for Notices {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_NOTICE_TTL_SECS))
    }
}

impl Notices {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>, at: Timestamp) {
        self.items.retain(|notice| notice.expires_at > at);
        self.items.push(Notice {
            kind,
            message: message.into(),
            expires_at: at.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        });
    }

    /// Notices still visible at `now`, oldest first.
    pub fn active(&self, now: Timestamp) -> Vec<Notice> {
        self.items
            .iter()
            .filter(|notice| notice.expires_at > now)
            .cloned()
            .collect()
    }

    pub fn dismiss_all(&mut self) {
        self.items.clear();
    }
}
