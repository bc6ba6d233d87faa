//! Notification dispatch.
//!
//! The scheduler treats every sink as fire-and-forget: `dispatch` returns
//! nothing and delivery is never confirmed.

use std::sync::mpsc::Sender;

use tracing::{debug, info};

use crate::models::{Notification, Severity};

pub trait NotificationSink {
    fn dispatch(&self, title: &str, message: &str, severity: Severity, duration_ms: u64);
}

/// Forwards notifications over a channel (TUI banner, tests).
pub struct ChannelSink {
    tx: Sender<Notification>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Notification>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for ChannelSink {
    fn dispatch(&self, title: &str, message: &str, severity: Severity, duration_ms: u64) {
        let notification = Notification {
            title: title.to_owned(),
            message: message.to_owned(),
            severity,
            duration_ms,
        };
        if self.tx.send(notification).is_err() {
            debug!("notification receiver closed, dropping '{title}'");
        }
    }
}

/// Prints one line per notification on stdout.
pub struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn dispatch(&self, title: &str, message: &str, severity: Severity, _duration_ms: u64) {
        println!("[{}] {}: {}", severity.label(), title, message);
    }
}

/// Emits notifications as tracing events only.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn dispatch(&self, title: &str, message: &str, severity: Severity, duration_ms: u64) {
        info!(severity = severity.label(), duration_ms, "{title}: {message}");
    }
}
