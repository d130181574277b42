//! Reply notifications.
//!
//! Constructed once at startup and shared through `App`.

use std::io::{Write, stdout};

use log::debug;

pub trait Notifier: Send + Sync {
    /// A character reply has arrived.
    fn reply_received(&self, sender: &str);
}

/// Rings the terminal bell.
pub struct BellNotifier;

impl Notifier for BellNotifier {
    fn reply_received(&self, sender: &str) {
        debug!("Notifying reply from {sender}");
        let mut out = stdout();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    }
}

pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn reply_received(&self, _sender: &str) {}
}
