//! User-facing notifications.
//!
//! The pipeline reports outcomes as [`Notification`]s; a front end shows
//! them through a [`Toast`], which auto-dismisses after a fixed duration.

use serde::Serialize;
use std::time::{Duration, Instant};

/// How long a toast stays visible.
pub const TOAST_DURATION: Duration = Duration::from_secs(3);

pub const MSG_EMPTY_INPUT: &str = "Please enter a URL or text";
pub const MSG_RENDER_FAILED: &str = "Error creating the code. Check the link and try again.";
pub const MSG_OUTPUT_MISSING: &str = "Error creating the code.";
pub const MSG_DOWNLOADED: &str = "File downloaded successfully! ✓";
pub const MSG_DOWNLOAD_FAILED: &str = "Download failed. Try again.";
pub const MSG_COPIED: &str = "Image copied to clipboard!";
pub const MSG_CLIPBOARD_UNSUPPORTED: &str =
    "This environment can't copy images. Use download instead.";
pub const MSG_LIBRARY_UNAVAILABLE: &str = "Failed to load the QR library. Please restart.";

/// A message for the notification surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub success: bool,
}

impl Notification {
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

/// Single-slot toast with an auto-dismiss deadline.
///
/// Showing a new message while one is visible replaces it and restarts the
/// dismiss timer.
#[derive(Debug, Clone)]
pub struct Toast {
    duration: Duration,
    current: Option<(Notification, Instant)>,
}

impl Default for Toast {
    fn default() -> Self {
        Self::new(TOAST_DURATION)
    }
}

impl Toast {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            current: None,
        }
    }

    /// Show `notification` as of `now`.
    pub fn show(&mut self, notification: Notification, now: Instant) {
        self.current = Some((notification, now + self.duration));
    }

    /// The visible notification at `now`, if any.
    pub fn visible(&self, now: Instant) -> Option<&Notification> {
        self.current
            .as_ref()
            .filter(|(_, until)| now < *until)
            .map(|(n, _)| n)
    }

    /// When the current toast will hide.
    pub fn dismiss_at(&self) -> Option<Instant> {
        self.current.as_ref().map(|(_, until)| *until)
    }

    /// Drop an expired toast. Returns `true` if one was removed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.current.as_ref().is_some_and(|(_, until)| now >= *until) {
            self.current = None;
            return true;
        }
        false
    }
}
