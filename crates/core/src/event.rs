//! Log events -- the unit handed from the receiver to the relay.
//!
//! A [`LogEvent`] is one UDP datagram: its text, bounded to
//! [`MAX_EVENT_LEN`] bytes, and the wall-clock instant it was received.
//! Events are moved into and out of the queue by value; no two tasks
//! ever hold the same event.

use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, Local};

/// Maximum datagram payload kept per event (bytes)
pub const MAX_EVENT_LEN: usize = 2048;

/// Timestamp format used in log records and outbound messages
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single received log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// datagram text (at most `MAX_EVENT_LEN` bytes)
    pub text: String,
    /// receipt time
    pub timestamp: SystemTime,
}

impl LogEvent {
    /// Creates an event from text, truncating it to `MAX_EVENT_LEN` bytes
    /// on a character boundary.
    pub fn new(text: impl Into<String>, timestamp: SystemTime) -> Self {
        let mut text = text.into();
        if text.len() > MAX_EVENT_LEN {
            let mut end = MAX_EVENT_LEN;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
        }
        Self { text, timestamp }
    }

    /// Creates an event from a raw datagram.
    ///
    /// The payload is cut at the first NUL byte (senders sometimes pad
    /// with zeros) and at `MAX_EVENT_LEN` bytes; invalid UTF-8 is replaced.
    pub fn from_datagram(payload: &[u8], timestamp: SystemTime) -> Self {
        let payload = &payload[..payload.len().min(MAX_EVENT_LEN)];
        let payload = match payload.iter().position(|&b| b == 0) {
            Some(nul) => &payload[..nul],
            None => payload,
        };
        Self::new(String::from_utf8_lossy(payload), timestamp)
    }

    /// Receipt time formatted as `%Y-%m-%d %H:%M:%S` (local time).
    pub fn formatted_timestamp(&self) -> String {
        format_timestamp(self.timestamp)
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.formatted_timestamp(), self.text)
    }
}

/// Formats a wall-clock instant as `%Y-%m-%d %H:%M:%S` in local time.
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}
