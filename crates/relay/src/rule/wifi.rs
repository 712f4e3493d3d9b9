//! Failed WiFi association handler.
//!
//! Routers log a line like
//!
//! ```text
//! wireless,info 8C:AA:B5:00:11:22@wlan1: disconnected, unicast key exchange timeout, signal strength -70
//! ```
//!
//! when a client fails the WPA handshake, usually a wrong password. The MAC
//! address is the token right before the first `@` and the interface runs
//! from that `@` to the next `:`.

use std::time::SystemTime;

use super::template::{MessageBuffer, append_timestamp};

/// Text identifying a failed association
pub const WIFI_LOGIN_PATTERN: &str = "unicast key exchange timeout";

/// Maximum length kept for each extracted field (bytes)
pub const MAX_FIELD_LEN: usize = 32;

/// Fields extracted from a failed association line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiLoginAttempt<'a> {
    pub mac_address: &'a str,
    pub interface: &'a str,
}

/// Why a line could not be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WifiParseError {
    #[error("no '@' preceded by a mac-address token")]
    MissingMac,
    #[error("no ':' after the interface name")]
    MissingInterface,
}

/// Extracts the MAC address and interface from a log line.
pub fn parse_login_attempt(line: &str) -> Result<WifiLoginAttempt<'_>, WifiParseError> {
    let at = line.find('@').ok_or(WifiParseError::MissingMac)?;

    // the MAC token starts after the last separator before '@'
    let start = line[..at]
        .rfind([' ', '='])
        .filter(|&sep| sep > 0)
        .ok_or(WifiParseError::MissingMac)?
        + 1;

    let rest = &line[at + 1..];
    let end = rest.find(':').ok_or(WifiParseError::MissingInterface)?;

    Ok(WifiLoginAttempt {
        mac_address: cap(&line[start..at]),
        interface: cap(&rest[..end]),
    })
}

/// Builds the notification text for a parsed attempt.
pub fn login_attempt_message(attempt: &WifiLoginAttempt<'_>, timestamp: SystemTime) -> String {
    let mut out = MessageBuffer::new();
    out.push_str("There is someone trying to connect to your WiFi: ");
    out.push_str(attempt.interface);
    out.push_str(", with the mac-address: ");
    out.push_str(attempt.mac_address);
    append_timestamp(&mut out, timestamp);
    out.into_string()
}

fn cap(field: &str) -> &str {
    if field.len() <= MAX_FIELD_LEN {
        return field;
    }
    let mut end = MAX_FIELD_LEN;
    while !field.is_char_boundary(end) {
        end -= 1;
    }
    &field[..end]
}
