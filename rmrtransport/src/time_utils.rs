//! HH:MM:SS formatting for positions and durations.
//!
//! State variables and control-point seek targets use the `HH:MM:SS` form;
//! internally everything is a [`Duration`].

use std::time::Duration;

use crate::error::TransportError;

/// Formats a duration as `HH:MM:SS`, truncating sub-second precision.
///
/// # Examples
/// ```
/// # use std::time::Duration;
/// # use rmrtransport::time_utils::format_hhmmss;
/// assert_eq!(format_hhmmss(Duration::ZERO), "00:00:00");
/// assert_eq!(format_hhmmss(Duration::from_secs(61)), "00:01:01");
/// assert_eq!(format_hhmmss(Duration::from_secs(3661)), "01:01:01");
/// ```
pub fn format_hhmmss(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Parses `HH:MM:SS`, `MM:SS`, or plain seconds into a duration.
///
/// # Examples
/// ```
/// # use std::time::Duration;
/// # use rmrtransport::time_utils::parse_hhmmss;
/// assert_eq!(parse_hhmmss("01:02:03").unwrap(), Duration::from_secs(3723));
/// assert_eq!(parse_hhmmss("02:03").unwrap(), Duration::from_secs(123));
/// assert_eq!(parse_hhmmss("42").unwrap(), Duration::from_secs(42));
/// assert!(parse_hhmmss("1:2:3:4").is_err());
/// ```
pub fn parse_hhmmss(input: &str) -> Result<Duration, TransportError> {
    let parts: Vec<&str> = input.split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(TransportError::IllegalSeekTarget);
    }
    let mut total: u64 = 0;
    for part in parts {
        let value: u64 = part
            .trim()
            .parse()
            .map_err(|_| TransportError::IllegalSeekTarget)?;
        total = total
            .checked_mul(60)
            .and_then(|t| t.checked_add(value))
            .ok_or(TransportError::IllegalSeekTarget)?;
    }
    Ok(Duration::from_secs(total))
}
