//! Traffic query windows and timeseries buckets.

use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
pub const MIN_WINDOW: Duration = Duration::from_secs(60);
pub const MAX_WINDOW: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Parse a user-supplied window.
///
/// Empty means 24h, `all` means all time (zero), `<n>d` is n days, anything
/// else is a humantime duration (`90m`, `12h`, `1h30m`). Windows under a minute
/// are rejected and windows over 90 days are clamped.
pub fn parse_window(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(DEFAULT_WINDOW);
    }
    if raw.eq_ignore_ascii_case("all") {
        return Ok(Duration::ZERO);
    }

    let window = match raw.strip_suffix('d').and_then(|n| n.parse::<u64>().ok()) {
        Some(days) => Duration::from_secs(days.saturating_mul(24 * 60 * 60)),
        None => humantime::parse_duration(raw)
            .map_err(|_| Error::validation(format!("invalid window {raw:?}")))?,
    };

    if window < MIN_WINDOW {
        return Err(Error::validation("window must be at least 1m"));
    }
    Ok(window.min(MAX_WINDOW))
}

/// Timeseries bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Minute,
    Hour,
    Day,
}

impl Bucket {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "minute" => Ok(Self::Minute),
            "" | "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            other => Err(Error::validation(format!("invalid bucket {other:?}"))),
        }
    }

    pub const fn seconds(self) -> i64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
        }
    }
}
