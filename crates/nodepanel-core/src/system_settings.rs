//! Validation for persisted panel settings.

use std::str::FromStr;

use chrono_tz::Tz;
use url::{Host, Url};

use crate::error::{Error, Result};

pub const KEY_SUBSCRIPTION_BASE_URL: &str = "subscription_base_url";
pub const KEY_TIMEZONE: &str = "timezone";

/// Validate a subscription base URL of the form `http(s)://<ip>:<port>`.
///
/// Paths, queries, fragments and user-info are rejected. Empty input clears
/// the setting. Returns the normalized URL without a trailing slash.
pub fn validate_subscription_base_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(String::new());
    }
    let invalid = |why: &str| Error::validation(format!("subscription_base_url {why}"));

    let url = Url::parse(raw).map_err(|_| invalid("must be a valid URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("must use http or https"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("must not contain user info"));
    }
    if !matches!(url.host(), Some(Host::Ipv4(_) | Host::Ipv6(_))) {
        return Err(invalid("host must be an IP address"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not contain a query or fragment"));
    }
    if !matches!(url.path(), "" | "/") {
        return Err(invalid("must not contain a path"));
    }

    // The parser drops default ports, so check the raw authority for one.
    let authority = raw
        .split_once("://")
        .map_or(raw, |(_, rest)| rest)
        .trim_end_matches('/');
    let has_port = authority
        .rsplit_once(':')
        .is_some_and(|(host, port)| {
            !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (!host.contains(':') || host.ends_with(']'))
        });
    if !has_port {
        return Err(invalid("must include a port"));
    }

    Ok(format!("{}://{}", url.scheme(), authority))
}

/// Resolve an IANA zone name; empty means UTC.
pub fn validate_timezone(raw: &str) -> Result<Tz> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Tz::UTC);
    }
    Tz::from_str(raw).map_err(|_| Error::validation(format!("invalid timezone {raw:?}")))
}
