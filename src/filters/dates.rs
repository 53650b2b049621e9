// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Date formatting for templates.

use std::fs;
use std::path::Path;

use chrono::{
    DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc,
};
use serde_json::Value as JsonValue;

/// Display format used by [`format_date_only`], e.g. `Jan 05, 2024`.
pub const DATE_ONLY_FORMAT: &str = "%b %d, %Y";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Formats a frontmatter or template value as `MMM DD, YYYY` in UTC.
///
/// Falsy values (`null`, `false`, `0`, `""`) give an empty string. Values
/// that cannot be read as a date are returned as their string form.
pub fn format_date_only(value: &JsonValue) -> String {
    if is_falsy(value) {
        return String::new();
    }

    match parse_date(value) {
        Some(date) => date.format(DATE_ONLY_FORMAT).to_string(),
        None => match value {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

/// Reads a date from a JSON value.
///
/// Strings may be RFC 3339, RFC 2822, `YYYY-MM-DD` or a zone-less
/// `YYYY-MM-DDTHH:MM:SS` (taken as UTC). Numbers are Unix epoch milliseconds.
pub fn parse_date(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        JsonValue::String(s) => parse_date_str(s),
        JsonValue::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

/// String form of [`parse_date`].
pub fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(date) = NaiveDateTime::parse_from_str(s, format) {
            return Some(date.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
    }
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

/// Modification time of `path`, if the filesystem reports one.
pub fn modified_time<P: AsRef<Path>>(path: P) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Modification time of `path` as an RFC 3339 UTC string, or an empty
/// string on any filesystem error.
pub fn file_last_modified<P: AsRef<Path>>(path: P) -> String {
    modified_time(path)
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn is_falsy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64().map_or(false, |f| f == 0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => false,
    }
}
