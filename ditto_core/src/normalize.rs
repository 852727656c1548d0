//! Conversions shared by the services' response normalizers.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::FetchError;

type Result<T> = std::result::Result<T, FetchError>;

pub fn parse_json(body: &str) -> Result<Value> {
    serde_json::from_str(body)
        .map_err(|e| FetchError::unknown_data(format!("response is not json: {e}")))
}

/// Read one raw entry into its typed shape, keeping the raw value for storage.
pub fn typed<T: DeserializeOwned>(value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|e| FetchError::unknown_data(format!("{e} in {value}")))
}

/// The source payload, serialized for the `raw` column.
pub fn raw_json(value: &Value) -> String {
    value.to_string()
}

pub fn parse_unix(s: &str) -> Result<DateTime<Utc>> {
    s.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .ok_or_else(|| FetchError::unknown_data(format!("invalid unix timestamp: {s:?}")))
}

pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| FetchError::unknown_data(format!("invalid timestamp {s:?}: {e}")))
}

/// A zoneless `YYYY-MM-DD HH:MM:SS` read as UTC.
pub fn parse_naive_utc(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|t| t.and_utc())
        .map_err(|e| FetchError::unknown_data(format!("invalid date {s:?}: {e}")))
}

pub fn yes_no(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err(FetchError::unknown_data(format!(
            "expected \"yes\" or \"no\", got {s:?}"
        ))),
    }
}

/// Split a whitespace-delimited tag string, dropping duplicates but keeping order.
pub fn split_tags(s: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in s.split_whitespace() {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Empty strings from an API mean "no value".
pub fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
