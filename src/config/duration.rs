//! Duration values in configuration files.
//!
//! Accepts either an integer number of milliseconds (`250`) or a string with
//! units (`"250ms"`, `"2s"`, `"1m30s"`, `"1.5s"`). Negative values are
//! rejected while parsing. Serializes back as integer milliseconds.

use std::fmt;
use std::time::Duration;

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(DurationVisitor)
}

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    serializer.serialize_u64(millis)
}

struct DurationVisitor;

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("milliseconds as an integer or a duration string such as \"2s\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
        Ok(Duration::from_millis(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
        u64::try_from(v)
            .map(Duration::from_millis)
            .map_err(|_| E::custom(format!("duration must not be negative (got {v}ms)")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        parse_duration(v).map_err(E::custom)
    }
}

/// Parse a duration string made of one or more `<number><unit>` segments.
///
/// A bare number is read as milliseconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err(format!("Duration must not be negative: '{}'", s));
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        let millis: u64 = s
            .parse()
            .map_err(|_| format!("Invalid duration number '{}'", s))?;
        return Ok(Duration::from_millis(millis));
    }

    let mut total_nanos: u64 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (num_str, tail) = rest.split_at(num_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let nanos_per_unit: u64 = match unit.trim() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "sec" | "secs" => 1_000_000_000,
            "m" | "min" | "mins" => 60 * 1_000_000_000,
            "h" | "hr" | "hrs" => 3600 * 1_000_000_000,
            "" => return Err(format!("Missing unit after '{}' in '{}'", num_str, s)),
            other => return Err(format!("Invalid duration unit '{}' in '{}'", other, s)),
        };

        let nanos = if num_str.contains('.') {
            let num: f64 = num_str
                .parse()
                .map_err(|_| format!("Invalid duration number '{}' in '{}'", num_str, s))?;
            let nanos = (num * nanos_per_unit as f64).round();
            if !nanos.is_finite() || nanos >= u64::MAX as f64 {
                return Err(format!("Duration '{}' is too large", s));
            }
            nanos as u64
        } else {
            let num: u64 = num_str
                .parse()
                .map_err(|_| format!("Invalid duration number '{}' in '{}'", num_str, s))?;
            num.checked_mul(nanos_per_unit)
                .ok_or_else(|| format!("Duration '{}' is too large", s))?
        };

        total_nanos = total_nanos
            .checked_add(nanos)
            .ok_or_else(|| format!("Duration '{}' is too large", s))?;
        rest = tail;
    }

    Ok(Duration::from_nanos(total_nanos))
}
