#![allow(missing_docs)]

//! Lenient timestamp (de)serialisation.
//!
//! The marketplace API emits naive ISO-8601 datetimes (no offset) while
//! values persisted by this crate carry an explicit offset. Both forms are
//! accepted; naive values are taken as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse an RFC 3339 or naive ISO-8601 timestamp.
pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn accepts_naive_and_offset_forms() {
        let naive = parse("2024-03-05T10:20:30.123456").expect("naive timestamp");
        assert_eq!((naive.year(), naive.month(), naive.day()), (2024, 3, 5));
        assert_eq!(naive.hour(), 10);

        let offset = parse("2024-03-05T12:20:30+02:00").expect("offset timestamp");
        assert_eq!(offset.hour(), 10);

        assert!(parse("yesterday").is_none());
    }
}
