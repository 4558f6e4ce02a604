//! Payload timestamp parsing and formatting.
//!
//! Payloads spell timestamps as `2020-10-10 19:35:24 +0000`. Some producers
//! add fractional seconds and some drop the zone; zone-less values are read
//! as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

use crate::error::{Result, SymtreeError};

const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S%.f %z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];
// `%.f` prints nothing for whole seconds.
const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

/// Parse a payload timestamp.
///
/// ## Errors
///
/// Returns [`SymtreeError::InvalidTimestamp`] when no accepted format matches.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>>
{
    let text = text.trim();

    for format in ZONED_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(text, format) {
            return Ok(parsed.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(parsed.and_utc());
        }
    }

    Err(SymtreeError::InvalidTimestamp(text.to_string()))
}

/// Format a timestamp the way payloads spell it.
///
/// Fractional seconds are only written when present.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String
{
    timestamp.format(OUTPUT_FORMAT).to_string()
}

pub(crate) fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(timestamp))
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_zoned()
    {
        let parsed = parse_timestamp("2020-10-10 19:35:24 +0000").unwrap();
        assert_eq!(parsed.timestamp(), 1_602_358_524);
    }

    #[test]
    fn test_zoned_with_offset()
    {
        let parsed = parse_timestamp("2020-10-10 21:35:24 +0200").unwrap();
        assert_eq!(parsed.timestamp(), 1_602_358_524);
    }

    #[test]
    fn test_fractional_seconds()
    {
        let parsed = parse_timestamp("2020-10-10 19:35:24.250 +0000").unwrap();
        assert_eq!(parsed.timestamp(), 1_602_358_524);
        assert_eq!(parsed.timestamp_subsec_millis(), 250);
        assert_eq!(format_timestamp(&parsed), "2020-10-10 19:35:24.250 +0000");
    }

    #[test]
    fn test_zone_less_is_utc()
    {
        let parsed = parse_timestamp("2022-03-07 07:30:54").unwrap();
        assert_eq!(format_timestamp(&parsed), "2022-03-07 07:30:54 +0000");
    }

    #[test]
    fn test_rejects_garbage()
    {
        assert!(matches!(
            parse_timestamp("10/10/2020"),
            Err(SymtreeError::InvalidTimestamp(_))
        ));
    }
}
