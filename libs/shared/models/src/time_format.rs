//! Serde helpers for wall-clock times written as `"HH:MM"`.

use chrono::{NaiveTime, Timelike};
use serde::{de, Deserialize, Deserializer, Serializer};

pub const HHMM: &str = "%H:%M";

/// Parses `"HH:MM"`, also accepting the `"HH:MM:SS"` form Postgres `time`
/// columns produce. Seconds are dropped: every time in the system has minute
/// precision, so `"10:00:30"` and `"10:00"` name the same slot.
pub fn parse_hhmm(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, HHMM)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
        .and_then(|time| time.with_second(0))
}

pub fn format_hhmm(time: &NaiveTime) -> String {
    time.format(HHMM).to_string()
}

pub mod hhmm {
    use super::*;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_hhmm(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_hhmm(&raw).ok_or_else(|| de::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
    }
}

pub mod hhmm_vec {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<S: Serializer>(times: &[NaiveTime], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(times.len()))?;
        for time in times {
            seq.serialize_element(&format_hhmm(time))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<NaiveTime>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|value| {
                parse_hhmm(value)
                    .ok_or_else(|| de::Error::custom(format!("invalid time '{}', expected HH:MM", value)))
            })
            .collect()
    }
}
