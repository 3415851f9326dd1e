//! Time utilities: wall-clock "now" in the user's timezone, local datetime
//! parsing, and the quiet-hours rule.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::TimeError;

/// First hour of the late-night window in which nothing may start.
pub const QUIET_START_HOUR: u32 = 22;
/// First hour after the late-night window.
pub const QUIET_END_HOUR: u32 = 7;

/// True when `t` falls in the late-night window [22:00, 07:00).
pub fn is_quiet_time(t: NaiveTime) -> bool {
    t.hour() >= QUIET_START_HOUR || t.hour() < QUIET_END_HOUR
}

pub fn parse_timezone(tz: &str) -> Result<Tz, TimeError> {
    tz.parse()
        .map_err(|_| TimeError::InvalidTimezone(tz.to_string()))
}

/// Current wall-clock time in `tz`, without the offset.
pub fn local_now(tz: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&tz).naive_local()
}

/// Parse a user-supplied local deadline.
///
/// Accepts "2026-02-20 23:59", "2026-02-20T23:59" and a bare "2026-02-20",
/// which means the end of that day (23:59).
pub fn parse_local_datetime(local: &str) -> Result<NaiveDateTime, TimeError> {
    let s = local.trim();
    for fmt in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ndt);
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| TimeError::InvalidDateTime {
        input: local.to_string(),
        reason: e.to_string(),
    })?;
    Ok(date.and_time(end_of_day()))
}

/// 23:59:00, the implied time for date-only deadlines.
pub fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
}

/// Serde adapter storing a `NaiveTime` as "HH:MM".
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for lists of "HH:MM" times (used by config tables).
pub mod hhmm_list {
    use chrono::NaiveTime;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(times: &[NaiveTime], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(times.len()))?;
        for t in times {
            seq.serialize_element(&t.format("%H:%M").to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<NaiveTime>, D::Error> {
        let raw = Vec::<String>::deserialize(d)?;
        raw.iter()
            .map(|r| NaiveTime::parse_from_str(r, "%H:%M").map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_window_bounds() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert!(is_quiet_time(t(22, 0)));
        assert!(is_quiet_time(t(6, 59)));
        assert!(is_quiet_time(t(0, 0)));
        assert!(!is_quiet_time(t(7, 0)));
        assert!(!is_quiet_time(t(21, 59)));
    }

    #[test]
    fn test_parse_local_datetime_forms() {
        let expected = NaiveDate::from_ymd_opt(2026, 2, 20)
            .unwrap()
            .and_hms_opt(17, 30, 0)
            .unwrap();
        assert_eq!(parse_local_datetime("2026-02-20 17:30").unwrap(), expected);
        assert_eq!(parse_local_datetime("2026-02-20T17:30").unwrap(), expected);

        let date_only = parse_local_datetime("2026-02-20").unwrap();
        assert_eq!(date_only.time(), end_of_day());

        assert!(parse_local_datetime("Feb 20").is_err());
    }

    #[test]
    fn test_parse_timezone() {
        assert!(parse_timezone("America/Chicago").is_ok());
        assert!(matches!(
            parse_timezone("Mars/Olympus"),
            Err(TimeError::InvalidTimezone(_))
        ));
    }
}
