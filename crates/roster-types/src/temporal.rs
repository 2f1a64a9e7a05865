use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A UTC instant with whole-second precision.
///
/// Renders as RFC 3339 with a `Z` suffix, e.g. `2024-05-01T12:00:00Z`.
/// Parsing only accepts that canonical form, so a parsed timestamp always
/// renders back to the exact text it came from.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Build a timestamp, truncating any sub-second part.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(0))
    }

    /// Build a timestamp from seconds since the UNIX epoch.
    pub fn from_unix_secs(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn unix_secs(&self) -> i64 {
        self.0.timestamp()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({self})")
    }
}

impl FromStr for Timestamp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = DateTime::parse_from_rfc3339(s).map_err(|e| TypeError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        let ts = Self::from_datetime(parsed.with_timezone(&Utc));
        if ts.to_string() != s {
            return Err(TypeError::InvalidTimestamp {
                value: s.to_string(),
                reason: "not in canonical UTC second form (YYYY-MM-DDTHH:MM:SSZ)".into(),
            });
        }
        Ok(ts)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Source of server-assigned timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock frozen at one instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_rfc3339_zulu_seconds() {
        let ts = Timestamp::from_unix_secs(1_714_564_800).unwrap();
        assert_eq!(ts.to_string(), "2024-05-01T12:00:00Z");
    }

    #[test]
    fn truncates_subseconds() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T12:00:00.987Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(Timestamp::from_datetime(at).to_string(), "2024-05-01T12:00:00Z");
    }

    #[test]
    fn parse_canonical() {
        let ts: Timestamp = "2024-05-01T12:00:00Z".parse().unwrap();
        assert_eq!(ts.unix_secs(), 1_714_564_800);
    }

    #[test]
    fn parse_rejects_non_canonical_forms() {
        for raw in ["2024-05-01T14:00:00+02:00", "2024-05-01T12:00:00.5Z", "yesterday"] {
            let err = raw.parse::<Timestamp>().unwrap_err();
            assert!(matches!(err, TypeError::InvalidTimestamp { .. }), "{raw}: {err}");
        }
    }

    #[test]
    fn serde_as_string() {
        let ts = Timestamp::from_unix_secs(0).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"1970-01-01T00:00:00Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn fixed_clock_is_frozen() {
        let ts = Timestamp::from_unix_secs(42).unwrap();
        let clock = FixedClock(ts);
        assert_eq!(clock.now(), ts);
        assert_eq!(clock.now(), ts);
    }

    #[test]
    fn system_clock_has_no_subseconds() {
        let now = SystemClock.now();
        assert_eq!(now.as_datetime().timestamp_subsec_nanos(), 0);
    }
}
