//! Store-native timestamp representation.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Key under which a timestamp is tagged inside a document.
pub const TIMESTAMP_TAG: &str = "$timestamp";

/// A point in time as the document store keeps it: whole seconds since the
/// Unix epoch plus a nanosecond remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos(),
        }
    }

    /// A plain calendar date becomes midnight UTC of that day.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_datetime(date.and_time(NaiveTime::MIN).and_utc())
    }

    /// Returns `None` if the stored value is outside chrono's range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos)
    }

    /// Encode as a tagged JSON object for storage inside a document.
    pub fn to_value(&self) -> Value {
        json!({ TIMESTAMP_TAG: { "seconds": self.seconds, "nanos": self.nanos } })
    }

    /// Decode a tagged JSON object. Any other value yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let inner = value.as_object()?.get(TIMESTAMP_TAG)?;
        serde_json::from_value(inner.clone()).ok()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_roundtrip_keeps_nanos() {
        let dt = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let ts = Timestamp::from_datetime(dt);
        assert_eq!(ts.seconds, 1_700_000_000);
        assert_eq!(ts.nanos, 123_456_789);
        assert_eq!(ts.to_datetime(), Some(dt));
    }

    #[test]
    fn test_plain_date_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let ts = Timestamp::from_date(date);
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_value_tagging() {
        let ts = Timestamp::new(42, 7);
        let value = ts.to_value();
        assert_eq!(Timestamp::from_value(&value), Some(ts));

        // Untagged values are not timestamps
        assert_eq!(Timestamp::from_value(&json!(42)), None);
        assert_eq!(Timestamp::from_value(&json!({ "seconds": 42, "nanos": 7 })), None);
        assert_eq!(Timestamp::from_value(&json!("2024-01-01")), None);
    }
}
