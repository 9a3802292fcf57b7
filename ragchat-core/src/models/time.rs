//! Protobuf-style timestamps as emitted by the gateway

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{seconds, nanos}` timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    #[serde(default)]
    pub seconds: i64,
    #[serde(default)]
    pub nanos: i32,
}

impl Timestamp {
    /// Convert to a UTC datetime, `None` when out of range
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos.max(0) as u32)
    }

    /// Human-readable form used by list views
    pub fn display(&self) -> String {
        self.to_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_datetime() {
        let ts = Timestamp {
            seconds: 1_700_000_000,
            nanos: 0,
        };
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(ts.display(), "2023-11-14 22:13");
    }

    #[test]
    fn test_missing_fields_default_to_epoch() {
        let ts: Timestamp = serde_json::from_str("{}").unwrap();
        assert_eq!(ts, Timestamp::default());
    }
}
