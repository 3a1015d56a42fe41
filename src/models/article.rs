//! Feed article and calendar month key.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A starred article as returned by the remote feed.
///
/// The feed returns more fields than this; only `published` matters to
/// the index, the rest is carried for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Remote entry ID
    pub id: u64,

    /// Article title
    #[serde(default)]
    pub title: Option<String>,

    /// Article URL
    #[serde(default)]
    pub url: Option<String>,

    /// Publication timestamp
    pub published: DateTime<Utc>,
}

impl Article {
    /// The calendar month this article belongs to.
    pub fn month_key(&self) -> MonthKey {
        MonthKey::from_datetime(&self.published)
    }
}

/// A calendar month, the identity of one index entry.
///
/// Ordered chronologically (field order matters for the derive).
/// Serialized as `"YYYY-MM"` so it can key a JSON map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month), "month out of range: {month}");
        Self { year, month }
    }

    /// The month a timestamp falls into (proleptic Gregorian, UTC).
    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    /// The preceding calendar month.
    pub fn pred(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid month key: {s}"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid year in month key: {s}"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid month in month key: {s}"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in key: {s}"));
        }
        Ok(Self { year, month })
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_key_ordering_is_chronological() {
        let jan_2024 = MonthKey::new(2024, 1);
        let dec_2023 = MonthKey::new(2023, 12);
        let mar_2024 = MonthKey::new(2024, 3);

        assert!(dec_2023 < jan_2024);
        assert!(jan_2024 < mar_2024);
    }

    #[test]
    fn test_month_key_pred() {
        assert_eq!(MonthKey::new(2024, 3).pred(), MonthKey::new(2024, 2));
        assert_eq!(MonthKey::new(2024, 1).pred(), MonthKey::new(2023, 12));
    }

    #[test]
    fn test_month_key_roundtrip() {
        let key = MonthKey::new(2019, 3);
        assert_eq!(key.to_string(), "2019-03");
        assert_eq!("2019-03".parse::<MonthKey>().unwrap(), key);
    }

    #[test]
    fn test_month_key_rejects_garbage() {
        assert!("2019".parse::<MonthKey>().is_err());
        assert!("2019-13".parse::<MonthKey>().is_err());
        assert!("abcd-01".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_month_key_as_json_map_key() {
        use std::collections::BTreeMap;

        let mut map = BTreeMap::new();
        map.insert(MonthKey::new(2024, 2), 7u32);

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"2024-02":7}"#);

        let back: BTreeMap<MonthKey, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_article_month_key() {
        let article = Article {
            id: 1,
            title: None,
            url: None,
            published: Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap(),
        };
        assert_eq!(article.month_key(), MonthKey::new(2024, 3));
    }
}
