//! Dictionary (reference data) models
//!
//! Dictionaries are backend-provided enumerated lookup tables (categories,
//! cities, vehicle makes, ...) used to populate selection controls. Entry
//! names arrive already localized for the active `lang`, which is why cached
//! entries must be dropped wholesale when the display locale changes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dictionary types understood by the backend.
///
/// `Model` entries are scoped to a parent make (`Marka`); the parent id is
/// part of the cache key, so switching makes never reuses stale models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictionaryType {
    Category,
    City,
    Marka,
    Model,
    Transmission,
    Fuel,
    Color,
}

impl DictionaryType {
    /// Wire name used in the `type` query parameter and in cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            DictionaryType::Category => "CATEGORY",
            DictionaryType::City => "CITY",
            DictionaryType::Marka => "MARKA",
            DictionaryType::Model => "MODEL",
            DictionaryType::Transmission => "TRANSMISSION",
            DictionaryType::Fuel => "FUEL",
            DictionaryType::Color => "COLOR",
        }
    }
}

impl fmt::Display for DictionaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DictionaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CATEGORY" => Ok(DictionaryType::Category),
            "CITY" => Ok(DictionaryType::City),
            "MARKA" => Ok(DictionaryType::Marka),
            "MODEL" => Ok(DictionaryType::Model),
            "TRANSMISSION" => Ok(DictionaryType::Transmission),
            "FUEL" => Ok(DictionaryType::Fuel),
            "COLOR" => Ok(DictionaryType::Color),
            other => Err(format!("unknown dictionary type: {}", other)),
        }
    }
}

/// Single dictionary entry as returned by `GET /dictionaries`.
///
/// Order of entries is significant (the backend sorts by display order)
/// and is preserved as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryItem {
    pub id: i64,
    /// Localized display name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
}

/// Durable cache entry for one dictionary key.
///
/// Persisted as `{"data": [...], "timestamp": <epoch millis>}` under the
/// `dict_<TYPE>[_<parent_id>]` storage key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDictionary {
    pub data: Vec<DictionaryItem>,
    /// Fetch time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl CachedDictionary {
    /// Whether this entry may be served without a network call.
    ///
    /// An entry is fresh while it is younger than `ttl_millis` AND
    /// non-empty. Empty results are deliberately never fresh, so a
    /// transient empty response cannot poison the cache for a full TTL.
    pub fn is_fresh(&self, now_millis: i64, ttl_millis: i64) -> bool {
        !self.data.is_empty() && now_millis.saturating_sub(self.timestamp) < ttl_millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, name: &str) -> DictionaryItem {
        DictionaryItem {
            id,
            name: name.to_string(),
            code: None,
            parent_id: None,
            icon: None,
            color: None,
            display_order: None,
        }
    }

    #[test]
    fn test_type_round_trip() {
        for ty in [
            DictionaryType::Category,
            DictionaryType::City,
            DictionaryType::Marka,
            DictionaryType::Model,
            DictionaryType::Transmission,
            DictionaryType::Fuel,
            DictionaryType::Color,
        ] {
            assert_eq!(ty.as_str().parse::<DictionaryType>().unwrap(), ty);
        }
        assert!("ENGINE".parse::<DictionaryType>().is_err());
    }

    #[test]
    fn test_freshness_requires_recent_and_non_empty() {
        let ttl = 3_600_000;
        let entry = CachedDictionary {
            data: vec![item(1, "Эконом")],
            timestamp: 1_000_000,
        };
        // 59 minutes old
        assert!(entry.is_fresh(1_000_000 + 59 * 60 * 1000, ttl));
        // 61 minutes old
        assert!(!entry.is_fresh(1_000_000 + 61 * 60 * 1000, ttl));
    }

    #[test]
    fn test_empty_entry_is_never_fresh() {
        let entry = CachedDictionary {
            data: vec![],
            timestamp: 1_000_000,
        };
        assert!(!entry.is_fresh(1_000_001, 3_600_000));
    }

    #[test]
    fn test_persisted_shape() {
        let entry = CachedDictionary {
            data: vec![item(3, "Алматы")],
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);
        assert_eq!(json["data"][0]["id"], 3);
        // Optional fields are omitted, not serialized as null
        assert!(json["data"][0].get("icon").is_none());
    }
}
