//! Tab configuration records
//!
//! A tab describes one farming session: the payout address, the storage
//! directory offered to the network, and the capacity cap.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use uuid::Uuid;

/// Byte-scale unit for the storage capacity cap.
///
/// Rendered verbatim into the worker's `--max_size` argument, so the tokens
/// must match the worker CLI's spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StorageUnit {
    B,
    KB,
    MB,
    GB,
    TB,
}

impl StorageUnit {
    /// All recognized units, smallest first.
    pub const ALL: [StorageUnit; 5] = [
        StorageUnit::B,
        StorageUnit::KB,
        StorageUnit::MB,
        StorageUnit::GB,
        StorageUnit::TB,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageUnit::B => "B",
            StorageUnit::KB => "KB",
            StorageUnit::MB => "MB",
            StorageUnit::GB => "GB",
            StorageUnit::TB => "TB",
        }
    }
}

impl Default for StorageUnit {
    fn default() -> Self {
        StorageUnit::GB
    }
}

impl fmt::Display for StorageUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorageUnit::ALL
            .into_iter()
            .find(|u| u.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unrecognized storage unit: {}", s))
    }
}

/// Storage settings for one tab
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Directory shared with the network
    pub path: PathBuf,
    /// Capacity cap, in `unit` multiples
    #[serde(default)]
    pub size: f64,
    /// Scale unit for `size`
    #[serde(default)]
    pub unit: StorageUnit,
}

/// One configurable farming session.
///
/// Created empty when the user adds a tab; the id is assigned once and never
/// reused, and stays stable while the tab's position in the list shifts.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: Uuid,
    /// Payout account address
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Active-tab marker; exactly one tab carries it in a live controller
    #[serde(default)]
    pub active: bool,
}

impl Tab {
    /// Create an empty tab with a freshly assigned id
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            address: String::new(),
            storage: StorageConfig::default(),
            active: false,
        }
    }
}

impl Default for Tab {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tab_is_empty() {
        let tab = Tab::new();
        assert!(tab.address.is_empty());
        assert_eq!(tab.storage.path, PathBuf::new());
        assert_eq!(tab.storage.size, 0.0);
        assert_eq!(tab.storage.unit, StorageUnit::GB);
        assert!(!tab.active);
    }

    #[test]
    fn test_new_tabs_get_distinct_ids() {
        assert_ne!(Tab::new().id, Tab::new().id);
    }

    #[test]
    fn test_unit_parse_roundtrip() {
        for unit in StorageUnit::ALL {
            assert_eq!(unit.as_str().parse::<StorageUnit>().unwrap(), unit);
        }
        assert_eq!("gb".parse::<StorageUnit>().unwrap(), StorageUnit::GB);
        assert!("XB".parse::<StorageUnit>().is_err());
    }

    #[test]
    fn test_tab_json_roundtrip() {
        let mut tab = Tab::new();
        tab.address = "1FarmerPayoutAddr".to_string();
        tab.storage.path = PathBuf::from("/srv/share");
        tab.storage.size = 2.5;
        tab.storage.unit = StorageUnit::TB;
        tab.active = true;

        let json = serde_json::to_string(&tab).unwrap();
        let back: Tab = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tab);
    }

    #[test]
    fn test_unit_serializes_as_bare_token() {
        let json = serde_json::to_string(&StorageUnit::MB).unwrap();
        assert_eq!(json, "\"MB\"");
    }
}
