//! Snapshot documents persisted outside the live store

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::value::SettingValue;

/// Schema version of the local durability file.
pub const LOCAL_SNAPSHOT_VERSION: u32 = 1;

/// Every included key of the live store, keyed by full namespaced key.
///
/// Written to the local durability file as
/// `{ "version": 1, "values": { "<key>": { "type": ..., "value": ... } } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSnapshot {
    pub version: u32,
    pub values: BTreeMap<String, SettingValue>,
}

impl LocalSnapshot {
    pub const fn new(values: BTreeMap<String, SettingValue>) -> Self {
        Self {
            version: LOCAL_SNAPSHOT_VERSION,
            values,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a durability file.
    ///
    /// Returns `None` for malformed JSON or a version mismatch. Individual
    /// entries whose value does not match their type tag are dropped.
    pub fn parse(raw: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct RawSnapshot {
            version: u32,
            values: BTreeMap<String, serde_json::Value>,
        }

        let parsed: RawSnapshot = serde_json::from_str(raw).ok()?;
        if parsed.version != LOCAL_SNAPSHOT_VERSION {
            return None;
        }

        let values = parsed
            .values
            .into_iter()
            .filter_map(|(key, item)| {
                let value = serde_json::from_value::<SettingValue>(item).ok()?;
                Some((key, value))
            })
            .collect();
        Some(Self::new(values))
    }
}

/// One scope's settings as mirrored in the cloud store, keyed by setting key.
///
/// Serialized as `{ "updatedAt": <epoch ms>, "values": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSnapshot {
    pub updated_at: i64,
    pub values: BTreeMap<String, SettingValue>,
}

impl ScopeSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a cloud record; any malformed entry rejects the whole record.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}
