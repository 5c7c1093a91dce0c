//! Captured credential records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reserved key holding the capture timestamp (RFC 3339).
pub const TIMESTAMP_KEY: &str = "_etime";

/// A single captured credential attempt: string fields keyed by name.
///
/// Keys are kept sorted so serialized records are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapturedRecord {
    fields: BTreeMap<String, String>,
}

impl CapturedRecord {
    /// Create a record stamped with the current time.
    pub fn new() -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(
            TIMESTAMP_KEY.to_string(),
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        );
        Self { fields }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.get(TIMESTAMP_KEY)
    }

    /// Iterate fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compact JSON object, one record per delivery unit.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CapturedRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
