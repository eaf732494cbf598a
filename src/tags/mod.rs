//! Workload tag parsing for resource filtering.
//!
//! Tags scope AWS resource discovery during experiments. An empty tag list
//! means "consider all resources", not "match nothing".

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::TagError;

/// One key=value workload tag.
///
/// Serializes as a single-entry map (`{"Environment": "prod"}`), matching the
/// shape resource-discovery tooling expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadTag {
    pub key: String,
    pub value: String,
}

impl Serialize for WorkloadTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.value)?;
        map.end()
    }
}

/// Parse a tag string into workload tags.
///
/// Accepts comma-separated or whitespace-separated pairs with `=` or `:` as
/// the key/value separator:
/// `"Environment=prod,Application=retail-store"`,
/// `"Environment=prod Application=retail-store"`,
/// `"Environment:prod,Application:retail-store"`.
///
/// A pair without a separator, or with an empty key or value, is a format
/// error naming the offending pair.
pub fn parse_tags_string(tags_string: &str) -> Result<Vec<WorkloadTag>, TagError> {
    if tags_string.trim().is_empty() {
        return Ok(Vec::new());
    }

    let pairs: Vec<&str> = if tags_string.contains(',') {
        tags_string.split(',').map(str::trim).collect()
    } else {
        tags_string.split_whitespace().collect()
    };

    let mut tags = Vec::new();
    for pair in pairs {
        if pair.is_empty() {
            continue;
        }

        let (key, value) = if let Some((k, v)) = pair.split_once('=') {
            (k, v)
        } else if let Some((k, v)) = pair.split_once(':') {
            (k, v)
        } else {
            return Err(TagError::MissingSeparator {
                pair: pair.to_string(),
            });
        };

        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            return Err(TagError::EmptyKeyOrValue {
                pair: pair.to_string(),
            });
        }

        tags.push(WorkloadTag {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    Ok(tags)
}
