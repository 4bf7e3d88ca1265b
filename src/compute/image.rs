//! Images available to build or rebuild servers from

use super::common::Link;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default, rename = "minDisk")]
    pub min_disk: Option<u64>,
    #[serde(default, rename = "minRam")]
    pub min_ram: Option<u64>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Image {
    /// Value of a metadata key when it is a string
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detailed_image() {
        let image: Image = serde_json::from_value(json!({
            "id": "3afe97b2-26dc-49c5-a2cc-a2fc8d80c001",
            "name": "Ubuntu 12.04 LTS",
            "status": "ACTIVE",
            "progress": 100,
            "minDisk": 10,
            "minRam": 256,
            "created": "2012-08-16T18:41:43Z",
            "metadata": {"os_type": "linux", "auto_disk_config": "True"}
        }))
        .unwrap();

        assert_eq!(image.min_ram, Some(256));
        assert_eq!(image.metadata_str("os_type"), Some("linux"));
        assert!(image.updated.is_none());
    }
}
