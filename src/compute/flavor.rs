//! Flavors
//!
//! Hardware configurations a server can be built with or resized to.

use super::common::{number_or_empty, Link};
use serde::{Deserialize, Serialize};

/// A flavor. Summary listings only carry `id`, `name` and `links`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flavor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Memory in MB
    #[serde(default)]
    pub ram: u64,
    /// Root disk in GB
    #[serde(default)]
    pub disk: u64,
    #[serde(default)]
    pub vcpus: u32,
    /// Swap in MB, `None` when the flavor has none
    #[serde(default, deserialize_with = "number_or_empty")]
    pub swap: Option<u64>,
    #[serde(default)]
    pub rxtx_factor: Option<f64>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detailed_flavor() {
        let flavor: Flavor = serde_json::from_value(json!({
            "id": "4",
            "name": "2GB Standard Instance",
            "ram": 2048,
            "disk": 80,
            "vcpus": 2,
            "swap": "",
            "rxtx_factor": 4.0,
            "links": []
        }))
        .unwrap();

        assert_eq!(flavor.ram, 2048);
        assert_eq!(flavor.swap, None);
        assert_eq!(flavor.rxtx_factor, Some(4.0));
    }

    #[test]
    fn test_summary_flavor() {
        let flavor: Flavor = serde_json::from_value(json!({"id": "2", "name": "512MB Standard Instance"})).unwrap();
        assert_eq!(flavor.vcpus, 0);
        assert!(flavor.links.is_empty());
    }
}
