//! Server metadata
//!
//! Key/value pairs attached to a server, held locally and synchronized one
//! request at a time.

use crate::error::{ComputeError, Result};
use crate::openstack::client::OpenStackClient;
use reqwest::StatusCode;
use serde_json::json;
use std::collections::BTreeMap;

pub struct ServerMetadata {
    client: OpenStackClient,
    url: String,
    items: BTreeMap<String, String>,
}

impl ServerMetadata {
    /// Load the metadata found at `url` (`.../servers/{id}/metadata`)
    pub(crate) async fn load(client: OpenStackClient, url: String) -> Result<Self> {
        let mut metadata = Self {
            client,
            url,
            items: BTreeMap::new(),
        };
        metadata.refresh().await?;
        Ok(metadata)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn items(&self) -> &BTreeMap<String, String> {
        &self.items
    }

    /// Locally cached value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(|v| v.as_str())
    }

    fn item_url(&self, key: &str) -> Result<String> {
        if key.trim().is_empty() {
            return Err(ComputeError::InvalidParameter("metadata key must not be empty".to_string()));
        }
        Ok(format!("{}/{}", self.url, urlencoding::encode(key)))
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let response = self.client.get(&self.url).await?;
        self.items = response.field("metadata")?;
        Ok(())
    }

    /// Replace every item with `items`
    pub async fn replace(&mut self, items: &BTreeMap<String, String>) -> Result<StatusCode> {
        let body = json!({ "metadata": items });
        let response = self.client.put(&self.url, Some(&body)).await?;
        self.items = response.field("metadata")?;
        Ok(response.status)
    }

    /// Add or overwrite `items`, keeping the others
    pub async fn merge(&mut self, items: &BTreeMap<String, String>) -> Result<StatusCode> {
        let body = json!({ "metadata": items });
        let response = self.client.post(&self.url, Some(&body)).await?;
        self.items = response.field("metadata")?;
        Ok(response.status)
    }

    /// Fetch a single item from the service
    pub async fn get_item(&mut self, key: &str) -> Result<String> {
        let url = self.item_url(key)?;
        let response = self.client.get(&url).await?;
        let meta: BTreeMap<String, String> = response.field("meta")?;

        let value = meta.get(key).cloned().ok_or_else(|| ComputeError::Api {
            status: response.status,
            message: format!("metadata item '{}' missing from response", key),
        })?;
        self.items.insert(key.to_string(), value.clone());
        Ok(value)
    }

    pub async fn set_item(&mut self, key: &str, value: &str) -> Result<StatusCode> {
        let url = self.item_url(key)?;
        let body = json!({ "meta": { key: value } });
        let response = self.client.put(&url, Some(&body)).await?;
        self.items.insert(key.to_string(), value.to_string());
        Ok(response.status)
    }

    pub async fn delete_item(&mut self, key: &str) -> Result<StatusCode> {
        let url = self.item_url(key)?;
        let response = self.client.delete(&url).await?;
        self.items.remove(key);
        Ok(response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openstack::catalog::ServiceCatalog;

    fn metadata() -> ServerMetadata {
        ServerMetadata {
            client: OpenStackClient::with_token("token", ServiceCatalog::default()).unwrap(),
            url: "https://x/v2/9999/servers/abc/metadata".to_string(),
            items: BTreeMap::from([("role".to_string(), "web".to_string())]),
        }
    }

    #[test]
    fn test_item_url_is_encoded() {
        assert_eq!(
            metadata().item_url("build config/v1").unwrap(),
            "https://x/v2/9999/servers/abc/metadata/build%20config%2Fv1"
        );
    }

    #[test]
    fn test_blank_key_is_rejected() {
        assert!(matches!(metadata().item_url(" "), Err(ComputeError::InvalidParameter(_))));
    }

    #[test]
    fn test_local_get() {
        let metadata = metadata();
        assert_eq!(metadata.get("role"), Some("web"));
        assert_eq!(metadata.get("missing"), None);
    }

    #[tokio::test]
    async fn test_set_item_with_blank_key_sends_nothing() {
        let mut metadata = metadata();
        assert!(metadata.set_item("", "v").await.is_err());
        assert_eq!(metadata.items().len(), 1);
    }

    proptest::proptest! {
        #[test]
        fn item_url_keeps_key_in_one_segment(key in "[ -~]*[!-~][ -~]*") {
            let url = metadata().item_url(&key).unwrap();
            let segment = url.strip_prefix("https://x/v2/9999/servers/abc/metadata/").unwrap();

            proptest::prop_assert!(!segment.contains('/'));
            proptest::prop_assert_eq!(urlencoding::decode(segment).unwrap(), key.as_str());
        }
    }
}
