//! SSH keypairs (`os-keypairs` extension)

use super::service::ComputeService;
use crate::error::{ComputeError, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const KEYPAIRS_PATH: &str = "os-keypairs";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keypair {
    pub name: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
    /// Only returned when the service generated the keypair
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

/// The list endpoint wraps each keypair in its own object
#[derive(Debug, Deserialize)]
struct KeypairEntry {
    keypair: Keypair,
}

pub(crate) async fn list(service: &ComputeService) -> Result<Vec<Keypair>> {
    let response = service.client().get(&service.url(KEYPAIRS_PATH)).await?;
    let entries: Vec<KeypairEntry> = response.field("keypairs")?;
    Ok(entries.into_iter().map(|e| e.keypair).collect())
}

/// Upload `public_key` under `name`, or let the service generate a keypair
pub(crate) async fn create(service: &ComputeService, name: &str, public_key: Option<&str>) -> Result<Keypair> {
    if name.trim().is_empty() {
        return Err(ComputeError::InvalidParameter("keypair must have a name".to_string()));
    }

    let mut keypair = Map::new();
    keypair.insert("name".to_string(), json!(name));
    if let Some(key) = public_key {
        keypair.insert("public_key".to_string(), json!(key));
    }

    tracing::info!("Creating keypair {}", name);

    let body = json!({ "keypair": Value::Object(keypair) });
    let response = service.client().post(&service.url(KEYPAIRS_PATH), Some(&body)).await?;
    response.field("keypair")
}

pub(crate) async fn delete(service: &ComputeService, name: &str) -> Result<StatusCode> {
    if name.trim().is_empty() {
        return Err(ComputeError::InvalidParameter("keypair must have a name".to_string()));
    }

    let url = service.url(&format!("{}/{}", KEYPAIRS_PATH, urlencoding::encode(name)));
    tracing::info!("Deleting keypair {}", name);
    Ok(service.client().delete(&url).await?.status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_entries_unwrap() {
        let entries: Vec<KeypairEntry> = serde_json::from_value(json!([
            {"keypair": {"name": "deploy", "public_key": "ssh-rsa AAAA", "fingerprint": "aa:bb"}}
        ]))
        .unwrap();
        assert_eq!(entries[0].keypair.name, "deploy");
        assert_eq!(entries[0].keypair.fingerprint.as_deref(), Some("aa:bb"));
        assert!(entries[0].keypair.private_key.is_none());
    }
}
