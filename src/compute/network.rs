//! Isolated networks (Rackspace `os-networksv2` extension)

use super::service::ComputeService;
use crate::error::{ComputeError, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::IpAddr;

/// The Internet-facing network every server joins by default
pub const RAX_PUBLIC: &str = "00000000-0000-0000-0000-000000000000";

/// The provider's internal network (ServiceNet)
pub const RAX_PRIVATE: &str = "11111111-1111-1111-1111-111111111111";

const NETWORKS_PATH: &str = "os-networksv2";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub cidr: Option<String>,
}

/// Check `cidr` looks like `address/prefix` with a prefix that fits the address
pub fn validate_cidr(cidr: &str) -> Result<()> {
    let invalid = || ComputeError::InvalidParameter(format!("'{}' is not a CIDR block", cidr));

    let (addr, prefix) = cidr.split_once('/').ok_or_else(invalid)?;
    let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;

    let max = if addr.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return Err(invalid());
    }
    Ok(())
}

/// Handle to one network
#[derive(Clone)]
pub struct Network {
    service: ComputeService,
    info: NetworkInfo,
}

impl Network {
    /// A blank network, to be created
    pub fn new(service: ComputeService) -> Self {
        Self {
            service,
            info: NetworkInfo::default(),
        }
    }

    pub async fn fetch(service: ComputeService, id: &str) -> Result<Self> {
        let url = service.url(&format!("{}/{}", NETWORKS_PATH, id));
        let response = service.client().get(&url).await?;
        let info = response.field("network")?;
        Ok(Self { service, info })
    }

    pub fn info(&self) -> &NetworkInfo {
        &self.info
    }

    pub fn id(&self) -> Option<&str> {
        self.info.id.as_deref()
    }

    pub fn url(&self) -> Result<String> {
        let id = self.id().ok_or(ComputeError::MissingId("network"))?;
        Ok(self.service.url(&format!("{}/{}", NETWORKS_PATH, id)))
    }

    pub async fn create(&mut self, label: &str, cidr: &str) -> Result<StatusCode> {
        if self.id().is_some() {
            return Err(ComputeError::InvalidParameter("network already exists".to_string()));
        }
        if label.trim().is_empty() {
            return Err(ComputeError::InvalidParameter("a network label is required".to_string()));
        }
        validate_cidr(cidr)?;

        tracing::info!("Creating network {} ({})", label, cidr);

        let body = json!({ "network": { "label": label, "cidr": cidr } });
        let response = self
            .service
            .client()
            .post(&self.service.url(NETWORKS_PATH), Some(&body))
            .await?;
        self.info = response.field("network")?;
        Ok(response.status)
    }

    pub async fn delete(&self) -> Result<StatusCode> {
        let url = self.url()?;
        tracing::info!("Deleting network {}", url);
        Ok(self.service.client().delete(&url).await?.status)
    }
}

/// List the tenant's networks, including the two provider networks
pub(crate) async fn list(service: &ComputeService) -> Result<Vec<NetworkInfo>> {
    let response = service.client().get(&service.url(NETWORKS_PATH)).await?;
    response.field("networks")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cidr() {
        assert!(validate_cidr("192.168.0.0/24").is_ok());
        assert!(validate_cidr("fd00::/64").is_ok());
        assert!(validate_cidr("192.168.0.0").is_err());
        assert!(validate_cidr("192.168.0.0/33").is_err());
        assert!(validate_cidr("not-an-ip/24").is_err());
    }

    #[test]
    fn test_provider_networks_are_uuids() {
        assert!(uuid::Uuid::parse_str(RAX_PUBLIC).is_ok());
        assert!(uuid::Uuid::parse_str(RAX_PRIVATE).is_ok());
    }
}
