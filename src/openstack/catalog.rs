//! Service catalog
//!
//! The identity service returns, together with a token, the list of services
//! available to the tenant and their regional endpoints. Services are looked
//! up here by name (or type), region and URL type.

use crate::error::{ComputeError, Result};
use serde::{Deserialize, Serialize};

/// Which of an endpoint's URLs to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlType {
    #[default]
    Public,
    /// ServiceNet URL, only reachable from inside the provider's network
    Internal,
}

impl UrlType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "publicurl" | "public" => Some(Self::Public),
            "internalurl" | "internal" => Some(Self::Internal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "publicURL",
            Self::Internal => "internalURL",
        }
    }
}

/// One regional endpoint of a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, rename = "tenantId")]
    pub tenant_id: Option<String>,
    #[serde(default, rename = "publicURL")]
    pub public_url: Option<String>,
    #[serde(default, rename = "internalURL")]
    pub internal_url: Option<String>,
}

impl Endpoint {
    pub fn url(&self, url_type: UrlType) -> Option<&str> {
        match url_type {
            UrlType::Public => self.public_url.as_deref(),
            UrlType::Internal => self.internal_url.as_deref(),
        }
    }

    /// Endpoints without a region are global and match every region
    fn serves(&self, region: Option<&str>) -> bool {
        match (region, self.region.as_deref()) {
            (Some(wanted), Some(have)) => wanted.eq_ignore_ascii_case(have),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceCatalog {
    entries: Vec<CatalogEntry>,
}

impl ServiceCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Resolve the base URL of a service.
    ///
    /// `service` matches either the catalog name (`cloudServersOpenStack`) or
    /// the service type (`compute`). Names take precedence over types.
    pub fn endpoint_url(&self, service: &str, region: Option<&str>, url_type: UrlType) -> Result<String> {
        let by_name = self.entries.iter().filter(|e| e.name == service);
        let by_type = self.entries.iter().filter(|e| e.service_type == service);

        let found = by_name
            .chain(by_type)
            .flat_map(|entry| entry.endpoints.iter())
            .filter(|endpoint| endpoint.serves(region))
            .find_map(|endpoint| endpoint.url(url_type));

        match found {
            Some(url) => Ok(url.trim_end_matches('/').to_string()),
            None => Err(ComputeError::EndpointNotFound {
                service: service.to_string(),
                region: region.unwrap_or("any").to_string(),
                url_type: url_type.as_str().to_string(),
            }),
        }
    }

    /// Regions offering the given service
    pub fn regions(&self, service: &str) -> Vec<String> {
        let mut regions: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.name == service || e.service_type == service)
            .flat_map(|e| e.endpoints.iter())
            .filter_map(|endpoint| endpoint.region.clone())
            .collect();
        regions.sort();
        regions.dedup();
        regions
    }
}
