//! Compute service
//!
//! Owns the tenant/region endpoint of the compute API, builds resource URLs
//! and hands out resource handles.

use super::collection::{Collection, ListOptions};
use super::flavor::Flavor;
use super::image::Image;
use super::keypair::{self, Keypair};
use super::network::{self, Network, NetworkInfo};
use super::request::ServerCreateRequest;
use super::server::{Server, ServerState};
use crate::error::Result;
use crate::openstack::catalog::UrlType;
use crate::openstack::client::OpenStackClient;
use reqwest::StatusCode;

/// Catalog name of the Rackspace next-generation compute service
pub const DEFAULT_SERVICE_NAME: &str = "cloudServersOpenStack";

#[derive(Clone)]
pub struct ComputeService {
    client: OpenStackClient,
    endpoint: String,
}

impl ComputeService {
    /// Use a known endpoint, e.g. `https://dfw.servers.api.rackspacecloud.com/v2/9999`
    pub fn new(client: OpenStackClient, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve the endpoint from the client's service catalog
    pub async fn from_catalog(
        client: OpenStackClient,
        name: &str,
        region: Option<&str>,
        url_type: UrlType,
    ) -> Result<Self> {
        let endpoint = client.endpoint(name, region, url_type).await?;
        tracing::debug!("Compute endpoint for {} in {:?}: {}", name, region, endpoint);
        Ok(Self::new(client, &endpoint))
    }

    pub fn client(&self) -> &OpenStackClient {
        &self.client
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build a URL below the endpoint
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.endpoint.clone()
        } else {
            format!("{}/{}", self.endpoint, path)
        }
    }

    fn list_url(&self, resource: &str, details: bool, options: &ListOptions) -> Result<String> {
        let path = if details {
            format!("{}/detail", resource)
        } else {
            resource.to_string()
        };
        options.apply(&self.url(&path))
    }

    // =========================================================================
    // Servers
    // =========================================================================

    /// A server handle: fetched when `id` is given, blank otherwise
    pub async fn server(&self, id: Option<&str>) -> Result<Server> {
        match id {
            Some(id) => Server::fetch(self.clone(), id).await,
            None => Ok(Server::new(self.clone())),
        }
    }

    pub async fn server_list(&self, details: bool, options: &ListOptions) -> Result<Collection<ServerState>> {
        let url = self.list_url("servers", details, options)?;
        Collection::fetch(&self.client, &url, "servers").await
    }

    /// Create a server from a blank handle
    pub async fn create_server(&self, request: &ServerCreateRequest) -> Result<Server> {
        let mut server = Server::new(self.clone());
        server.create(request).await?;
        Ok(server)
    }

    // =========================================================================
    // Flavors and images
    // =========================================================================

    pub async fn flavor(&self, id: &str) -> Result<Flavor> {
        let response = self.client.get(&self.url(&format!("flavors/{}", id))).await?;
        response.field("flavor")
    }

    pub async fn flavor_list(&self, details: bool, options: &ListOptions) -> Result<Collection<Flavor>> {
        let url = self.list_url("flavors", details, options)?;
        Collection::fetch(&self.client, &url, "flavors").await
    }

    pub async fn image(&self, id: &str) -> Result<Image> {
        let response = self.client.get(&self.url(&format!("images/{}", id))).await?;
        response.field("image")
    }

    pub async fn image_list(&self, details: bool, options: &ListOptions) -> Result<Collection<Image>> {
        let url = self.list_url("images", details, options)?;
        Collection::fetch(&self.client, &url, "images").await
    }

    pub async fn delete_image(&self, id: &str) -> Result<StatusCode> {
        tracing::info!("Deleting image {}", id);
        Ok(self.client.delete(&self.url(&format!("images/{}", id))).await?.status)
    }

    // =========================================================================
    // Networks
    // =========================================================================

    /// A network handle: fetched when `id` is given, blank otherwise
    pub async fn network(&self, id: Option<&str>) -> Result<Network> {
        match id {
            Some(id) => Network::fetch(self.clone(), id).await,
            None => Ok(Network::new(self.clone())),
        }
    }

    pub async fn network_list(&self) -> Result<Vec<NetworkInfo>> {
        network::list(self).await
    }

    // =========================================================================
    // Keypairs
    // =========================================================================

    pub async fn keypair_list(&self) -> Result<Vec<Keypair>> {
        keypair::list(self).await
    }

    pub async fn create_keypair(&self, name: &str, public_key: Option<&str>) -> Result<Keypair> {
        keypair::create(self, name, public_key).await
    }

    pub async fn delete_keypair(&self, name: &str) -> Result<StatusCode> {
        keypair::delete(self, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openstack::catalog::ServiceCatalog;

    fn service() -> ComputeService {
        let client = OpenStackClient::with_token("token", ServiceCatalog::default()).unwrap();
        ComputeService::new(client, "https://dfw.servers.api.rackspacecloud.com/v2/9999/")
    }

    #[test]
    fn test_url() {
        let service = service();
        assert_eq!(service.endpoint(), "https://dfw.servers.api.rackspacecloud.com/v2/9999");
        assert_eq!(service.url("servers"), "https://dfw.servers.api.rackspacecloud.com/v2/9999/servers");
        assert_eq!(service.url("/flavors/4"), "https://dfw.servers.api.rackspacecloud.com/v2/9999/flavors/4");
        assert_eq!(service.url(""), "https://dfw.servers.api.rackspacecloud.com/v2/9999");
    }

    #[test]
    fn test_list_url() {
        let service = service();
        let options = ListOptions::new().filter("status", "ACTIVE");
        assert_eq!(
            service.list_url("servers", true, &options).unwrap(),
            "https://dfw.servers.api.rackspacecloud.com/v2/9999/servers/detail?status=ACTIVE"
        );
        assert_eq!(
            service.list_url("images", false, &ListOptions::new()).unwrap(),
            "https://dfw.servers.api.rackspacecloud.com/v2/9999/images"
        );
    }

    #[tokio::test]
    async fn test_blank_server_and_network() {
        let service = service();
        let server = service.server(None).await.unwrap();
        assert!(server.id().is_none());

        let network = service.network(None).await.unwrap();
        assert!(network.url().is_err());
    }

    #[tokio::test]
    async fn test_from_catalog_without_compute_fails() {
        let client = OpenStackClient::with_token("token", ServiceCatalog::default()).unwrap();
        let result = ComputeService::from_catalog(client, DEFAULT_SERVICE_NAME, Some("DFW"), UrlType::Public).await;
        assert!(result.is_err());
    }
}
