//! Server resource
//!
//! A [`Server`] is a handle to the compute service plus a local copy of the
//! remote server document. Every mutating call is a single HTTP request; the
//! local copy is only as fresh as the last response or [`Server::refresh`].

use super::collection::Collection;
use super::common::{last_segment, ref_or_empty, Link, ResourceRef};
use super::metadata::ServerMetadata;
use super::request::{PersonalityFile, RebuildRequest, ServerCreateRequest, ServerUpdate};
use super::service::ComputeService;
use super::volume_attachment::VolumeAttachment;
use crate::error::{ComputeError, Result};
use crate::openstack::http::ApiResponse;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Status the service reports for a server that failed to build or act
pub const STATUS_ERROR: &str = "ERROR";
pub const STATUS_ACTIVE: &str = "ACTIVE";

/// One address on one network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub version: u8,
    pub addr: String,
}

/// Network label (`public`, `private`, ...) to addresses
pub type Addresses = BTreeMap<String, Vec<Address>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub fn number(&self) -> u8 {
        match self {
            Self::V4 => 4,
            Self::V6 => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebootType {
    /// Signal the operating system to restart
    #[default]
    Soft,
    /// Power cycle
    Hard,
}

impl RebootType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soft => "SOFT",
            Self::Hard => "HARD",
        }
    }
}

/// Local copy of the remote server document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default, rename = "hostId")]
    pub host_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, rename = "accessIPv4")]
    pub access_ipv4: Option<String>,
    #[serde(default, rename = "accessIPv6")]
    pub access_ipv6: Option<String>,
    #[serde(default)]
    pub addresses: Addresses,
    #[serde(default, deserialize_with = "ref_or_empty")]
    pub flavor: Option<ResourceRef>,
    #[serde(default, deserialize_with = "ref_or_empty")]
    pub image: Option<ResourceRef>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub links: Vec<Link>,
    /// Only present in the response to a create or rebuild
    #[serde(default, rename = "adminPass", skip_serializing_if = "Option::is_none")]
    pub admin_pass: Option<String>,
    #[serde(default, rename = "OS-DCF:diskConfig")]
    pub disk_config: Option<String>,
}

impl ServerState {
    /// Access IP of the given version, falling back to the first public
    /// address of that version
    pub fn ip(&self, version: IpVersion) -> Option<&str> {
        let access = match version {
            IpVersion::V4 => self.access_ipv4.as_deref(),
            IpVersion::V6 => self.access_ipv6.as_deref(),
        };

        access.filter(|ip| !ip.is_empty()).or_else(|| {
            self.addresses
                .get("public")?
                .iter()
                .find(|a| a.version == version.number())
                .map(|a| a.addr.as_str())
        })
    }
}

/// Handle to one server
#[derive(Clone)]
pub struct Server {
    service: ComputeService,
    state: ServerState,
    personality: Vec<PersonalityFile>,
}

impl Server {
    /// A blank server, not yet known to the service
    pub fn new(service: ComputeService) -> Self {
        Self::from_state(service, ServerState::default())
    }

    pub fn from_state(service: ComputeService, state: ServerState) -> Self {
        Self {
            service,
            state,
            personality: Vec::new(),
        }
    }

    /// Fetch an existing server
    pub async fn fetch(service: ComputeService, id: &str) -> Result<Self> {
        let mut server = Self::new(service);
        server.state.id = Some(id.to_string());
        server.refresh().await?;
        Ok(server)
    }

    pub fn service(&self) -> &ComputeService {
        &self.service
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    pub fn id(&self) -> Option<&str> {
        self.state.id.as_deref()
    }

    /// Point the handle at a server ID without fetching it
    pub fn set_id(&mut self, id: &str) {
        self.state.id = Some(id.to_string());
    }

    pub fn name(&self) -> Option<&str> {
        self.state.name.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.state.status.as_deref()
    }

    fn require_id(&self) -> Result<&str> {
        self.id()
            .filter(|id| !id.is_empty())
            .ok_or(ComputeError::MissingId("server"))
    }

    /// URL of the server, or of a sub-resource such as `action` or `metadata`
    pub fn url(&self, sub: Option<&str>) -> Result<String> {
        let id = self.require_id()?;
        let base = self.service.url(&format!("servers/{}", id));
        Ok(match sub {
            Some(sub) => format!("{}/{}", base, sub.trim_start_matches('/')),
            None => base,
        })
    }

    /// IP address of the given version
    pub fn ip(&self, version: IpVersion) -> Result<String> {
        self.state
            .ip(version)
            .map(|ip| ip.to_string())
            .ok_or(ComputeError::ServerIp(version.number()))
    }

    /// Re-read the remote state
    pub async fn refresh(&mut self) -> Result<()> {
        let url = self.url(None)?;
        let response = self.service.client().get(&url).await?;
        self.state = response.field("server")?;
        Ok(())
    }

    /// Queue a file to inject when this server is created
    pub fn add_file(&mut self, path: &str, contents: impl Into<Vec<u8>>) {
        self.personality.push(PersonalityFile::new(path, contents));
    }

    /// Body of the create request, including files queued with [`Server::add_file`]
    pub fn create_json(&self, request: &ServerCreateRequest) -> Result<Value> {
        let mut request = request.clone();
        request.personality.extend(self.personality.iter().cloned());
        request.to_json()
    }

    /// Create this server remotely. Uploads the request's keypair first, if any.
    pub async fn create(&mut self, request: &ServerCreateRequest) -> Result<StatusCode> {
        if self.id().is_some() {
            return Err(ComputeError::ServerAction(
                "server already exists; cannot create it again".to_string(),
            ));
        }

        let body = self.create_json(request)?;

        if let Some(keypair) = &request.keypair {
            let (name, public_key) = keypair.validated()?;
            self.service.create_keypair(name, Some(public_key)).await?;
        }

        tracing::info!("Creating server {:?}", request.name);

        let response = self.service.client().post(&self.service.url("servers"), Some(&body)).await?;
        let created: ServerState = response.field("server")?;

        self.state.id = created.id;
        self.state.admin_pass = created.admin_pass;
        self.state.links = created.links;
        self.state.disk_config = created.disk_config;
        self.state.name = request.name.clone();
        self.state.metadata = request.metadata.clone();
        self.personality.clear();

        Ok(response.status)
    }

    /// POST an action body to `servers/{id}/action`
    async fn action(&self, body: &Value) -> Result<ApiResponse> {
        let name = body
            .as_object()
            .and_then(|o| o.keys().next())
            .map(|k| k.as_str())
            .unwrap_or("action");

        let Some(id) = self.id().filter(|id| !id.is_empty()) else {
            return Err(ComputeError::ServerAction(format!(
                "cannot {} a server that has no ID",
                name
            )));
        };

        tracing::info!("Server action: {} on {}", name, id);

        let url = self.url(Some("action"))?;
        self.service.client().post(&url, Some(body)).await
    }

    pub async fn rebuild(&self, request: &RebuildRequest) -> Result<StatusCode> {
        let body = request.to_json()?;
        let response = self.action(&body).await?;
        Ok(response.status)
    }

    pub async fn delete(&self) -> Result<StatusCode> {
        let url = self.url(None)?;
        tracing::info!("Deleting server {}", url);
        let response = self.service.client().delete(&url).await?;
        Ok(response.status)
    }

    /// Change name or access IPs and apply them to the local copy
    pub async fn update(&mut self, changes: &ServerUpdate) -> Result<StatusCode> {
        let body = changes.to_json()?;
        let url = self.url(None)?;
        let response = self.service.client().put(&url, Some(&body)).await?;

        if let Some(name) = &changes.name {
            self.state.name = Some(name.clone());
        }
        if let Some(ip) = &changes.access_ipv4 {
            self.state.access_ipv4 = Some(ip.clone());
        }
        if let Some(ip) = &changes.access_ipv6 {
            self.state.access_ipv6 = Some(ip.clone());
        }

        Ok(response.status)
    }

    pub async fn reboot(&self, reboot_type: RebootType) -> Result<StatusCode> {
        let body = json!({ "reboot": { "type": reboot_type.as_str() } });
        Ok(self.action(&body).await?.status)
    }

    /// Snapshot the server. Returns the new image ID when the service sends
    /// a `Location` header.
    pub async fn create_image(&self, name: &str, metadata: &BTreeMap<String, String>) -> Result<Option<String>> {
        if name.trim().is_empty() {
            return Err(ComputeError::Image("image name is required".to_string()));
        }

        let body = json!({ "createImage": { "name": name, "metadata": metadata } });
        let response = self.action(&body).await?;

        Ok(response
            .location
            .as_deref()
            .and_then(last_segment)
            .map(|id| id.to_string()))
    }

    pub async fn resize(&self, flavor_id: &str) -> Result<StatusCode> {
        if flavor_id.trim().is_empty() {
            return Err(ComputeError::InvalidParameter("a flavor is required to resize".to_string()));
        }
        let body = json!({ "resize": { "flavorRef": flavor_id } });
        Ok(self.action(&body).await?.status)
    }

    pub async fn confirm_resize(&self) -> Result<StatusCode> {
        Ok(self.action(&json!({ "confirmResize": null })).await?.status)
    }

    pub async fn revert_resize(&self) -> Result<StatusCode> {
        Ok(self.action(&json!({ "revertResize": null })).await?.status)
    }

    pub async fn set_password(&self, password: &str) -> Result<StatusCode> {
        let body = json!({ "changePassword": { "adminPass": password } });
        Ok(self.action(&body).await?.status)
    }

    /// Boot into rescue mode. Returns the temporary root password.
    pub async fn rescue(&self) -> Result<String> {
        let response = self.action(&json!({ "rescue": "none" })).await?;

        response
            .body
            .get("adminPass")
            .and_then(|p| p.as_str())
            .map(|p| p.to_string())
            .ok_or_else(|| ComputeError::ServerAction("rescue response has no adminPass".to_string()))
    }

    pub async fn unrescue(&self) -> Result<StatusCode> {
        Ok(self.action(&json!({ "unrescue": null })).await?.status)
    }

    pub async fn metadata(&self) -> Result<ServerMetadata> {
        let url = self.url(Some("metadata"))?;
        ServerMetadata::load(self.service.client().clone(), url).await
    }

    /// Addresses on every network, or on one network by label
    pub async fn ips(&self, network: Option<&str>) -> Result<Addresses> {
        match network {
            None => {
                let url = self.url(Some("ips"))?;
                let response = self.service.client().get(&url).await?;
                response.field("addresses")
            }
            Some(label) => {
                let url = self.url(Some(&format!("ips/{}", urlencoding::encode(label))))?;
                let response = self.service.client().get(&url).await?;
                Ok(serde_json::from_value(response.body)?)
            }
        }
    }

    /// Attach a block storage volume. `None` lets the service pick the device.
    pub async fn attach_volume(&self, volume_id: &str, device: Option<&str>) -> Result<StatusCode> {
        if volume_id.trim().is_empty() {
            return Err(ComputeError::InvalidParameter("a volume ID is required".to_string()));
        }

        let mut attachment = json!({ "volumeId": volume_id });
        if let Some(device) = device {
            attachment["device"] = json!(device);
        }

        let url = self.url(Some("os-volume_attachments"))?;
        tracing::info!("Attaching volume {} to {}", volume_id, url);
        let body = json!({ "volumeAttachment": attachment });
        let response = self.service.client().post(&url, Some(&body)).await?;
        Ok(response.status)
    }

    pub async fn detach_volume(&self, volume_id: &str) -> Result<StatusCode> {
        if volume_id.trim().is_empty() {
            return Err(ComputeError::InvalidParameter("a volume ID is required".to_string()));
        }

        let url = self.url(Some(&format!("os-volume_attachments/{}", volume_id)))?;
        tracing::info!("Detaching volume {}", url);
        let response = self.service.client().delete(&url).await?;
        Ok(response.status)
    }

    pub async fn volume_attachment(&self, attachment_id: &str) -> Result<VolumeAttachment> {
        let url = self.url(Some(&format!("os-volume_attachments/{}", attachment_id)))?;
        let response = self.service.client().get(&url).await?;
        response.field("volumeAttachment")
    }

    pub async fn volume_attachment_list(&self) -> Result<Collection<VolumeAttachment>> {
        let url = self.url(Some("os-volume_attachments"))?;
        Collection::fetch(self.service.client(), &url, "volumeAttachments").await
    }

    /// Retention of scheduled images, or `None` when scheduling is disabled
    pub async fn image_schedule(&self) -> Result<Option<u32>> {
        let url = self.url(Some("rax-si-image-schedule"))?;
        let response = match self.service.client().get(&url).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(response
            .body
            .get("image_schedule")
            .and_then(|s| s.get("retention"))
            .and_then(|r| r.as_u64())
            .and_then(|r| u32::try_from(r).ok()))
    }

    /// Enable scheduled images keeping `retention` of them. Zero disables.
    pub async fn set_image_schedule(&self, retention: u32) -> Result<StatusCode> {
        if retention == 0 {
            return self.delete_image_schedule().await;
        }

        let url = self.url(Some("rax-si-image-schedule"))?;
        let body = json!({ "image_schedule": { "retention": retention } });
        let response = self.service.client().post(&url, Some(&body)).await?;
        Ok(response.status)
    }

    pub async fn delete_image_schedule(&self) -> Result<StatusCode> {
        let url = self.url(Some("rax-si-image-schedule"))?;
        let response = self.service.client().delete(&url).await?;
        Ok(response.status)
    }

    /// Poll until the server reaches `status`.
    ///
    /// Fails early if the server enters `ERROR` (unless that is the awaited
    /// status) and with [`ComputeError::Timeout`] once `timeout` elapses.
    pub async fn wait_for_status(&mut self, status: &str, timeout: Duration, interval: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            self.refresh().await?;

            let current = self.status().unwrap_or_default();
            tracing::debug!("Server {:?} status {} (progress {:?})", self.id(), current, self.state.progress);

            if current.eq_ignore_ascii_case(status) {
                return Ok(());
            }
            if current.eq_ignore_ascii_case(STATUS_ERROR) {
                return Err(ComputeError::ServerAction(format!(
                    "server entered {} while waiting for {}",
                    STATUS_ERROR, status
                )));
            }
            if tokio::time::Instant::now() + interval > deadline {
                return Err(ComputeError::Timeout(status.to_string()));
            }

            tokio::time::sleep(interval).await;
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("endpoint", &self.service.endpoint())
            .field("state", &self.state)
            .field("personality", &self.personality.len())
            .finish()
    }
}
