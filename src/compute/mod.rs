//! Compute service bindings
//!
//! # Module Structure
//!
//! - [`service`] - Endpoint, URL building and resource handles
//! - [`server`] - Server resource and its actions
//! - [`request`] - Create, rebuild and update request bodies
//! - [`metadata`] - Server metadata
//! - [`collection`] - Paginated list results
//! - [`flavor`], [`image`], [`network`], [`keypair`], [`volume_attachment`] -
//!   supporting resources
//!
//! # Example
//!
//! ```ignore
//! use oscompute::compute::{ComputeService, ListOptions, DEFAULT_SERVICE_NAME};
//! use oscompute::openstack::{auth::AuthConfig, catalog::UrlType, client::OpenStackClient};
//!
//! async fn example() -> oscompute::Result<()> {
//!     let client = OpenStackClient::connect(AuthConfig::api_key("user", "key")).await?;
//!     let service = ComputeService::from_catalog(client, DEFAULT_SERVICE_NAME, Some("DFW"), UrlType::Public).await?;
//!     let servers = service.server_list(true, &ListOptions::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod collection;
mod common;
pub mod flavor;
pub mod image;
pub mod keypair;
pub mod metadata;
pub mod network;
pub mod request;
pub mod server;
pub mod service;
pub mod volume_attachment;

pub use collection::{Collection, ListOptions};
pub use common::{Link, ResourceRef};
pub use flavor::Flavor;
pub use image::Image;
pub use keypair::Keypair;
pub use metadata::ServerMetadata;
pub use network::{Network, NetworkInfo, RAX_PRIVATE, RAX_PUBLIC};
pub use request::{DiskConfig, NewKeypair, PersonalityFile, RebuildRequest, ServerCreateRequest, ServerUpdate};
pub use server::{Address, Addresses, IpVersion, RebootType, Server, ServerState};
pub use service::{ComputeService, DEFAULT_SERVICE_NAME};
pub use volume_attachment::VolumeAttachment;
