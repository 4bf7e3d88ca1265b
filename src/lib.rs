//! Client bindings for the OpenStack / Rackspace Cloud Servers compute API.
//!
//! Each method on a resource maps to one REST call against the compute
//! service; responses are deserialized into plain structs. Authentication
//! and endpoint discovery go through the identity service's v2.0 tokens API.
//!
//! # Module Structure
//!
//! - [`openstack`] - Identity, service catalog and HTTP plumbing
//! - [`compute`] - Compute service, servers and supporting resources
//! - [`config`] - File and environment configuration
//! - [`error`] - Error type shared by the whole crate

pub mod compute;
pub mod config;
pub mod error;
pub mod openstack;

pub use compute::{ComputeService, Server};
pub use config::Config;
pub use error::{ComputeError, Result};
pub use openstack::client::OpenStackClient;
