//! OpenStack session layer
//!
//! Identity authentication, service catalog lookup and the HTTP plumbing
//! shared by every service binding.
//!
//! # Module Structure
//!
//! - [`auth`] - Identity v2.0 authentication with token caching
//! - [`catalog`] - Service catalog and endpoint resolution
//! - [`client`] - Authenticated client used by the service handles
//! - [`http`] - HTTP utilities for REST API calls

pub mod auth;
pub mod catalog;
pub mod client;
pub mod http;
