//! Request bodies for server creation and rebuild
//!
//! Validation happens here, before anything is sent, so that a missing
//! parameter never costs a round trip.

use crate::error::{ComputeError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Longest file path the service accepts for injected files
pub const MAX_PERSONALITY_PATH: usize = 255;

/// How the service partitions the root disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskConfig {
    /// Resize the root partition to fill the flavor's disk
    Auto,
    Manual,
}

impl DiskConfig {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Manual => "MANUAL",
        }
    }
}

/// A file injected into the server's filesystem at build time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalityFile {
    pub path: String,
    pub contents: Vec<u8>,
}

impl PersonalityFile {
    pub fn new(path: &str, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.to_string(),
            contents: contents.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(ComputeError::InvalidParameter(
                "personality file path must not be empty".to_string(),
            ));
        }
        if self.path.len() > MAX_PERSONALITY_PATH {
            return Err(ComputeError::InvalidParameter(format!(
                "personality file path exceeds {} bytes: {}",
                MAX_PERSONALITY_PATH, self.path
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        json!({
            "path": self.path,
            "contents": STANDARD.encode(&self.contents),
        })
    }
}

/// Keypair to upload and attach to a new server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewKeypair {
    pub name: Option<String>,
    pub public_key: Option<String>,
}

impl NewKeypair {
    pub fn new(name: &str, public_key: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            public_key: Some(public_key.to_string()),
        }
    }

    /// Name and public key, both required and non-blank
    pub(crate) fn validated(&self) -> Result<(&str, &str)> {
        let name = self
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ComputeError::InvalidParameter("keypair must have a name".to_string()))?;
        let public_key = self
            .public_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ComputeError::InvalidParameter(format!("keypair '{}' must have a public key", name))
            })?;
        Ok((name, public_key))
    }
}

fn validate_network_id(id: &str) -> Result<()> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| ComputeError::InvalidParameter(format!("'{}' is not a network ID", id)))
}

/// Parameters of a new server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerCreateRequest {
    pub name: Option<String>,
    pub image_ref: Option<String>,
    pub flavor_ref: Option<String>,
    pub metadata: BTreeMap<String, String>,
    /// Network UUIDs, see [`crate::compute::network::RAX_PUBLIC`]
    pub networks: Vec<String>,
    pub personality: Vec<PersonalityFile>,
    /// Existing keypair to inject
    pub key_name: Option<String>,
    /// Keypair to upload before the server is created
    pub keypair: Option<NewKeypair>,
    pub user_data: Option<Vec<u8>>,
    pub config_drive: bool,
    pub disk_config: Option<DiskConfig>,
    pub availability_zone: Option<String>,
}

impl ServerCreateRequest {
    pub fn new(name: &str, image_ref: &str, flavor_ref: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            image_ref: Some(image_ref.to_string()),
            flavor_ref: Some(flavor_ref.to_string()),
            ..Self::default()
        }
    }

    pub fn with_network(mut self, network_id: &str) -> Self {
        self.networks.push(network_id.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.personality.push(PersonalityFile::new(path, contents));
        self
    }

    pub fn with_keypair(mut self, keypair: NewKeypair) -> Self {
        self.keypair = Some(keypair);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.flavor_ref.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(ComputeError::InvalidParameter(
                "a flavor is required to create a server".to_string(),
            ));
        }
        if let Some(keypair) = &self.keypair {
            keypair.validated()?;
        }
        for network in &self.networks {
            validate_network_id(network)?;
        }
        for file in &self.personality {
            file.validate()?;
        }
        Ok(())
    }

    /// Build the `{"server": {...}}` body, validating first
    pub fn to_json(&self) -> Result<Value> {
        self.validate()?;

        let mut server = Map::new();
        if let Some(name) = &self.name {
            server.insert("name".to_string(), json!(name));
        }
        if let Some(image) = &self.image_ref {
            server.insert("imageRef".to_string(), json!(image));
        }
        if let Some(flavor) = &self.flavor_ref {
            server.insert("flavorRef".to_string(), json!(flavor));
        }
        if !self.metadata.is_empty() {
            server.insert("metadata".to_string(), json!(self.metadata));
        }
        if !self.networks.is_empty() {
            let networks: Vec<Value> = self.networks.iter().map(|id| json!({ "uuid": id })).collect();
            server.insert("networks".to_string(), Value::Array(networks));
        }
        if !self.personality.is_empty() {
            let files: Vec<Value> = self.personality.iter().map(PersonalityFile::to_json).collect();
            server.insert("personality".to_string(), Value::Array(files));
        }

        let key_name = self
            .keypair
            .as_ref()
            .and_then(|k| k.name.clone())
            .or_else(|| self.key_name.clone());
        if let Some(key_name) = key_name {
            server.insert("key_name".to_string(), json!(key_name));
        }

        if let Some(user_data) = &self.user_data {
            server.insert("user_data".to_string(), json!(STANDARD.encode(user_data)));
        }
        if self.config_drive {
            server.insert("config_drive".to_string(), json!(true));
        }
        if let Some(disk_config) = self.disk_config {
            server.insert("OS-DCF:diskConfig".to_string(), json!(disk_config.as_str()));
        }
        if let Some(zone) = &self.availability_zone {
            server.insert("availability_zone".to_string(), json!(zone));
        }

        Ok(json!({ "server": server }))
    }
}

/// Parameters of a rebuild. Image and admin password are required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildRequest {
    pub image_ref: Option<String>,
    pub admin_pass: Option<String>,
    pub name: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub personality: Vec<PersonalityFile>,
    pub access_ipv4: Option<String>,
    pub access_ipv6: Option<String>,
    pub disk_config: Option<DiskConfig>,
}

impl RebuildRequest {
    pub fn new(image_ref: &str, admin_pass: &str) -> Self {
        Self {
            image_ref: Some(image_ref.to_string()),
            admin_pass: Some(admin_pass.to_string()),
            ..Self::default()
        }
    }

    /// Build the `{"rebuild": {...}}` action body
    pub fn to_json(&self) -> Result<Value> {
        let admin_pass = self
            .admin_pass
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ComputeError::Rebuild("an admin password is required".to_string()))?;
        let image = self
            .image_ref
            .as_deref()
            .filter(|i| !i.trim().is_empty())
            .ok_or_else(|| ComputeError::Rebuild("an image is required".to_string()))?;

        let mut rebuild = Map::new();
        rebuild.insert("imageRef".to_string(), json!(image));
        rebuild.insert("adminPass".to_string(), json!(admin_pass));

        if let Some(name) = &self.name {
            rebuild.insert("name".to_string(), json!(name));
        }
        if !self.metadata.is_empty() {
            rebuild.insert("metadata".to_string(), json!(self.metadata));
        }
        if !self.personality.is_empty() {
            for file in &self.personality {
                file.validate()?;
            }
            let files: Vec<Value> = self.personality.iter().map(PersonalityFile::to_json).collect();
            rebuild.insert("personality".to_string(), Value::Array(files));
        }
        if let Some(ip) = &self.access_ipv4 {
            rebuild.insert("accessIPv4".to_string(), json!(ip));
        }
        if let Some(ip) = &self.access_ipv6 {
            rebuild.insert("accessIPv6".to_string(), json!(ip));
        }
        if let Some(disk_config) = self.disk_config {
            rebuild.insert("OS-DCF:diskConfig".to_string(), json!(disk_config.as_str()));
        }

        Ok(json!({ "rebuild": rebuild }))
    }
}

/// Fields a server update may change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerUpdate {
    pub name: Option<String>,
    pub access_ipv4: Option<String>,
    pub access_ipv6: Option<String>,
}

impl ServerUpdate {
    pub fn name(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut server = Map::new();
        if let Some(name) = &self.name {
            server.insert("name".to_string(), json!(name));
        }
        if let Some(ip) = &self.access_ipv4 {
            server.insert("accessIPv4".to_string(), json!(ip));
        }
        if let Some(ip) = &self.access_ipv6 {
            server.insert("accessIPv6".to_string(), json!(ip));
        }

        if server.is_empty() {
            return Err(ComputeError::InvalidParameter(
                "update needs a name, accessIPv4 or accessIPv6".to_string(),
            ));
        }

        Ok(json!({ "server": server }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAVOR: &str = "performance1-1";
    const IMAGE: &str = "3afe97b2-26dc-49c5-a2cc-a2fc8d80c001";

    #[test]
    fn test_create_requires_flavor() {
        let err = ServerCreateRequest::default().to_json().unwrap_err();
        assert!(matches!(err, ComputeError::InvalidParameter(_)));
    }

    #[test]
    fn test_create_with_only_flavor() {
        let request = ServerCreateRequest {
            flavor_ref: Some(FLAVOR.to_string()),
            ..Default::default()
        };
        let body = request.to_json().unwrap();
        assert_eq!(body, json!({"server": {"flavorRef": FLAVOR}}));
    }

    #[test]
    fn test_create_fails_without_keypair_name() {
        let request = ServerCreateRequest::new("web", IMAGE, FLAVOR).with_keypair(NewKeypair::default());
        let err = request.to_json().unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter: keypair must have a name");
    }

    #[test]
    fn test_create_fails_without_keypair_public_key() {
        let keypair = NewKeypair {
            name: Some("foo".to_string()),
            public_key: None,
        };
        let request = ServerCreateRequest::new("web", IMAGE, FLAVOR).with_keypair(keypair);
        assert!(matches!(request.to_json(), Err(ComputeError::InvalidParameter(_))));
    }

    #[test]
    fn test_create_with_keypair_sets_key_name() {
        let request = ServerCreateRequest::new("web", IMAGE, FLAVOR).with_keypair(NewKeypair::new("foo", "bar"));
        let body = request.to_json().unwrap();
        assert_eq!(body["server"]["key_name"], "foo");
    }

    #[test]
    fn test_create_with_networks() {
        let request = ServerCreateRequest::new("personality test 1", IMAGE, FLAVOR)
            .with_network("00000000-0000-0000-0000-000000000000")
            .with_network("11111111-1111-1111-1111-111111111111");
        let body = request.to_json().unwrap();
        assert_eq!(
            body["server"]["networks"],
            json!([
                {"uuid": "00000000-0000-0000-0000-000000000000"},
                {"uuid": "11111111-1111-1111-1111-111111111111"}
            ])
        );
    }

    #[test]
    fn test_create_fails_with_bad_network() {
        let request = ServerCreateRequest::new("personality test 1", IMAGE, FLAVOR).with_network("1234");
        let err = request.to_json().unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter: '1234' is not a network ID");
    }

    #[test]
    fn test_create_personality_is_base64() {
        let request = ServerCreateRequest::new("web", IMAGE, FLAVOR).with_file("/tmp/hello.txt", "Hello, world!");
        let body = request.to_json().unwrap();
        let personality = body["server"]["personality"].as_array().unwrap();
        assert_eq!(personality[0]["path"], "/tmp/hello.txt");
        assert_eq!(personality[0]["contents"], "SGVsbG8sIHdvcmxkIQ==");
    }

    #[test]
    fn test_create_rejects_long_personality_path() {
        let path = format!("/{}", "a".repeat(MAX_PERSONALITY_PATH));
        let request = ServerCreateRequest::new("web", IMAGE, FLAVOR).with_file(&path, "x");
        assert!(request.to_json().is_err());
    }

    #[test]
    fn test_create_optional_fields() {
        let mut request = ServerCreateRequest::new("web", IMAGE, FLAVOR).with_metadata("role", "frontend");
        request.user_data = Some(b"#!/bin/sh".to_vec());
        request.config_drive = true;
        request.disk_config = Some(DiskConfig::Manual);

        let server = request.to_json().unwrap()["server"].clone();
        assert_eq!(server["metadata"], json!({"role": "frontend"}));
        assert_eq!(server["user_data"], "IyEvYmluL3No");
        assert_eq!(server["config_drive"], true);
        assert_eq!(server["OS-DCF:diskConfig"], "MANUAL");
        assert!(server.get("availability_zone").is_none());
    }

    #[test]
    fn test_rebuild_requires_admin_pass() {
        let err = RebuildRequest::default().to_json().unwrap_err();
        assert!(matches!(err, ComputeError::Rebuild(_)));
    }

    #[test]
    fn test_rebuild_requires_image() {
        let request = RebuildRequest {
            admin_pass: Some("FOOBAR".to_string()),
            ..Default::default()
        };
        let err = request.to_json().unwrap_err();
        assert_eq!(err.to_string(), "Rebuild error: an image is required");
    }

    #[test]
    fn test_rebuild_body() {
        let body = RebuildRequest::new("123", "FOOBAR").to_json().unwrap();
        assert_eq!(body, json!({"rebuild": {"imageRef": "123", "adminPass": "FOOBAR"}}));
    }

    #[test]
    fn test_update_body() {
        let body = ServerUpdate::name("FOO-BAR").to_json().unwrap();
        assert_eq!(body, json!({"server": {"name": "FOO-BAR"}}));

        assert!(ServerUpdate::default().to_json().is_err());
    }
}
