//! Configuration Management
//!
//! Handles persistent configuration storage for oscompute. Values come from
//! `config.yaml` in the user's config directory, overridden by the usual
//! `OS_*` environment variables.

use crate::error::{ComputeError, Result};
use crate::openstack::auth::{AuthConfig, Secret, DEFAULT_AUTH_URL};
use crate::openstack::catalog::UrlType;
use crate::compute::DEFAULT_SERVICE_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables and the field each one overrides
const ENV_OVERRIDES: &[(&str, Field)] = &[
    ("OS_AUTH_URL", Field::AuthUrl),
    ("OS_USERNAME", Field::Username),
    ("OS_API_KEY", Field::ApiKey),
    ("OS_PASSWORD", Field::Password),
    ("OS_TENANT_NAME", Field::TenantName),
    ("OS_REGION_NAME", Field::Region),
];

#[derive(Debug, Clone, Copy)]
enum Field {
    AuthUrl,
    Username,
    ApiKey,
    Password,
    TenantName,
    Region,
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Rackspace API key; preferred over `password` when both are set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// `publicURL` or `internalURL`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_type: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("oscompute").join("config.yaml"))
    }

    /// Load configuration from disk and the environment
    pub fn load() -> Self {
        let mut config = match Self::config_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring config file {:?}: {}", path, e);
                Self::default()
            }),
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Load a config file. A missing file yields the default configuration.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ComputeError::Config(format!("cannot read {}: {}", path.display(), e)))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content)
            .map_err(|e| ComputeError::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let io_err = |e: std::io::Error| ComputeError::Config(format!("cannot write {}: {}", path.display(), e));

        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_yaml::to_string(self).map_err(|e| ComputeError::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(io_err)?;

        Ok(())
    }

    /// Apply overrides looked up by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (name, field) in ENV_OVERRIDES {
            let Some(value) = lookup(name).filter(|v| !v.is_empty()) else {
                continue;
            };

            let slot = match field {
                Field::AuthUrl => &mut self.auth_url,
                Field::Username => &mut self.username,
                Field::ApiKey => &mut self.api_key,
                Field::Password => &mut self.password,
                Field::TenantName => &mut self.tenant_name,
                Field::Region => &mut self.region,
            };
            *slot = Some(value);
        }
    }

    /// Get effective service name (config > Rackspace default)
    pub fn effective_service_name(&self) -> String {
        self.service_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string())
    }

    pub fn effective_url_type(&self) -> Result<UrlType> {
        match &self.url_type {
            None => Ok(UrlType::default()),
            Some(s) => UrlType::parse(s).ok_or_else(|| ComputeError::Config(format!("unknown url_type '{}'", s))),
        }
    }

    /// Credentials for the identity service
    pub fn auth_config(&self) -> Result<AuthConfig> {
        let username = self
            .username
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ComputeError::Config("no username configured (set OS_USERNAME)".to_string()))?;

        let secret = match (&self.api_key, &self.password) {
            (Some(key), _) if !key.is_empty() => Secret::ApiKey(key.clone()),
            (_, Some(password)) if !password.is_empty() => Secret::Password(password.clone()),
            _ => {
                return Err(ComputeError::Config(
                    "no API key or password configured (set OS_API_KEY or OS_PASSWORD)".to_string(),
                ))
            }
        };

        Ok(AuthConfig {
            auth_url: self
                .auth_url
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            username,
            secret,
            tenant_name: self.tenant_name.clone(),
        })
    }

    /// Set the default region in the file at `path`.
    ///
    /// Only what the file already holds is written back; environment
    /// overrides never reach the disk.
    pub fn save_region(path: &Path, region: &str) -> Result<Self> {
        let mut config = Self::load_from(path)?;
        config.region = Some(region.to_string());
        config.save_to(path)?;
        Ok(config)
    }
}
