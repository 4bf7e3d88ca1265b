//! Identity authentication
//!
//! Authenticates against the identity v2.0 tokens API using either a
//! Rackspace API key or a username/password pair, and caches the resulting
//! token and service catalog until shortly before the token expires.

use super::catalog::ServiceCatalog;
use super::http::HttpClient;
use crate::error::{ComputeError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Rackspace identity endpoint, used when none is configured
pub const DEFAULT_AUTH_URL: &str = "https://identity.api.rackspacecloud.com/v2.0";

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER_SECS: i64 = 60;

/// Secret half of a credential pair
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    ApiKey(String),
    Password(String),
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(***)"),
            Self::Password(_) => f.write_str("Password(***)"),
        }
    }
}

/// Everything needed to obtain a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub auth_url: String,
    pub username: String,
    pub secret: Secret,
    pub tenant_name: Option<String>,
}

impl AuthConfig {
    pub fn api_key(username: &str, api_key: &str) -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            username: username.to_string(),
            secret: Secret::ApiKey(api_key.to_string()),
            tenant_name: None,
        }
    }

    pub fn password(username: &str, password: &str) -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            username: username.to_string(),
            secret: Secret::Password(password.to_string()),
            tenant_name: None,
        }
    }

    pub fn with_auth_url(mut self, auth_url: &str) -> Self {
        self.auth_url = auth_url.to_string();
        self
    }

    pub fn with_tenant(mut self, tenant_name: &str) -> Self {
        self.tenant_name = Some(tenant_name.to_string());
        self
    }

    pub fn tokens_url(&self) -> String {
        let base = self.auth_url.trim_end_matches('/');
        if base.ends_with("/tokens") {
            base.to_string()
        } else {
            format!("{}/tokens", base)
        }
    }

    /// Body of the `POST /tokens` request
    pub fn request_body(&self) -> Value {
        let mut auth = match &self.secret {
            Secret::ApiKey(key) => json!({
                "RAX-KSKEY:apiKeyCredentials": {
                    "username": self.username,
                    "apiKey": key
                }
            }),
            Secret::Password(password) => json!({
                "passwordCredentials": {
                    "username": self.username,
                    "password": password
                }
            }),
        };

        if let (Some(tenant), Value::Object(map)) = (&self.tenant_name, &mut auth) {
            map.insert("tenantName".to_string(), Value::String(tenant.clone()));
        }

        json!({ "auth": auth })
    }
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: TokenInfo,
    #[serde(default, rename = "serviceCatalog")]
    service_catalog: ServiceCatalog,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    id: String,
    #[serde(default)]
    expires: Option<DateTime<Utc>>,
    #[serde(default)]
    tenant: Option<Tenant>,
}

#[derive(Debug, Clone, Deserialize)]
struct Tenant {
    id: String,
}

/// Token plus the catalog that came with it
#[derive(Debug, Clone)]
struct AuthSession {
    token: String,
    /// When this token expires (with buffer applied); `None` never expires
    expires_at: Option<DateTime<Utc>>,
    tenant_id: Option<String>,
    catalog: ServiceCatalog,
}

impl AuthSession {
    fn is_valid(&self) -> bool {
        self.expires_at.map(|at| Utc::now() < at).unwrap_or(true)
    }
}

/// Identity credentials holder with token caching
#[derive(Clone)]
pub struct Credentials {
    config: Option<AuthConfig>,
    http: HttpClient,
    session: Arc<RwLock<Option<AuthSession>>>,
}

impl Credentials {
    /// Authenticate immediately and cache the token and catalog
    pub async fn authenticate(config: AuthConfig, http: HttpClient) -> Result<Self> {
        let credentials = Self {
            config: Some(config),
            http,
            session: Arc::new(RwLock::new(None)),
        };
        credentials.get_token().await?;
        Ok(credentials)
    }

    /// Use a pre-issued token. It is never refreshed.
    pub fn from_token(token: &str, catalog: ServiceCatalog, http: HttpClient) -> Self {
        let session = AuthSession {
            token: token.to_string(),
            expires_at: None,
            tenant_id: None,
            catalog,
        };
        Self {
            config: None,
            http,
            session: Arc::new(RwLock::new(Some(session))),
        }
    }

    /// Get a token for API calls, re-authenticating when the cached one expired
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.session.read().await;
            if let Some(session) = cache.as_ref() {
                if session.is_valid() {
                    return Ok(session.token.clone());
                }
                tracing::debug!("Cached token expired, re-authenticating");
            }
        }

        let session = self.request_session().await?;
        let token = session.token.clone();

        {
            let mut cache = self.session.write().await;
            *cache = Some(session);
        }

        Ok(token)
    }

    /// Force re-authentication
    pub async fn refresh_token(&self) -> Result<String> {
        if self.config.is_some() {
            let mut cache = self.session.write().await;
            *cache = None;
        }

        self.get_token().await
    }

    /// Whether a rejected token can be replaced by authenticating again
    pub fn can_reauthenticate(&self) -> bool {
        self.config.is_some()
    }

    pub async fn catalog(&self) -> Result<ServiceCatalog> {
        self.get_token().await?;
        let cache = self.session.read().await;
        Ok(cache.as_ref().map(|s| s.catalog.clone()).unwrap_or_default())
    }

    pub async fn tenant_id(&self) -> Option<String> {
        let cache = self.session.read().await;
        cache.as_ref().and_then(|s| s.tenant_id.clone())
    }

    async fn request_session(&self) -> Result<AuthSession> {
        let Some(config) = &self.config else {
            return Err(ComputeError::Auth(
                "token expired and no credentials are available to renew it".to_string(),
            ));
        };

        tracing::info!("Authenticating {} against {}", config.username, config.auth_url);

        let body = config.request_body();
        let response = self
            .http
            .post(&config.tokens_url(), None, Some(&body))
            .await
            .map_err(|e| match e {
                ComputeError::Api { status, message } if status.is_client_error() => {
                    ComputeError::Auth(format!("{} ({})", message, status))
                }
                other => other,
            })?;

        let access: AccessResponse = serde_json::from_value(response.body)
            .map_err(|e| ComputeError::Auth(format!("malformed token response: {}", e)))?;
        let access = access.access;

        let expires_at = access
            .token
            .expires
            .map(|at| at - Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS));
        tracing::debug!("New token cached, expires at {:?}", expires_at);

        Ok(AuthSession {
            token: access.token.id,
            expires_at,
            tenant_id: access.token.tenant.map(|t| t.id),
            catalog: access.service_catalog,
        })
    }
}
