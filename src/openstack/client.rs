//! OpenStack Client
//!
//! Main client for interacting with OpenStack APIs, combining authentication
//! and HTTP functionality.

use super::auth::{AuthConfig, Credentials};
use super::catalog::{ServiceCatalog, UrlType};
use super::http::{ApiResponse, HttpClient};
use crate::error::Result;
use reqwest::{Method, StatusCode};
use serde_json::Value;

/// Authenticated session shared by every service handle
#[derive(Clone)]
pub struct OpenStackClient {
    pub credentials: Credentials,
    pub http: HttpClient,
}

impl OpenStackClient {
    /// Authenticate and create a new client
    pub async fn connect(config: AuthConfig) -> Result<Self> {
        let http = HttpClient::new()?;
        let credentials = Credentials::authenticate(config, http.clone()).await?;

        Ok(Self { credentials, http })
    }

    /// Create a client around an existing token
    pub fn with_token(token: &str, catalog: ServiceCatalog) -> Result<Self> {
        let http = HttpClient::new()?;
        let credentials = Credentials::from_token(token, catalog, http.clone());

        Ok(Self { credentials, http })
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Send with the cached token. A 401 triggers one re-authentication and retry.
    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<ApiResponse> {
        let token = self.get_token().await?;

        match self.http.send(method.clone(), url, Some(&token), body).await {
            Err(e) if e.status() == Some(StatusCode::UNAUTHORIZED) && self.credentials.can_reauthenticate() => {
                tracing::warn!("Token rejected for {} {}, re-authenticating", method, url);
                let token = self.credentials.refresh_token().await?;
                self.http.send(method, url, Some(&token), body).await
            }
            result => result,
        }
    }

    pub async fn get(&self, url: &str) -> Result<ApiResponse> {
        self.send(Method::GET, url, None).await
    }

    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<ApiResponse> {
        self.send(Method::POST, url, body).await
    }

    pub async fn put(&self, url: &str, body: Option<&Value>) -> Result<ApiResponse> {
        self.send(Method::PUT, url, body).await
    }

    pub async fn delete(&self, url: &str) -> Result<ApiResponse> {
        self.send(Method::DELETE, url, None).await
    }

    /// Resolve a service endpoint from the catalog
    pub async fn endpoint(&self, service: &str, region: Option<&str>, url_type: UrlType) -> Result<String> {
        let catalog = self.credentials.catalog().await?;
        catalog.endpoint_url(service, region, url_type)
    }
}
