//! Paginated collections
//!
//! List endpoints return one page of results plus a `<key>_links` array whose
//! `rel = "next"` entry points at the following page.

use super::common::Link;
use crate::error::{ComputeError, Result};
use crate::openstack::client::OpenStackClient;
use crate::openstack::http::ApiResponse;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Query parameters for list requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    params: BTreeMap<String, String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter such as `name`, `status`, `image`, `flavor` or `changes-since`
    pub fn filter(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Maximum number of items per page
    pub fn limit(self, limit: u32) -> Self {
        self.filter("limit", &limit.to_string())
    }

    /// Start after the resource with this ID
    pub fn marker(self, marker: &str) -> Self {
        self.filter("marker", marker)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Append the options to a URL, percent-encoding keys and values
    pub fn apply(&self, url: &str) -> Result<String> {
        if self.params.is_empty() {
            return Ok(url.to_string());
        }

        let mut parsed = url::Url::parse(url)
            .map_err(|e| ComputeError::InvalidParameter(format!("invalid URL '{}': {}", url, e)))?;
        parsed.query_pairs_mut().extend_pairs(self.params.iter());

        Ok(parsed.to_string())
    }
}

/// One page of a list result, able to fetch the following pages
pub struct Collection<T> {
    client: OpenStackClient,
    key: String,
    items: Vec<T>,
    next: Option<String>,
}

impl<T: DeserializeOwned> Collection<T> {
    /// Fetch the first page from `url`, reading items from the `key` member
    pub(crate) async fn fetch(client: &OpenStackClient, url: &str, key: &str) -> Result<Self> {
        let response = client.get(url).await?;
        Self::from_response(client.clone(), key, &response)
    }

    fn from_response(client: OpenStackClient, key: &str, response: &ApiResponse) -> Result<Self> {
        let items: Vec<T> = if response.body.get(key).is_some() {
            response.field(key)?
        } else {
            Vec::new()
        };

        let links: Vec<Link> = response
            .body
            .get(format!("{}_links", key))
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        let next = links
            .into_iter()
            .find(|link| link.rel == "next")
            .map(|link| link.href);

        Ok(Self {
            client,
            key: key.to_string(),
            items,
            next,
        })
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Replace the current page with the next one. Returns false when there
    /// is no further page.
    pub async fn next_page(&mut self) -> Result<bool> {
        let Some(next) = self.next.as_deref() else {
            return Ok(false);
        };

        // Kept until a page arrives, so a failed fetch can be retried
        let response = self.client.get(next).await?;
        let page = Self::from_response(self.client.clone(), &self.key, &response)?;
        self.next = None;

        // An empty page ends the listing even if the service sent a next link
        if page.items.is_empty() {
            self.items.clear();
            return Ok(false);
        }

        self.items = page.items;
        self.next = page.next;
        Ok(true)
    }

    /// Drain this page and every following page
    pub async fn into_all(mut self) -> Result<Vec<T>> {
        let mut all_items = std::mem::take(&mut self.items);

        while self.next_page().await? {
            all_items.append(&mut self.items);
        }

        Ok(all_items)
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
