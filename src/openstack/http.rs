//! HTTP utilities for OpenStack REST API calls

use crate::error::{ComputeError, Result};
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying the identity token on every authenticated request
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

pub const USER_AGENT: &str = concat!("oscompute/", env!("CARGO_PKG_VERSION"));

/// Longest prefix of `text` within `max` bytes that ends on a char boundary
fn byte_prefix(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Sanitize response body for logging
/// Truncates to `MAX_LOG_BODY_LENGTH` bytes and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let head = byte_prefix(body, MAX_LOG_BODY_LENGTH);
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Extract the human readable message from an OpenStack fault body.
///
/// Compute faults are wrapped in a single key naming the fault, e.g.
/// `{"itemNotFound": {"message": "...", "code": 404}}`.
pub fn fault_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    object.values().find_map(|fault| {
        fault
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
    })
}

/// A successful response: status, `Location` header and parsed JSON body
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Value,
}

impl ApiResponse {
    fn from_parts(status: StatusCode, headers: &HeaderMap, body: &str) -> Result<Self> {
        let location = headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let body = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(body)?
        };

        Ok(Self {
            status,
            location,
            body,
        })
    }

    /// Deserialize the member `key` of the body (e.g. `server` or `flavors`)
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.body.get(key).cloned().ok_or_else(|| ComputeError::Api {
            status: self.status,
            message: format!("response has no '{}' member", key),
        })?;
        Ok(serde_json::from_value(value)?)
    }
}

/// HTTP client wrapper for OpenStack API calls
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self { client })
    }

    /// Send a request and map non-success statuses to [`ComputeError::Api`]
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<ApiResponse> {
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");

        if let Some(token) = token {
            request = request.header(AUTH_TOKEN_HEADER, token);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            let message = fault_message(&text)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(ComputeError::Api { status, message });
        }

        ApiResponse::from_parts(status, &headers, &text)
    }

    pub async fn get(&self, url: &str, token: Option<&str>) -> Result<ApiResponse> {
        self.send(Method::GET, url, token, None).await
    }

    pub async fn post(&self, url: &str, token: Option<&str>, body: Option<&Value>) -> Result<ApiResponse> {
        self.send(Method::POST, url, token, body).await
    }

    pub async fn put(&self, url: &str, token: Option<&str>, body: Option<&Value>) -> Result<ApiResponse> {
        self.send(Method::PUT, url, token, body).await
    }

    pub async fn delete(&self, url: &str, token: Option<&str>) -> Result<ApiResponse> {
        self.send(Method::DELETE, url, token, None).await
    }
}

/// Format an API error for display
/// Maps common statuses to short explanations instead of raw fault text
pub fn format_api_error(error: &ComputeError) -> String {
    match error.status().map(|s| s.as_u16()) {
        Some(401) => "Authentication failed. Check your username and API key.".to_string(),
        Some(403) => "Permission denied for this tenant.".to_string(),
        Some(404) => "Resource not found.".to_string(),
        Some(409) => "Conflict. The server may be busy with another task.".to_string(),
        Some(413) => "Over limit. Your account quota or rate limit was exceeded.".to_string(),
        Some(s) if s >= 500 => "Compute service temporarily unavailable. Please try again.".to_string(),
        _ => {
            let text = error.to_string();
            let sanitized: String = text
                .chars()
                .filter(|c| c.is_ascii_graphic() || *c == ' ')
                .take(120)
                .collect();
            if sanitized.len() < text.len() {
                format!("{}...", sanitized)
            } else {
                sanitized
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_message_from_compute_fault() {
        let body = r#"{"itemNotFound": {"message": "Instance could not be found", "code": 404}}"#;
        assert_eq!(
            fault_message(body).as_deref(),
            Some("Instance could not be found")
        );
    }

    #[test]
    fn test_fault_message_ignores_non_json() {
        assert_eq!(fault_message("<html>Bad Gateway</html>"), None);
        assert_eq!(fault_message("{}"), None);
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.contains("500 bytes total"));
    }

    #[test]
    fn test_byte_prefix_respects_char_boundaries() {
        let text = "\u{20ac}".repeat(100);
        let head = byte_prefix(&text, MAX_LOG_BODY_LENGTH);
        assert_eq!(head.len(), 198);
        assert_eq!(head.chars().count(), 66);

        assert_eq!(byte_prefix("short", MAX_LOG_BODY_LENGTH), "short");
    }

    #[test]
    fn test_sanitize_multibyte_body_does_not_panic() {
        let body = format!("a{}", "\u{e9}".repeat(300));
        assert_eq!(sanitize_for_log(&body), "a... [truncated, 601 bytes total]");
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("bad\nrequest\t!"), "badrequest!");
    }

    #[test]
    fn test_response_field_and_location() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::LOCATION,
            "https://example.com/v2/9999/images/abc".parse().unwrap(),
        );
        let resp = ApiResponse::from_parts(
            StatusCode::ACCEPTED,
            &headers,
            r#"{"server": {"id": "abc"}}"#,
        )
        .unwrap();

        assert_eq!(resp.location.as_deref(), Some("https://example.com/v2/9999/images/abc"));
        let server: Value = resp.field("server").unwrap();
        assert_eq!(server["id"], "abc");
        assert!(resp.field::<Value>("flavor").is_err());
    }

    #[test]
    fn test_empty_body_is_null() {
        let resp = ApiResponse::from_parts(StatusCode::NO_CONTENT, &HeaderMap::new(), "").unwrap();
        assert!(resp.body.is_null());
    }

    #[test]
    fn test_format_api_error() {
        let err = ComputeError::Api {
            status: StatusCode::NOT_FOUND,
            message: "gone".to_string(),
        };
        assert_eq!(format_api_error(&err), "Resource not found.");

        let err = ComputeError::Image("image name is required".to_string());
        assert_eq!(format_api_error(&err), "Image error: image name is required");
    }
}
