// HTTP request and response types

use crate::cookies::Cookies;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP request wrapper
///
/// The body is fully buffered. Middleware that needs to look at it borrows
/// the bytes and hands the same request on, so nothing downstream ever sees a
/// partially consumed body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body: Vec::new(),
            query_params: HashMap::new(),
        }
    }

    /// Add a header. Names are stored lowercased, so a later header with the
    /// same name in any case replaces an earlier one.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Replace the body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Look up a header, ignoring ASCII case of the name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Media type of the body, without parameters such as `charset`
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
            .map(|value| value.split(';').next().unwrap_or(value).trim())
    }

    /// Check whether the body is declared as the given media type
    pub fn has_content_type(&self, media_type: &str) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.eq_ignore_ascii_case(media_type))
    }

    /// Parse the `Cookie` header
    pub fn cookies(&self) -> Cookies {
        self.header("Cookie").map(Cookies::parse).unwrap_or_default()
    }

    /// Get a single cookie value by name
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies().get(name).map(str::to_string)
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, crate::Error> {
        serde_json::from_slice(&self.body).map_err(|e| crate::Error::Deserialization(e.to_string()))
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }
}

/// HTTP response wrapper
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn forbidden() -> Self {
        Self::new(403)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, crate::Error> {
        self.body =
            serde_json::to_vec(value).map_err(|e| crate::Error::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Look up a header, ignoring ASCII case of the name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parse the response body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, crate::Error> {
        serde_json::from_slice(&self.body).map_err(|e| crate::Error::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let req = HttpRequest::new("POST", "/submit").with_header("x-csrf-token", "abc");
        assert_eq!(req.header("X-CSRF-Token"), Some("abc"));
        assert_eq!(req.header("X-XSRF-Token"), None);
    }

    #[test]
    fn test_header_names_normalized() {
        let req = HttpRequest::new("POST", "/submit")
            .with_header("X-CSRF-Token", "first")
            .with_header("x-csrf-token", "second");

        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.headers.get("x-csrf-token").map(String::as_str), Some("second"));
        assert_eq!(req.header("X-Csrf-Token"), Some("second"));
    }

    #[test]
    fn test_content_type_strips_parameters() {
        let req = HttpRequest::new("POST", "/submit")
            .with_header("Content-Type", "application/json; charset=utf-8");
        assert_eq!(req.content_type(), Some("application/json"));
        assert!(req.has_content_type("application/json"));
        assert!(!req.has_content_type("application/x-www-form-urlencoded"));
    }

    #[test]
    fn test_cookie_lookup() {
        let req = HttpRequest::new("POST", "/submit")
            .with_header("Cookie", "theme=dark; sessionid=abc123");
        assert_eq!(req.cookie("sessionid"), Some("abc123".to_string()));
        assert_eq!(req.cookie("missing"), None);

        let bare = HttpRequest::new("POST", "/submit");
        assert!(bare.cookies().is_empty());
    }

    #[test]
    fn test_response_with_json() {
        let response = HttpResponse::forbidden()
            .with_json(&serde_json::json!({ "error": "nope" }))
            .unwrap();

        assert_eq!(response.status, 403);
        assert_eq!(response.header("content-type"), Some("application/json"));

        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["error"], "nope");
    }
}
