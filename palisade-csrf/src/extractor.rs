//! Token extractors
//!
//! Each extractor looks in one place of a request. The chain asks them in
//! order and stops at the first non-empty value. Extractors only borrow the
//! request, so a body read here is still intact for the downstream handler.

use crate::config::CsrfConfig;
use palisade_core::HttpRequest;
use tracing::trace;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A place a CSRF token may be carried in
pub trait TokenExtractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// The token, if this location holds a non-empty one
    fn extract(&self, request: &HttpRequest) -> Option<String>;
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn body_within_limit(request: &HttpRequest, max_body_size: usize) -> bool {
    if request.body.len() > max_body_size {
        trace!(
            body_len = request.body.len(),
            max_body_size, "Request body too large to search for a CSRF token"
        );
        return false;
    }
    true
}

/// Looks through request headers, first configured name first
#[derive(Debug, Clone)]
pub struct HeaderExtractor {
    names: Vec<String>,
}

impl HeaderExtractor {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl TokenExtractor for HeaderExtractor {
    fn name(&self) -> &'static str {
        "header"
    }

    fn extract(&self, request: &HttpRequest) -> Option<String> {
        self.names
            .iter()
            .find_map(|name| request.header(name).and_then(non_empty))
    }
}

/// Reads a field of an `application/x-www-form-urlencoded` body
#[derive(Debug, Clone)]
pub struct FormExtractor {
    field: String,
    max_body_size: usize,
}

impl FormExtractor {
    pub fn new(field: impl Into<String>, max_body_size: usize) -> Self {
        Self {
            field: field.into(),
            max_body_size,
        }
    }
}

impl TokenExtractor for FormExtractor {
    fn name(&self) -> &'static str {
        "form"
    }

    fn extract(&self, request: &HttpRequest) -> Option<String> {
        if !request.has_content_type(FORM_CONTENT_TYPE)
            || request.body.is_empty()
            || !body_within_limit(request, self.max_body_size)
        {
            return None;
        }

        let pairs = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&request.body).ok()?;
        pairs
            .into_iter()
            .find(|(key, _)| *key == self.field)
            .and_then(|(_, value)| non_empty(&value))
    }
}

/// Reads a top-level string field of an `application/json` body
#[derive(Debug, Clone)]
pub struct JsonExtractor {
    field: String,
    max_body_size: usize,
}

impl JsonExtractor {
    pub fn new(field: impl Into<String>, max_body_size: usize) -> Self {
        Self {
            field: field.into(),
            max_body_size,
        }
    }
}

impl TokenExtractor for JsonExtractor {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extract(&self, request: &HttpRequest) -> Option<String> {
        if !request.has_content_type(JSON_CONTENT_TYPE)
            || request.body.is_empty()
            || !body_within_limit(request, self.max_body_size)
        {
            return None;
        }

        let json = serde_json::from_slice::<serde_json::Value>(&request.body).ok()?;
        json.get(&self.field)?.as_str().and_then(non_empty)
    }
}

/// Ordered list of extractors
#[derive(Default)]
pub struct ExtractorChain {
    extractors: Vec<Box<dyn TokenExtractor>>,
}

impl ExtractorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers, then form body, then JSON body
    pub fn from_config(config: &CsrfConfig) -> Self {
        Self::new()
            .with(HeaderExtractor::new(config.header_names.clone()))
            .with(FormExtractor::new(
                config.field_name.clone(),
                config.max_body_size,
            ))
            .with(JsonExtractor::new(
                config.field_name.clone(),
                config.max_body_size,
            ))
    }

    /// Append an extractor
    pub fn with<E: TokenExtractor + 'static>(mut self, extractor: E) -> Self {
        self.push(extractor);
        self
    }

    pub fn push<E: TokenExtractor + 'static>(&mut self, extractor: E) {
        self.extractors.push(Box::new(extractor));
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// First non-empty token found, in chain order
    pub fn locate(&self, request: &HttpRequest) -> Option<String> {
        self.extractors.iter().find_map(|extractor| {
            let token = extractor.extract(request)?;
            trace!(source = extractor.name(), "Found CSRF token");
            Some(token)
        })
    }
}

impl std::fmt::Debug for ExtractorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.extractors.iter().map(|e| e.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ExtractorChain {
        ExtractorChain::from_config(&CsrfConfig::default())
    }

    fn post() -> HttpRequest {
        HttpRequest::new("POST", "/submit")
    }

    #[test]
    fn test_default_chain_order() {
        let chain = chain();
        assert_eq!(chain.len(), 3);
        assert_eq!(format!("{:?}", chain), r#"["header", "form", "json"]"#);
    }

    #[test]
    fn test_header_names_in_order() {
        let extractor = HeaderExtractor::new(vec!["X-CSRF-Token".into(), "X-XSRF-Token".into()]);

        let xsrf = post().with_header("x-xsrf-token", "from-xsrf");
        assert_eq!(extractor.extract(&xsrf).as_deref(), Some("from-xsrf"));

        let both = post()
            .with_header("X-XSRF-Token", "second")
            .with_header("X-CSRF-Token", "first");
        assert_eq!(extractor.extract(&both).as_deref(), Some("first"));

        let empty_first = post()
            .with_header("X-CSRF-Token", "  ")
            .with_header("X-XSRF-Token", "fallback");
        assert_eq!(extractor.extract(&empty_first).as_deref(), Some("fallback"));
    }

    #[test]
    fn test_form_field() {
        let extractor = FormExtractor::new("csrf_token", 1024);
        let req = post()
            .with_header("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8")
            .with_body("name=alice&csrf_token=abc%3D%3D&x=1");
        assert_eq!(extractor.extract(&req).as_deref(), Some("abc=="));

        let wrong_type = post()
            .with_header("Content-Type", "text/plain")
            .with_body("csrf_token=abc");
        assert_eq!(extractor.extract(&wrong_type), None);

        let missing = post()
            .with_header("Content-Type", FORM_CONTENT_TYPE)
            .with_body("name=alice");
        assert_eq!(extractor.extract(&missing), None);
    }

    #[test]
    fn test_json_field() {
        let extractor = JsonExtractor::new("csrf_token", 1024);
        let req = post()
            .with_header("Content-Type", JSON_CONTENT_TYPE)
            .with_body(r#"{"csrf_token": "abc", "amount": 10}"#);
        assert_eq!(extractor.extract(&req).as_deref(), Some("abc"));

        for body in [
            r#"{"csrf_token": 42}"#,
            r#"{"csrf_token": ""}"#,
            r#"["csrf_token"]"#,
            "{not json",
        ] {
            let req = post()
                .with_header("Content-Type", JSON_CONTENT_TYPE)
                .with_body(body);
            assert_eq!(extractor.extract(&req), None, "{body}");
        }
    }

    #[test]
    fn test_body_limit() {
        let extractor = JsonExtractor::new("csrf_token", 16);
        let req = post()
            .with_header("Content-Type", JSON_CONTENT_TYPE)
            .with_body(r#"{"csrf_token": "abcdefghijklmnop"}"#);
        assert_eq!(extractor.extract(&req), None);
    }

    #[test]
    fn test_header_wins_over_body() {
        let req = post()
            .with_header("X-CSRF-Token", "header-token")
            .with_header("Content-Type", JSON_CONTENT_TYPE)
            .with_body(r#"{"csrf_token": "body-token"}"#);
        assert_eq!(chain().locate(&req).as_deref(), Some("header-token"));
    }

    #[test]
    fn test_locate_leaves_body_untouched() {
        let body = r#"{"csrf_token": "body-token", "note": "keep me"}"#;
        let req = post()
            .with_header("Content-Type", JSON_CONTENT_TYPE)
            .with_body(body);

        assert_eq!(chain().locate(&req).as_deref(), Some("body-token"));
        assert_eq!(req.body, body.as_bytes());
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(chain().locate(&post()), None);
        assert!(ExtractorChain::new().locate(&post()).is_none());
    }

    #[test]
    fn test_custom_extractor() {
        struct QueryExtractor;

        impl TokenExtractor for QueryExtractor {
            fn name(&self) -> &'static str {
                "query"
            }

            fn extract(&self, request: &HttpRequest) -> Option<String> {
                request.query("csrf_token").cloned()
            }
        }

        let chain = ExtractorChain::new().with(QueryExtractor);
        let mut req = post();
        req.query_params
            .insert("csrf_token".to_string(), "q".to_string());
        assert_eq!(chain.locate(&req).as_deref(), Some("q"));
    }
}
