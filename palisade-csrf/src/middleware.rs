use crate::config::CsrfConfig;
use crate::error::{CsrfError, Result};
use crate::extractor::ExtractorChain;
use crate::token::TokenGenerator;
use async_trait::async_trait;
use palisade_core::{Error as CoreError, HttpRequest, HttpResponse, Middleware, Next};
use regex::RegexSet;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, trace};

/// `error` field of the rejection body
pub const REJECTION_ERROR: &str = "CSRF Validation Failed";

/// `code` field of the rejection body
pub const REJECTION_CODE: &str = "csrf_validation_failed";

/// CSRF protection middleware
///
/// Safe methods and exempt paths pass straight through. Every other request
/// needs a session cookie and a token bound to that session, or it is
/// answered with a 403 without reaching the handler.
#[derive(Clone)]
pub struct CsrfMiddleware {
    config: Arc<CsrfConfig>,
    generator: TokenGenerator,
    exemptions: RegexSet,
    extractors: Arc<ExtractorChain>,
}

impl CsrfMiddleware {
    /// Create middleware with the default extractor chain (headers, form
    /// body, JSON body)
    pub fn new(config: CsrfConfig) -> Result<Self> {
        let extractors = ExtractorChain::from_config(&config);
        Self::with_extractors(config, extractors)
    }

    /// Create middleware with a custom extractor chain
    pub fn with_extractors(config: CsrfConfig, extractors: ExtractorChain) -> Result<Self> {
        config.validate()?;
        config.warn_if_insecure();

        let exemptions = config.compile_exemptions()?;
        let config = Arc::new(config);

        debug!(
            exempt_routes = config.exempt_route_patterns.len(),
            safe_methods = ?config.safe_methods,
            extractors = ?extractors,
            "CSRF middleware configured"
        );

        Ok(Self {
            generator: TokenGenerator::new(config.clone()),
            config,
            exemptions,
            extractors: Arc::new(extractors),
        })
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    pub fn generator(&self) -> &TokenGenerator {
        &self.generator
    }

    /// Whether `path` matches an exempt route pattern
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exemptions.is_match(path)
    }

    /// Check if request needs CSRF protection
    pub fn needs_protection(&self, request: &HttpRequest) -> bool {
        !(self.config.is_safe_method(&request.method) || self.is_exempt(&request.path))
    }

    /// Session identifier from the session cookie, if present and non-empty
    pub fn session_id(&self, request: &HttpRequest) -> Option<String> {
        request
            .cookie(&self.config.session_cookie_name)
            .filter(|id| !id.is_empty())
    }

    /// Run the full check without a downstream handler
    pub fn validate_request(&self, request: &HttpRequest) -> Result<()> {
        if !self.needs_protection(request) {
            return Ok(());
        }

        let session_id = self.session_id(request).ok_or(CsrfError::SessionRequired)?;
        let token = self
            .extractors
            .locate(request)
            .ok_or(CsrfError::MissingToken)?;

        if !self.generator.validate_token(&token, &session_id) {
            return Err(CsrfError::InvalidToken);
        }

        Ok(())
    }

    /// Generate a token for embedding in a response (forms, templates)
    pub fn generate_token(&self, session_id: &str) -> Result<String> {
        self.generator.generate_token(session_id)
    }

    /// Add CSRF token to response as cookie
    pub fn add_token_cookie(&self, response: HttpResponse, token: &str) -> HttpResponse {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}",
            self.config.cookie_name,
            token,
            self.config.cookie_path,
            self.config.token_expiry_seconds
        );

        if let Some(ref domain) = self.config.cookie_domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }

        if self.config.cookie_secure {
            cookie.push_str("; Secure");
        }

        if self.config.cookie_http_only {
            cookie.push_str("; HttpOnly");
        }

        cookie.push_str(&format!(
            "; SameSite={}",
            self.config.cookie_same_site.as_str()
        ));

        response.with_header("Set-Cookie".to_string(), cookie)
    }

    /// Generate a token for `session_id` and set it as a cookie. Returns the
    /// response and the token so it can also be rendered into a form.
    pub fn issue_token(
        &self,
        response: HttpResponse,
        session_id: &str,
    ) -> Result<(HttpResponse, String)> {
        let token = self.generate_token(session_id)?;
        Ok((self.add_token_cookie(response, &token), token))
    }

    /// Fixed 403 response for a failed check
    pub fn rejection_response(
        &self,
        reason: &CsrfError,
    ) -> std::result::Result<HttpResponse, CoreError> {
        HttpResponse::forbidden().with_json(&json!({
            "error": REJECTION_ERROR,
            "message": reason.client_message(),
            "code": REJECTION_CODE,
        }))
    }
}

impl std::fmt::Debug for CsrfMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfMiddleware")
            .field("config", &self.config)
            .field("extractors", &self.extractors)
            .finish()
    }
}

#[async_trait]
impl Middleware for CsrfMiddleware {
    async fn handle(
        &self,
        req: HttpRequest,
        next: Next,
    ) -> std::result::Result<HttpResponse, CoreError> {
        match self.validate_request(&req) {
            Ok(()) => {
                trace!(method = %req.method, path = %req.path, "CSRF check passed");
                next(req).await
            }
            Err(reason) => {
                debug!(
                    method = %req.method,
                    path = %req.path,
                    reason = %reason,
                    "Rejecting request: CSRF validation failed"
                );
                self.rejection_response(&reason)
            }
        }
    }
}
