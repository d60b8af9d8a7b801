//! # Palisade CSRF Protection
//!
//! Stateless Cross-Site Request Forgery protection.
//!
//! ## Features
//!
//! - ✅ **Signed Tokens** - HMAC-SHA256 over session id, timestamp and nonce
//! - ✅ **Session Binding** - A token only validates for the session it was issued to
//! - ✅ **No Server State** - Nothing is stored between issuing and checking a token
//! - ✅ **Key Rotation** - Sign with the newest key, accept any configured key
//! - ✅ **Path Exemption** - Skip routes matching regex patterns
//! - ✅ **Middleware Integration** - Implements `palisade_core::Middleware`
//!
//! ## Quick Start
//!
//! ```rust
//! use palisade_csrf::{CsrfConfig, CsrfMiddleware};
//!
//! let config = CsrfConfig::new(CsrfConfig::generate_secret())
//!     .with_token_expiry(1800)
//!     .exempt_route("/api/public/");
//!
//! let csrf = CsrfMiddleware::new(config).unwrap();
//!
//! let token = csrf.generate_token("session-abc").unwrap();
//! assert!(csrf.generator().validate_token(&token, "session-abc"));
//! assert!(!csrf.generator().validate_token(&token, "session-xyz"));
//! ```
//!
//! ## Checking Requests
//!
//! Unsafe requests need a `sessionid` cookie and a token in the
//! `X-CSRF-Token`/`X-XSRF-Token` header, or in the `csrf_token` field of a
//! form or JSON body.
//!
//! ```rust
//! use palisade_core::HttpRequest;
//! use palisade_csrf::{CsrfConfig, CsrfError, CsrfMiddleware};
//!
//! let csrf = CsrfMiddleware::new(CsrfConfig::new("a-long-enough-demo-secret")).unwrap();
//! let token = csrf.generate_token("abc123").unwrap();
//!
//! let req = HttpRequest::new("POST", "/transfer")
//!     .with_header("Cookie", "sessionid=abc123")
//!     .with_header("X-CSRF-Token", token);
//! assert!(csrf.validate_request(&req).is_ok());
//!
//! let forged = HttpRequest::new("POST", "/transfer").with_header("Cookie", "sessionid=abc123");
//! assert!(matches!(csrf.validate_request(&forged), Err(CsrfError::MissingToken)));
//! ```
//!
//! ## Usage in a Middleware Chain
//!
//! ```ignore
//! use palisade_core::MiddlewareChain;
//! use palisade_csrf::{CsrfConfig, CsrfMiddleware};
//!
//! let mut chain = MiddlewareChain::new();
//! chain.use_middleware(CsrfMiddleware::new(CsrfConfig::from_env()?)?);
//!
//! let response = chain.apply(request, handler).await?;
//! ```

pub mod config;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod token;

pub use config::{CsrfConfig, CsrfSettings, SameSite};
pub use error::{CsrfError, Result};
pub use extractor::{ExtractorChain, FormExtractor, HeaderExtractor, JsonExtractor, TokenExtractor};
pub use middleware::CsrfMiddleware;
pub use token::{TokenClaims, TokenGenerator};
