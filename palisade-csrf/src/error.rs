use palisade_config::ConfigError;
use thiserror::Error;

/// Client-facing message for every token failure. Missing, malformed, expired
/// and forged tokens are indistinguishable from the outside.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid CSRF token";

/// Client-facing message when the request carries no session cookie.
pub const SESSION_REQUIRED_MESSAGE: &str = "Session required";

#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("Session required")]
    SessionRequired,

    #[error("Missing CSRF token")]
    MissingToken,

    #[error("Invalid CSRF token")]
    InvalidToken,

    #[error("Malformed CSRF token")]
    Malformed,

    #[error("CSRF token bound to a different session")]
    SessionMismatch,

    #[error("CSRF token expired")]
    TokenExpired,

    #[error("CSRF token signature mismatch")]
    InvalidSignature,

    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("Insecure configuration: {0}")]
    InsecureConfig(String),

    #[error("Invalid exempt route pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CsrfError {
    /// Message safe to show to the client
    pub fn client_message(&self) -> &'static str {
        match self {
            CsrfError::SessionRequired => SESSION_REQUIRED_MESSAGE,
            _ => INVALID_TOKEN_MESSAGE,
        }
    }

    /// True for the outcomes of checking a request, as opposed to
    /// configuration or programming errors
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CsrfError::SessionRequired
                | CsrfError::MissingToken
                | CsrfError::InvalidToken
                | CsrfError::Malformed
                | CsrfError::SessionMismatch
                | CsrfError::TokenExpired
                | CsrfError::InvalidSignature
        )
    }
}

impl From<CsrfError> for palisade_core::Error {
    fn from(err: CsrfError) -> Self {
        if err.is_rejection() {
            palisade_core::Error::Forbidden(err.client_message().to_string())
        } else {
            palisade_core::Error::Internal(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, CsrfError>;
