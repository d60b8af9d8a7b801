// Error types for Palisade

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Deserialization(_) => 400,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::Serialization(_) | Error::Internal(_) => 500,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::Forbidden("csrf".into()).status_code(), 403);
        assert_eq!(Error::Deserialization("bad json".into()).status_code(), 400);
        assert_eq!(Error::NotFound("/nope".into()).status_code(), 404);
        assert_eq!(Error::Internal("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_error_classes() {
        assert!(Error::Forbidden("x".into()).is_client_error());
        assert!(!Error::Forbidden("x".into()).is_server_error());
        assert!(Error::Internal("x".into()).is_server_error());
    }
}
