use crate::config::CsrfConfig;
use crate::error::{CsrfError, Result};
use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, trace};

type HmacSha256 = Hmac<Sha256>;

/// Bytes of randomness in each nonce
pub const NONCE_BYTES: usize = 32;

const FIELD_SEPARATOR: char = ':';

/// URL-safe base64 that writes padding but reads input with or without it.
/// Non-canonical trailing bits are still rejected.
const TOKEN_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Nonces are encoded like `secrets.token_urlsafe`: no padding.
const NONCE_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_encode_padding(false),
);

/// Verified contents of a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub session_id: String,
    /// Unix timestamp (seconds) at creation
    pub issued_at: i64,
    pub nonce: String,
    /// Index into [`CsrfConfig::signing_keys`] of the key that verified the
    /// signature; non-zero means a retired key
    pub key_index: usize,
}

impl TokenClaims {
    pub fn issued_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.issued_at, 0)
    }
}

/// Creates and verifies signed, session-bound, time-limited tokens.
///
/// A token is the URL-safe base64 encoding of
/// `session_id:issued_at:nonce:signature`, where the signature is
/// HMAC-SHA256 over the first three fields. Nothing is stored server side.
#[derive(Debug, Clone)]
pub struct TokenGenerator {
    config: Arc<CsrfConfig>,
}

impl TokenGenerator {
    pub fn new(config: Arc<CsrfConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    /// Generate a token for `session_id` at the current time
    pub fn generate_token(&self, session_id: &str) -> Result<String> {
        self.generate_token_at(session_id, Utc::now().timestamp())
    }

    /// Generate a token as if the clock read `now` (Unix seconds)
    pub fn generate_token_at(&self, session_id: &str, now: i64) -> Result<String> {
        if session_id.is_empty() {
            return Err(CsrfError::InvalidSessionId(
                "session id must not be empty".to_string(),
            ));
        }
        if session_id.contains(FIELD_SEPARATOR) {
            return Err(CsrfError::InvalidSessionId(format!(
                "session id must not contain '{}'",
                FIELD_SEPARATOR
            )));
        }

        let mut nonce_bytes = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = NONCE_B64.encode(nonce_bytes);

        let payload = format!("{}:{}:{}", session_id, now, nonce);
        let signature = sign(self.config.secret_key.as_bytes(), &payload)?;
        let token = format!("{}:{}", payload, TOKEN_B64.encode(signature));

        Ok(TOKEN_B64.encode(token))
    }

    /// Check a token against `session_id` at the current time. Never fails:
    /// every problem yields `false`.
    pub fn validate_token(&self, token: &str, session_id: &str) -> bool {
        self.validate_token_at(token, session_id, Utc::now().timestamp())
    }

    /// [`validate_token`](Self::validate_token) with an explicit clock
    pub fn validate_token_at(&self, token: &str, session_id: &str, now: i64) -> bool {
        match self.inspect(token, session_id, now) {
            Ok(claims) => {
                if claims.key_index > 0 {
                    trace!(key_index = claims.key_index, "CSRF token verified with a retired key");
                }
                true
            }
            Err(reason) => {
                debug!(reason = %reason, "CSRF token rejected");
                false
            }
        }
    }

    /// Decode and verify a token, reporting why it was rejected.
    ///
    /// The distinction is for logs and tests only; clients must never see it.
    pub fn inspect(&self, token: &str, session_id: &str, now: i64) -> Result<TokenClaims> {
        let decoded = TOKEN_B64.decode(token).map_err(|_| CsrfError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| CsrfError::Malformed)?;

        let parts: Vec<&str> = decoded.split(FIELD_SEPARATOR).collect();
        let [token_session_id, issued_at, nonce, signature] = parts.as_slice() else {
            return Err(CsrfError::Malformed);
        };

        if *token_session_id != session_id {
            return Err(CsrfError::SessionMismatch);
        }

        let issued_at_secs: i64 = issued_at.parse().map_err(|_| CsrfError::Malformed)?;
        if now.saturating_sub(issued_at_secs) > self.config.token_expiry_seconds {
            return Err(CsrfError::TokenExpired);
        }

        let provided = TOKEN_B64
            .decode(signature)
            .map_err(|_| CsrfError::Malformed)?;
        let payload = format!("{}:{}:{}", token_session_id, issued_at, nonce);

        for (key_index, key) in self.config.signing_keys().enumerate() {
            if verify(key.as_bytes(), &payload, &provided)? {
                return Ok(TokenClaims {
                    session_id: token_session_id.to_string(),
                    issued_at: issued_at_secs,
                    nonce: nonce.to_string(),
                    key_index,
                });
            }
        }

        Err(CsrfError::InvalidSignature)
    }
}

fn mac_for(key: &[u8], payload: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| CsrfError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Sign data with HMAC-SHA256
fn sign(key: &[u8], payload: &str) -> Result<Vec<u8>> {
    Ok(mac_for(key, payload)?.finalize().into_bytes().to_vec())
}

/// Constant-time comparison of `provided` with the expected signature
fn verify(key: &[u8], payload: &str, provided: &[u8]) -> Result<bool> {
    Ok(mac_for(key, payload)?.verify_slice(provided).is_ok())
}
