use crate::error::{CsrfError, Result};
use palisade_config::{
    ConfigLoader, ConfigValidator, EnvLoader, Validate, parse_bool, parse_list,
};
use rand::{RngCore, rngs::OsRng};
use regex::RegexSet;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Placeholder signing key used when nothing is configured. Accepted outside
/// production with a startup warning, rejected in production.
pub const DEFAULT_SECRET_KEY: &str = "your-secret-key-change-in-production";

/// Default token validity window in seconds (1 hour)
pub const DEFAULT_TOKEN_EXPIRY_SECONDS: i64 = 3600;

/// Default cap on bodies inspected for a token (1 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Minimum signing key length required in production
pub const MIN_PRODUCTION_KEY_LEN: usize = 32;

/// Environment variable prefix read by [`CsrfConfig::from_env`]
pub const ENV_PREFIX: &str = "CSRF";

/// CSRF protection configuration
///
/// Built once at startup and shared read-only by the token generator and the
/// middleware. The `Debug` output redacts the keys.
#[derive(Clone)]
pub struct CsrfConfig {
    /// Key used to sign new tokens
    pub secret_key: String,

    /// Retired keys still accepted when verifying, newest first
    pub previous_secret_keys: Vec<String>,

    /// Token validity window in seconds
    pub token_expiry_seconds: i64,

    /// Regex patterns; a request whose path matches any of them is not checked
    pub exempt_route_patterns: Vec<String>,

    /// Safe HTTP methods (not checked for CSRF)
    pub safe_methods: Vec<String>,

    /// Header names searched for the token, in order
    pub header_names: Vec<String>,

    /// Form / JSON field name carrying the token
    pub field_name: String,

    /// Cookie holding the session identifier
    pub session_cookie_name: String,

    /// Cookie name used when handing a token to the client
    pub cookie_name: String,

    /// Cookie domain
    pub cookie_domain: Option<String>,

    /// Cookie path
    pub cookie_path: String,

    /// Cookie secure flag (HTTPS only)
    pub cookie_secure: bool,

    /// Cookie HttpOnly flag. Off by default so page scripts can copy the
    /// token into a request header.
    pub cookie_http_only: bool,

    /// Cookie SameSite policy
    pub cookie_same_site: SameSite,

    /// Bodies larger than this are not searched for a token
    pub max_body_size: usize,

    /// Production mode turns insecure-key warnings into errors
    pub production: bool,
}

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }
}

impl CsrfConfig {
    /// Create a configuration with the given signing key and defaults for
    /// everything else
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            previous_secret_keys: Vec::new(),
            token_expiry_seconds: DEFAULT_TOKEN_EXPIRY_SECONDS,
            exempt_route_patterns: Vec::new(),
            safe_methods: vec![
                "GET".to_string(),
                "HEAD".to_string(),
                "OPTIONS".to_string(),
            ],
            header_names: vec!["X-CSRF-Token".to_string(), "X-XSRF-Token".to_string()],
            field_name: "csrf_token".to_string(),
            session_cookie_name: "sessionid".to_string(),
            cookie_name: "csrftoken".to_string(),
            cookie_domain: None,
            cookie_path: "/".to_string(),
            cookie_secure: true,
            cookie_http_only: false,
            cookie_same_site: SameSite::Strict,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            production: false,
        }
    }

    /// Generate a random signing key (32 bytes, base64url encoded)
    pub fn generate_secret() -> String {
        use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Load from `CSRF_*` environment variables (after reading `.env` if
    /// present) and validate
    pub fn from_env() -> Result<Self> {
        let vars = EnvLoader::with_prefix(ENV_PREFIX).with_dotenv(None)?.load()?;
        Self::from_env_map(&vars)
    }

    /// Build from already collected variables, keyed without the prefix and
    /// lowercased (`secret_key`, `token_expiry`, ...), and validate
    pub fn from_env_map(vars: &HashMap<String, String>) -> Result<Self> {
        let config = CsrfSettings::from_env_map(vars)?.apply(Self::default());
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON or TOML file and validate
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings: CsrfSettings = ConfigLoader::auto(path)?.load_as(path)?;
        let config = settings.apply(Self::default());
        config.validate()?;
        Ok(config)
    }

    /// Set the signing key
    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = secret_key.into();
        self
    }

    /// Keys still accepted for verification after a rotation
    pub fn with_previous_secret_keys(mut self, keys: Vec<String>) -> Self {
        self.previous_secret_keys = keys;
        self
    }

    /// Move the current key to the verification-only list and sign with a
    /// new one
    pub fn rotate_secret_key(mut self, new_key: impl Into<String>) -> Self {
        let old = std::mem::replace(&mut self.secret_key, new_key.into());
        self.previous_secret_keys.insert(0, old);
        self
    }

    /// Set token expiry
    pub fn with_token_expiry(mut self, seconds: i64) -> Self {
        self.token_expiry_seconds = seconds;
        self
    }

    /// Replace the exempt route patterns
    pub fn with_exempt_routes(mut self, patterns: Vec<String>) -> Self {
        self.exempt_route_patterns = patterns;
        self
    }

    /// Add one exempt route pattern
    pub fn exempt_route(mut self, pattern: impl Into<String>) -> Self {
        self.exempt_route_patterns.push(pattern.into());
        self
    }

    /// Replace the safe methods
    pub fn with_safe_methods(mut self, methods: Vec<String>) -> Self {
        self.safe_methods = methods;
        self
    }

    /// Replace the header names searched for the token
    pub fn with_header_names(mut self, names: Vec<String>) -> Self {
        self.header_names = names;
        self
    }

    /// Set field name
    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Set session cookie name
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.session_cookie_name = name.into();
        self
    }

    /// Set cookie name
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set cookie domain
    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Set cookie path
    pub fn with_cookie_path(mut self, path: impl Into<String>) -> Self {
        self.cookie_path = path.into();
        self
    }

    /// Set cookie secure flag
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Set cookie HttpOnly flag
    pub fn with_cookie_http_only(mut self, http_only: bool) -> Self {
        self.cookie_http_only = http_only;
        self
    }

    /// Set cookie SameSite policy
    pub fn with_cookie_same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_same_site = same_site;
        self
    }

    /// Set the body inspection limit
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Enable or disable production mode
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Whether the method skips CSRF checks (case-insensitive)
    pub fn is_safe_method(&self, method: &str) -> bool {
        self.safe_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method))
    }

    /// Whether the placeholder key is still in use
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }

    /// Signing key first, then previous keys
    pub fn signing_keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.secret_key.as_str())
            .chain(self.previous_secret_keys.iter().map(String::as_str))
    }

    /// Compile the exempt route patterns. Each pattern is anchored at the
    /// start of the path.
    pub fn compile_exemptions(&self) -> Result<RegexSet> {
        let anchored = self
            .exempt_route_patterns
            .iter()
            .map(|p| format!("^(?:{})", p.strip_prefix('^').unwrap_or(p.as_str())));
        Ok(RegexSet::new(anchored)?)
    }

    /// Log a warning for settings that are tolerated outside production
    pub fn warn_if_insecure(&self) {
        if self.uses_default_secret() {
            warn!(
                "CSRF protection is using the default secret key; set CSRF_SECRET_KEY before deploying"
            );
        } else if self.secret_key.len() < MIN_PRODUCTION_KEY_LEN {
            warn!(
                key_len = self.secret_key.len(),
                min_len = MIN_PRODUCTION_KEY_LEN,
                "CSRF secret key is shorter than recommended"
            );
        }
        if !self.cookie_secure {
            warn!("CSRF token cookie is not marked Secure");
        }
    }
}

impl Validate for CsrfConfig {
    fn validate(&self) -> palisade_config::Result<()> {
        ConfigValidator::not_empty(&self.secret_key, "secret_key")?;
        ConfigValidator::no_blank_entries(&self.previous_secret_keys, "previous_secret_keys")?;
        ConfigValidator::in_range(self.token_expiry_seconds, 1, i64::MAX, "token_expiry_seconds")?;
        ConfigValidator::no_blank_entries(&self.safe_methods, "safe_methods")?;
        ConfigValidator::no_blank_entries(&self.header_names, "header_names")?;
        ConfigValidator::not_empty(&self.field_name, "field_name")?;
        ConfigValidator::not_empty(&self.session_cookie_name, "session_cookie_name")?;
        ConfigValidator::not_empty(&self.cookie_name, "cookie_name")?;
        Ok(())
    }
}

impl CsrfConfig {
    /// Check the configuration, including the production key policy and the
    /// exempt route patterns
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self)?;

        if self.production {
            if self.uses_default_secret() {
                return Err(CsrfError::InsecureConfig(
                    "the default secret key must be overridden in production".to_string(),
                ));
            }
            if self.secret_key.len() < MIN_PRODUCTION_KEY_LEN {
                return Err(CsrfError::InsecureConfig(format!(
                    "secret key must be at least {} bytes in production",
                    MIN_PRODUCTION_KEY_LEN
                )));
            }
        }

        self.compile_exemptions()?;
        Ok(())
    }
}

impl fmt::Debug for CsrfConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfConfig")
            .field("secret_key", &"<redacted>")
            .field("previous_secret_keys", &self.previous_secret_keys.len())
            .field("token_expiry_seconds", &self.token_expiry_seconds)
            .field("exempt_route_patterns", &self.exempt_route_patterns)
            .field("safe_methods", &self.safe_methods)
            .field("header_names", &self.header_names)
            .field("field_name", &self.field_name)
            .field("session_cookie_name", &self.session_cookie_name)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_domain", &self.cookie_domain)
            .field("cookie_path", &self.cookie_path)
            .field("cookie_secure", &self.cookie_secure)
            .field("cookie_http_only", &self.cookie_http_only)
            .field("cookie_same_site", &self.cookie_same_site)
            .field("max_body_size", &self.max_body_size)
            .field("production", &self.production)
            .finish()
    }
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET_KEY)
    }
}

/// Partial configuration as read from a file or the environment. Unset
/// fields keep the value of the configuration they are applied to.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsrfSettings {
    pub secret_key: Option<String>,
    pub previous_secret_keys: Option<Vec<String>>,
    pub token_expiry_seconds: Option<i64>,
    pub exempt_route_patterns: Option<Vec<String>>,
    pub safe_methods: Option<Vec<String>>,
    pub header_names: Option<Vec<String>>,
    pub field_name: Option<String>,
    pub session_cookie_name: Option<String>,
    pub cookie_name: Option<String>,
    pub cookie_domain: Option<String>,
    pub cookie_path: Option<String>,
    pub cookie_secure: Option<bool>,
    pub cookie_http_only: Option<bool>,
    pub cookie_same_site: Option<SameSite>,
    pub max_body_size: Option<usize>,
    pub production: Option<bool>,
}

impl CsrfSettings {
    /// Read settings from prefix-stripped, lowercased environment variables
    pub fn from_env_map(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).map(String::as_str);
        let parse_int = |value: &str, field: &str| {
            value.trim().parse::<i64>().map_err(|_| {
                palisade_config::ConfigError::ParseError(format!(
                    "{} must be an integer, got '{}'",
                    field, value
                ))
            })
        };

        let token_expiry_seconds = match get("token_expiry").or_else(|| get("token_expiry_seconds")) {
            Some(v) => Some(parse_int(v, "token_expiry")?),
            None => None,
        };
        let max_body_size = match get("max_body_size") {
            Some(v) => Some(usize::try_from(parse_int(v, "max_body_size")?).map_err(|_| {
                palisade_config::ConfigError::ParseError(
                    "max_body_size must not be negative".to_string(),
                )
            })?),
            None => None,
        };
        let cookie_same_site = match get("cookie_same_site") {
            Some(v) => Some(SameSite::parse(v).ok_or_else(|| {
                palisade_config::ConfigError::ParseError(format!(
                    "cookie_same_site must be strict, lax or none, got '{}'",
                    v
                ))
            })?),
            None => None,
        };
        let flag = |key: &str| get(key).map(|v| parse_bool(v, key)).transpose();

        Ok(Self {
            secret_key: get("secret_key").map(str::to_string),
            previous_secret_keys: get("previous_secret_keys").map(parse_list),
            token_expiry_seconds,
            exempt_route_patterns: get("exempt_routes")
                .or_else(|| get("exempt_route_patterns"))
                .map(parse_list),
            safe_methods: get("safe_methods").map(parse_list),
            header_names: get("header_names").map(parse_list),
            field_name: get("field_name").map(str::to_string),
            session_cookie_name: get("session_cookie_name").map(str::to_string),
            cookie_name: get("cookie_name").map(str::to_string),
            cookie_domain: get("cookie_domain").map(str::to_string),
            cookie_path: get("cookie_path").map(str::to_string),
            cookie_secure: flag("cookie_secure")?,
            cookie_http_only: flag("cookie_http_only")?,
            cookie_same_site,
            max_body_size,
            production: flag("production")?,
        })
    }

    /// Overlay the set fields onto `config`
    pub fn apply(self, mut config: CsrfConfig) -> CsrfConfig {
        if let Some(v) = self.secret_key {
            config.secret_key = v;
        }
        if let Some(v) = self.previous_secret_keys {
            config.previous_secret_keys = v;
        }
        if let Some(v) = self.token_expiry_seconds {
            config.token_expiry_seconds = v;
        }
        if let Some(v) = self.exempt_route_patterns {
            config.exempt_route_patterns = v;
        }
        if let Some(v) = self.safe_methods {
            config.safe_methods = v;
        }
        if let Some(v) = self.header_names {
            config.header_names = v;
        }
        if let Some(v) = self.field_name {
            config.field_name = v;
        }
        if let Some(v) = self.session_cookie_name {
            config.session_cookie_name = v;
        }
        if let Some(v) = self.cookie_name {
            config.cookie_name = v;
        }
        if self.cookie_domain.is_some() {
            config.cookie_domain = self.cookie_domain;
        }
        if let Some(v) = self.cookie_path {
            config.cookie_path = v;
        }
        if let Some(v) = self.cookie_secure {
            config.cookie_secure = v;
        }
        if let Some(v) = self.cookie_http_only {
            config.cookie_http_only = v;
        }
        if let Some(v) = self.cookie_same_site {
            config.cookie_same_site = v;
        }
        if let Some(v) = self.max_body_size {
            config.max_body_size = v;
        }
        if let Some(v) = self.production {
            config.production = v;
        }
        config
    }
}
