// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Environment variable loader
///
/// With a prefix such as `CSRF`, `CSRF_SECRET_KEY` is exposed as
/// `secret_key`. Variables outside the prefix are ignored.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Create a loader for variables starting with `prefix_`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::new(Some(prefix.into()))
    }

    /// Load `.env` into the process environment, then return the loader.
    ///
    /// A missing default `.env` is not an error; a missing explicit path is.
    /// A file that exists but does not parse is always an error.
    pub fn with_dotenv(self, path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => skip_missing(dotenvy::dotenv().map(|_| ()))?,
        }
        Ok(self)
    }

    /// Load all matching environment variables
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    /// Apply the prefix rules to an arbitrary set of variables
    pub fn collect<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = HashMap::new();

        for (key, value) in vars {
            match self.prefix {
                Some(ref prefix) => {
                    let Some(rest) = key.strip_prefix(prefix.as_str()) else {
                        continue;
                    };
                    let Some(trimmed) = rest.strip_prefix('_') else {
                        continue;
                    };
                    config.insert(trimmed.to_lowercase(), value);
                }
                None => {
                    config.insert(key.to_lowercase(), value);
                }
            }
        }

        config
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Treat a missing `.env` as empty, report anything else
fn skip_missing(result: std::result::Result<(), dotenvy::Error>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ConfigError::LoadError(format!(".env: {}", e))),
    }
}

/// Split a comma separated value, dropping blank entries
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a boolean flag (`1/0`, `true/false`, `yes/no`, `on/off`)
pub fn parse_bool(value: &str, field: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::ParseError(format!(
            "{} must be a boolean, got '{}'",
            field, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_collect_applies_prefix() {
        let loader = EnvLoader::with_prefix("CSRF");
        let config = loader.collect(vars(&[
            ("CSRF_SECRET_KEY", "s3cret"),
            ("CSRF_TOKEN_EXPIRY", "60"),
            ("CSRFX_OTHER", "ignored"),
            ("PATH", "/usr/bin"),
        ]));

        assert_eq!(config.len(), 2);
        assert_eq!(config.get("secret_key").map(String::as_str), Some("s3cret"));
        assert_eq!(config.get("token_expiry").map(String::as_str), Some("60"));
    }

    #[test]
    fn test_collect_without_prefix_lowercases() {
        let loader = EnvLoader::default();
        let config = loader.collect(vars(&[("HOME", "/root")]));
        assert_eq!(config.get("home").map(String::as_str), Some("/root"));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("GET, HEAD ,,OPTIONS"), vec!["GET", "HEAD", "OPTIONS"]);
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE", "flag").unwrap());
        assert!(parse_bool("1", "flag").unwrap());
        assert!(!parse_bool("off", "flag").unwrap());
        assert!(parse_bool("maybe", "flag").is_err());
    }

    #[test]
    fn test_missing_dotenv_path_is_error() {
        let result = EnvLoader::default().with_dotenv(Some(Path::new("/nonexistent/.env.palisade")));
        assert!(result.is_err());
    }

    #[test]
    fn test_only_missing_dotenv_is_skipped() {
        let missing = dotenvy::Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(skip_missing(Err(missing)).is_ok());
        assert!(skip_missing(Ok(())).is_ok());

        let bad_line = dotenvy::Error::LineParse("/a/, /b/".to_string(), 5);
        assert!(matches!(
            skip_missing(Err(bad_line)),
            Err(ConfigError::LoadError(_))
        ));
    }
}
