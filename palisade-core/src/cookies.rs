// Cookie header parsing

use std::fmt;

/// Cookies parsed from a `Cookie` request header, in header order.
#[derive(Clone, Default)]
pub struct Cookies {
    inner: Vec<(String, String)>,
}

impl Cookies {
    /// Create empty cookies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cookie.
    pub fn push(&mut self, name: String, value: String) {
        self.inner.push((name, value));
    }

    /// Get cookie value. The first occurrence wins when a name repeats.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Check if cookie exists.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(k, _)| k == name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over cookies.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse from Cookie header value.
    ///
    /// Pairs without `=` are skipped. A value wrapped in double quotes is
    /// unquoted.
    pub fn parse(cookie_header: &str) -> Self {
        let mut cookies = Self::new();

        for cookie in cookie_header.split(';') {
            let cookie = cookie.trim();
            if cookie.is_empty() {
                continue;
            }

            if let Some((name, value)) = cookie.split_once('=') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                cookies.push(name.to_string(), value.to_string());
            }
        }

        cookies
    }
}

impl fmt::Debug for Cookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.inner.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}
