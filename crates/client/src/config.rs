//! Client configuration.
//!
//! Resolved once at startup from flags or environment values; the client itself never reads the
//! environment.

use crate::{ClientError, ClientResult};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SAVE_PATH: &str = "/PI02ReactServlet";
pub const DEFAULT_SEARCH_PATH: &str = "/api/patients";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ClientConfig {
    base_url: String,
    save_path: String,
    search_path: String,
    timeout: Duration,
    bearer_token: Option<String>,
}

impl ClientConfig {
    /// Create a config for the servlet at `base_url` with default paths and timeout.
    ///
    /// The URL must be absolute `http` or `https`; a trailing `/` is dropped.
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let base_url = base_url.into();
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidConfig(format!(
                "base url must start with http:// or https://, got {base_url:?}"
            )));
        }

        Ok(Self {
            base_url: base_url.to_string(),
            save_path: DEFAULT_SAVE_PATH.into(),
            search_path: DEFAULT_SEARCH_PATH.into(),
            timeout: DEFAULT_TIMEOUT,
            bearer_token: None,
        })
    }

    /// Build a config from raw environment or flag values. Blank values fall back to defaults.
    pub fn from_env_values(
        base_url: Option<String>,
        timeout_ms: Option<String>,
        bearer_token: Option<String>,
    ) -> ClientResult<Self> {
        let base_url = non_blank(base_url).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut cfg = Self::new(base_url)?;

        if let Some(raw) = non_blank(timeout_ms) {
            cfg.timeout = parse_timeout_ms(&raw)?;
        }
        cfg.bearer_token = non_blank(bearer_token);
        Ok(cfg)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = non_blank(Some(token.into()));
        self
    }

    pub fn with_save_path(mut self, path: impl Into<String>) -> Self {
        self.save_path = leading_slash(path.into());
        self
    }

    pub fn with_search_path(mut self, path: impl Into<String>) -> Self {
        self.search_path = leading_slash(path.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    pub fn save_url(&self) -> String {
        format!("{}{}", self.base_url, self.save_path)
    }

    pub fn search_url(&self) -> String {
        format!("{}{}", self.base_url, self.search_path)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("save_path", &self.save_path)
            .field("search_path", &self.search_path)
            .field("timeout", &self.timeout)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn leading_slash(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

fn parse_timeout_ms(raw: &str) -> ClientResult<Duration> {
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => Err(ClientError::InvalidConfig(format!(
            "timeout must be a positive number of milliseconds, got {raw:?}"
        ))),
        Ok(ms) => Ok(Duration::from_millis(ms)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let cfg = ClientConfig::from_env_values(None, None, None).unwrap();
        assert_eq!(cfg.base_url(), DEFAULT_BASE_URL);
        assert_eq!(cfg.save_url(), "http://localhost:8080/PI02ReactServlet");
        assert_eq!(cfg.search_url(), "http://localhost:8080/api/patients");
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.bearer_token(), None);
    }

    #[test]
    fn test_env_values_override_defaults() {
        let cfg = ClientConfig::from_env_values(
            Some("https://his.example.org/app/".into()),
            Some("1500".into()),
            Some("  abc123 ".into()),
        )
        .unwrap();
        assert_eq!(cfg.base_url(), "https://his.example.org/app");
        assert_eq!(cfg.timeout(), Duration::from_millis(1500));
        assert_eq!(cfg.bearer_token(), Some("abc123"));
    }

    #[test]
    fn test_blank_values_fall_back() {
        let cfg =
            ClientConfig::from_env_values(Some("   ".into()), Some("".into()), Some("".into()))
                .unwrap();
        assert_eq!(cfg.base_url(), DEFAULT_BASE_URL);
        assert_eq!(cfg.bearer_token(), None);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            ClientConfig::new("localhost:8080"),
            Err(ClientError::InvalidConfig(_))
        ));
        assert!(ClientConfig::from_env_values(None, Some("soon".into()), None).is_err());
        assert!(ClientConfig::from_env_values(None, Some("0".into()), None).is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let cfg = ClientConfig::new(DEFAULT_BASE_URL)
            .unwrap()
            .with_bearer_token("secret-token");
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("secret-token"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn test_custom_paths_get_leading_slash() {
        let cfg = ClientConfig::new(DEFAULT_BASE_URL)
            .unwrap()
            .with_save_path("SaveServlet")
            .with_search_path("/search");
        assert_eq!(cfg.save_url(), "http://localhost:8080/SaveServlet");
        assert_eq!(cfg.search_url(), "http://localhost:8080/search");
    }
}
