use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse};
use std::time::Duration;

const DEFAULT_URL: &str = "http://localhost:9200";
const DEFAULT_INDEX: &str = "idx_shops";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Search backend connection configuration
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub url: String,
    pub index: String,
    pub timeout: Duration,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SearchConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// `{url}/{index}` without a trailing slash
    pub fn index_url(&self) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), self.index)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            index: DEFAULT_INDEX.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            username: None,
            password: None,
        }
    }
}

impl FromEnv for SearchConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs: u64 = env_parse("SEARCH_TIMEOUT_SECS", &DEFAULT_TIMEOUT_SECS.to_string())?;

        Ok(Self {
            url: env_or_default("SEARCH_URL", DEFAULT_URL),
            index: env_or_default("SEARCH_INDEX", DEFAULT_INDEX),
            timeout: Duration::from_secs(timeout_secs),
            username: env_optional("SEARCH_USERNAME"),
            password: env_optional("SEARCH_PASSWORD"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 5] = [
        "SEARCH_URL",
        "SEARCH_INDEX",
        "SEARCH_TIMEOUT_SECS",
        "SEARCH_USERNAME",
        "SEARCH_PASSWORD",
    ];

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars_unset(VARS, || {
            let config = SearchConfig::from_env().unwrap();
            assert_eq!(config.url, "http://localhost:9200");
            assert_eq!(config.index, "idx_shops");
            assert_eq!(config.timeout, Duration::from_secs(10));
            assert!(config.username.is_none());
        });
    }

    #[test]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                ("SEARCH_URL", Some("https://search.internal:9243/")),
                ("SEARCH_INDEX", Some("shops_v2")),
                ("SEARCH_TIMEOUT_SECS", Some("3")),
                ("SEARCH_USERNAME", Some("elastic")),
                ("SEARCH_PASSWORD", Some("changeme")),
            ],
            || {
                let config = SearchConfig::from_env().unwrap();
                assert_eq!(config.index_url(), "https://search.internal:9243/shops_v2");
                assert_eq!(config.timeout, Duration::from_secs(3));
                assert_eq!(config.username.as_deref(), Some("elastic"));
                assert_eq!(config.password.as_deref(), Some("changeme"));
            },
        );
    }

    #[test]
    fn test_from_env_invalid_timeout() {
        temp_env::with_var("SEARCH_TIMEOUT_SECS", Some("soon"), || {
            let err = SearchConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("SEARCH_TIMEOUT_SECS"));
        });
    }

    #[test]
    fn test_builders() {
        let config = SearchConfig::new("http://es:9200")
            .with_index("idx_test")
            .with_timeout(Duration::from_secs(1))
            .with_credentials("user", "pass");

        assert_eq!(config.index_url(), "http://es:9200/idx_test");
        assert_eq!(config.username.as_deref(), Some("user"));
    }
}
