//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `VERITY_*` environment variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::net::IpAddr;

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `VERITY_*` overrides on top of defaults.
/// Collaborator endpoints are optional: a missing endpoint puts the matching
/// collaborator into its documented degraded mode (empty search results,
/// fallback classifier prior, stub embedder).
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Reasoning-model identifier passed to the genai client.
    pub reasoning_model: String,

    /// Hosted classifier prediction endpoint.
    pub classifier_url: Option<String>,

    /// Web-search endpoint (Custom Search compatible).
    pub search_url: Option<String>,

    /// API key for the web-search endpoint.
    pub search_api_key: Option<String>,

    /// Search engine id (`cx`) for the web-search endpoint.
    pub search_cx: Option<String>,

    /// Fact-check claim-search endpoint.
    pub factcheck_url: Option<String>,

    /// API key for the fact-check endpoint.
    pub factcheck_api_key: Option<String>,

    /// Embedding service endpoint. When unset the deterministic stub
    /// embedder is used.
    pub embedding_url: Option<String>,
}

/// Default Qdrant URL used when `VERITY_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Default reasoning model when `VERITY_REASONING_MODEL` is not set.
pub const DEFAULT_REASONING_MODEL: &str = "gemini-2.5-flash";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            reasoning_model: DEFAULT_REASONING_MODEL.to_string(),
            classifier_url: None,
            search_url: None,
            search_api_key: None,
            search_cx: None,
            factcheck_url: None,
            factcheck_api_key: None,
            embedding_url: None,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "VERITY_PORT";
    const ENV_BIND_ADDR: &'static str = "VERITY_BIND_ADDR";
    const ENV_QDRANT_URL: &'static str = "VERITY_QDRANT_URL";
    const ENV_REASONING_MODEL: &'static str = "VERITY_REASONING_MODEL";
    const ENV_CLASSIFIER_URL: &'static str = "VERITY_CLASSIFIER_URL";
    const ENV_SEARCH_URL: &'static str = "VERITY_SEARCH_URL";
    const ENV_SEARCH_API_KEY: &'static str = "VERITY_SEARCH_API_KEY";
    const ENV_SEARCH_CX: &'static str = "VERITY_SEARCH_CX";
    const ENV_FACTCHECK_URL: &'static str = "VERITY_FACTCHECK_URL";
    const ENV_FACTCHECK_API_KEY: &'static str = "VERITY_FACTCHECK_API_KEY";
    const ENV_EMBEDDING_URL: &'static str = "VERITY_EMBEDDING_URL";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let qdrant_url = Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url);
        let reasoning_model =
            Self::parse_string_from_env(Self::ENV_REASONING_MODEL, defaults.reasoning_model);

        Ok(Self {
            port,
            bind_addr,
            qdrant_url,
            reasoning_model,
            classifier_url: Self::parse_optional_from_env(Self::ENV_CLASSIFIER_URL),
            search_url: Self::parse_optional_from_env(Self::ENV_SEARCH_URL),
            search_api_key: Self::parse_optional_from_env(Self::ENV_SEARCH_API_KEY),
            search_cx: Self::parse_optional_from_env(Self::ENV_SEARCH_CX),
            factcheck_url: Self::parse_optional_from_env(Self::ENV_FACTCHECK_URL),
            factcheck_api_key: Self::parse_optional_from_env(Self::ENV_FACTCHECK_API_KEY),
            embedding_url: Self::parse_optional_from_env(Self::ENV_EMBEDDING_URL),
        })
    }

    /// Validates endpoint URLs and credential pairings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::check_endpoint("qdrant_url", Some(&self.qdrant_url))?;
        Self::check_endpoint("classifier_url", self.classifier_url.as_deref())?;
        Self::check_endpoint("search_url", self.search_url.as_deref())?;
        Self::check_endpoint("factcheck_url", self.factcheck_url.as_deref())?;
        Self::check_endpoint("embedding_url", self.embedding_url.as_deref())?;

        if self.search_url.is_some() && self.search_api_key.is_none() {
            return Err(ConfigError::MissingCredential {
                endpoint: "search_url",
                credential: "search_api_key",
            });
        }
        if self.factcheck_url.is_some() && self.factcheck_api_key.is_none() {
            return Err(ConfigError::MissingCredential {
                endpoint: "factcheck_url",
                credential: "factcheck_api_key",
            });
        }

        Ok(())
    }

    /// Returns `host:port` suitable for a socket bind.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn check_endpoint(name: &'static str, value: Option<&str>) -> Result<(), ConfigError> {
        if let Some(url) = value
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidEndpoint {
                name,
                value: url.to_string(),
            });
        }
        Ok(())
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|source| ConfigError::PortParseError {
                    value: value.clone(),
                    source,
                })?;
                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }
                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|source| ConfigError::InvalidBindAddr { value, source }),
            Err(_) => Ok(default),
        }
    }

    fn parse_string_from_env(key: &'static str, default: String) -> String {
        env::var(key).unwrap_or(default)
    }

    fn parse_optional_from_env(key: &'static str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }
}
