use crate::error::{Result, SpapiError};
use crate::metric::{MISERY_FILTER, MetricSet, WEAVING_FILTER};

mod env;

pub const ENV_TOKEN: &str = "SPAPI_TOKEN";
pub const ENV_TOKEN_FALLBACK: &str = "TOKEN";
pub const ENV_API_URL: &str = "SPAPI_API_URL";
pub const ENV_TIMEOUT_MS: &str = "SPAPI_TIMEOUT_MS";
pub const ENV_HOST: &str = "SPAPI_HOST";
pub const ENV_PORT: &str = "SPAPI_PORT";
pub const ENV_PORT_FALLBACK: &str = "PORT";
pub const ENV_WEAVING_FILTER: &str = "SPAPI_WEAVING_FILTER";
pub const ENV_MISERY_FILTER: &str = "SPAPI_MISERY_FILTER";

pub const DEFAULT_API_URL: &str = "https://www.warcraftlogs.com/api/v2/client/";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Clone)]
pub struct UpstreamConfig {
    pub api_url: String,
    pub token: String,
    pub timeout_ms: u64,
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("api_url", &self.api_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub upstream: UpstreamConfig,
    pub server: ServerConfig,
    pub metrics: MetricSet,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let token = env::read_first_non_empty(lookup, &[ENV_TOKEN, ENV_TOKEN_FALLBACK])
            .ok_or_else(|| {
                SpapiError::Config(format!(
                    "upstream token is required; set {ENV_TOKEN} (or {ENV_TOKEN_FALLBACK})"
                ))
            })?;
        let api_url = env::read_non_empty(lookup, ENV_API_URL)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(SpapiError::Config(format!(
                "{ENV_API_URL} must be an http(s) URL, got: {api_url}"
            )));
        }

        let port = env::read_u16(lookup, ENV_PORT)
            .or_else(|| env::read_u16(lookup, ENV_PORT_FALLBACK))
            .unwrap_or(DEFAULT_PORT);
        let host =
            env::read_non_empty(lookup, ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());

        let metrics = MetricSet::new(
            env::read_non_empty(lookup, ENV_WEAVING_FILTER)
                .unwrap_or_else(|| WEAVING_FILTER.to_string()),
            env::read_non_empty(lookup, ENV_MISERY_FILTER)
                .unwrap_or_else(|| MISERY_FILTER.to_string()),
        );

        Ok(Self {
            upstream: UpstreamConfig {
                api_url,
                token,
                timeout_ms: env::read_u64(lookup, ENV_TIMEOUT_MS, DEFAULT_TIMEOUT_MS, 1),
            },
            server: ServerConfig { host, port },
            metrics,
        })
    }
}
