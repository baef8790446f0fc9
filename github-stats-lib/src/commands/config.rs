use crate::Result;
use crate::fetch::FetcherSettings;
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use url::Url;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Configuration file looked up in the base directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "github-stats.toml";

const LOG_TARGET: &str = "    config";
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base URL of the GitHub REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// URL of the GitHub GraphQL endpoint
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,

    /// Results requested per page (1..=100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Stop paginating a query after this many pages
    #[serde(default)]
    pub max_pages: Option<u32>,

    /// Timeout for each individual HTTP request
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Overall limit for one aggregation
    #[serde(default, with = "humantime_serde::option")]
    pub aggregation_timeout: Option<Duration>,

    /// Longest rate-limit wait to sleep through
    #[serde(default = "default_max_rate_limit_wait", with = "humantime_serde")]
    pub max_rate_limit_wait: Duration,

    /// Retries allowed for a single request after a transient failure or rate limit
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry of a transient failure, doubled on each retry
    #[serde(default = "default_retry_base_delay", with = "humantime_serde")]
    pub retry_base_delay: Duration,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_graphql_url() -> String {
    "https://api.github.com/graphql".to_string()
}

const fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

const fn default_max_rate_limit_wait() -> Duration {
    Duration::from_hours(1)
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_retry_base_delay() -> Duration {
    Duration::from_secs(1)
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// An explicit `config_path` must exist. Otherwise `github-stats.toml` in
    /// `base_dir` is used if present.
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = base_dir.join(DEFAULT_CONFIG_FILE);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
                Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        log::debug!(target: LOG_TARGET, "Loaded configuration from '{final_path}'");
        Ok(config)
    }

    /// Save the default configuration to a TOML file
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(app_err!("page_size must be between 1 and {MAX_PAGE_SIZE}, got {}", self.page_size));
        }

        if self.max_pages == Some(0) {
            return Err(app_err!("max_pages must be at least 1 when set"));
        }

        if self.request_timeout.is_zero() {
            return Err(app_err!("request_timeout must be greater than zero"));
        }

        let _ = parse_api_base(&self.api_url)?;
        let _ = Url::parse(&self.graphql_url).into_app_err_with(|| format!("invalid graphql_url '{}'", self.graphql_url))?;

        Ok(())
    }

    /// Settings for the GitHub fetcher derived from this configuration
    pub fn fetcher_settings(&self) -> Result<FetcherSettings> {
        let page_size = u8::try_from(self.page_size).into_app_err_with(|| format!("page_size {} is out of range", self.page_size))?;

        Ok(FetcherSettings {
            api_url: parse_api_base(&self.api_url)?,
            graphql_url: Url::parse(&self.graphql_url).into_app_err_with(|| format!("invalid graphql_url '{}'", self.graphql_url))?,
            page_size,
            max_pages: self.max_pages,
            request_timeout: self.request_timeout,
            max_rate_limit_wait: self.max_rate_limit_wait,
            max_retries: self.max_retries,
            retry_base_delay: self.retry_base_delay,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            graphql_url: default_graphql_url(),
            page_size: default_page_size(),
            max_pages: None,
            request_timeout: default_request_timeout(),
            aggregation_timeout: None,
            max_rate_limit_wait: default_max_rate_limit_wait(),
            max_retries: default_max_retries(),
            retry_base_delay: default_retry_base_delay(),
        }
    }
}

/// Parse the REST base URL so that relative joins stay below its path.
fn parse_api_base(value: &str) -> Result<Url> {
    let mut url = Url::parse(value).into_app_err_with(|| format!("invalid api_url '{value}'"))?;
    if url.cannot_be_a_base() {
        return Err(app_err!("invalid api_url '{value}': not a base URL"));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
