use crate::retry::{AttemptCounting, RetryPolicy};
use reqwest::header::{HeaderValue, InvalidHeaderValue};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable \"{0}\" not set!")]
    Missing(&'static str),
    #[error("Environment variable \"JIRA_ENDPOINT\" is not a valid URL: {0}")]
    InvalidEndpoint(String),
    #[error("Environment variable \"{name}\" has an invalid value: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Runtime configuration for the Jira client.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub api_key: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_wait_min_secs: u64,
    pub retry_wait_max_secs: u64,
    pub attempt_counting: AttemptCounting,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - JIRA_ENDPOINT [required]
    /// - JIRA_API_KEY [required]
    /// - JIRA_MAX_RETRIES (default: 3)
    /// - JIRA_RETRY_WAIT_MIN_SECS (default: 1)
    /// - JIRA_RETRY_WAIT_MAX_SECS (default: 30)
    /// - JIRA_HTTP_TIMEOUT_SECS (default: 30)
    /// - JIRA_USER_AGENT (default: jira-retry/<version>)
    /// - JIRA_ATTEMPT_COUNTING (default: uniform; or renewal-only)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Config::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let endpoint = required("JIRA_ENDPOINT")?;
        let parsed = url::Url::parse(&endpoint)
            .map_err(|e| ConfigError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(ConfigError::InvalidEndpoint(endpoint));
        }
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let api_key = required("JIRA_API_KEY")?;
        if bearer_header(&api_key).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "JIRA_API_KEY",
                value: "<masked>".into(),
            });
        }

        let max_retries = parse_or(&lookup, "JIRA_MAX_RETRIES", 3u32)?;
        if max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                name: "JIRA_MAX_RETRIES",
                value: "0".into(),
            });
        }
        let retry_wait_min_secs = parse_or(&lookup, "JIRA_RETRY_WAIT_MIN_SECS", 1u64)?;
        if retry_wait_min_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "JIRA_RETRY_WAIT_MIN_SECS",
                value: "0".into(),
            });
        }
        let retry_wait_max_secs = parse_or(&lookup, "JIRA_RETRY_WAIT_MAX_SECS", 30u64)?;
        if retry_wait_max_secs < retry_wait_min_secs {
            return Err(ConfigError::InvalidValue {
                name: "JIRA_RETRY_WAIT_MAX_SECS",
                value: retry_wait_max_secs.to_string(),
            });
        }
        let timeout_secs = parse_or(&lookup, "JIRA_HTTP_TIMEOUT_SECS", 30u64)?;
        let attempt_counting = match lookup("JIRA_ATTEMPT_COUNTING").as_deref() {
            None | Some("") | Some("uniform") => AttemptCounting::Uniform,
            Some("renewal-only") => AttemptCounting::RenewalOnly,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "JIRA_ATTEMPT_COUNTING",
                    value: other.to_string(),
                })
            }
        };
        let user_agent = lookup("JIRA_USER_AGENT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("jira-retry/{}", env!("CARGO_PKG_VERSION")));
        if HeaderValue::from_str(&user_agent).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "JIRA_USER_AGENT",
                value: user_agent,
            });
        }

        Ok(Self {
            endpoint,
            api_key,
            user_agent,
            timeout_secs,
            max_retries,
            retry_wait_min_secs,
            retry_wait_max_secs,
            attempt_counting,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            min_wait: Duration::from_secs(self.retry_wait_min_secs),
            max_wait: Duration::from_secs(self.retry_wait_max_secs),
            counting: self.attempt_counting,
        }
    }
}

/// `Authorization: Bearer {api_key}`, marked sensitive so it never shows in debug output.
pub fn bearer_header(api_key: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key))?;
    value.set_sensitive(true);
    Ok(value)
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}
