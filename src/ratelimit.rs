//! Rate-limit headers returned by Jira Data Center.
//!
//! Each node behind the load balancer runs its own token bucket and reports
//! it through `x-ratelimit-*` headers together with its identity in
//! `x-anodeid`. Every header is optional; absence never fails extraction.

use log::info;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const LIMIT: &str = "x-ratelimit-limit";
pub const REMAINING: &str = "x-ratelimit-remaining";
pub const INTERVAL_SECONDS: &str = "x-ratelimit-interval-seconds";
pub const FILL_RATE: &str = "x-ratelimit-fillrate";
pub const NODE_ID: &str = "x-anodeid";

/// Tracker key used when a response carries no node identity.
pub const UNKNOWN_NODE: &str = "unknown";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignalError {
    #[error("malformed rate-limit header {header}: {value:?}")]
    Malformed { header: &'static str, value: String },
}

/// A numeric header as found on the response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SignalField {
    #[default]
    Absent,
    Value(u64),
    Malformed(String),
}

impl SignalField {
    fn from_headers(headers: &HeaderMap, name: &str) -> Self {
        let Some(raw) = headers.get(name) else {
            return SignalField::Absent;
        };
        let Ok(text) = raw.to_str() else {
            return SignalField::Malformed(String::from_utf8_lossy(raw.as_bytes()).into_owned());
        };
        let text = text.trim();
        if text.is_empty() {
            return SignalField::Absent;
        }
        match text.parse::<u64>() {
            Ok(v) => SignalField::Value(v),
            Err(_) => SignalField::Malformed(text.to_string()),
        }
    }

    /// The parsed value, treating malformed input like absence.
    pub fn value(&self) -> Option<u64> {
        match self {
            SignalField::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// The parsed value, or an error if the header was present but not numeric.
    pub fn require(&self, header: &'static str) -> Result<Option<u64>, SignalError> {
        match self {
            SignalField::Absent => Ok(None),
            SignalField::Value(v) => Ok(Some(*v)),
            SignalField::Malformed(raw) => Err(SignalError::Malformed {
                header,
                value: raw.clone(),
            }),
        }
    }
}

impl fmt::Display for SignalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalField::Absent => f.write_str("None"),
            SignalField::Value(v) => write!(f, "{}", v),
            SignalField::Malformed(raw) => write!(f, "{:?}", raw),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitSignal {
    pub limit: SignalField,
    pub remaining: SignalField,
    pub interval_seconds: SignalField,
    pub fill_rate: SignalField,
    pub retry_after_seconds: SignalField,
    pub node_id: Option<String>,
}

impl RateLimitSignal {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let node_id = headers
            .get(NODE_ID)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self {
            limit: SignalField::from_headers(headers, LIMIT),
            remaining: SignalField::from_headers(headers, REMAINING),
            interval_seconds: SignalField::from_headers(headers, INTERVAL_SECONDS),
            fill_rate: SignalField::from_headers(headers, FILL_RATE),
            retry_after_seconds: SignalField::from_headers(headers, RETRY_AFTER.as_str()),
            node_id,
        }
    }

    pub fn node_key(&self) -> &str {
        self.node_id.as_deref().unwrap_or(UNKNOWN_NODE)
    }

    /// Time for the reporting node to regenerate one token (`interval / fill rate`).
    ///
    /// `Ok(None)` when either header is absent or the fill rate is zero.
    pub fn renewal_interval(&self) -> Result<Option<Duration>, SignalError> {
        let interval = self.interval_seconds.require(INTERVAL_SECONDS)?;
        let fill_rate = self.fill_rate.require(FILL_RATE)?;
        Ok(match (interval, fill_rate) {
            (Some(interval), Some(fill_rate)) if fill_rate > 0 => {
                Some(Duration::from_secs(interval / fill_rate))
            }
            _ => None,
        })
    }

    pub fn log_summary(&self) {
        let renewal = match self.renewal_interval() {
            Ok(Some(d)) => format!("{}s", d.as_secs()),
            _ => "n/a".to_string(),
        };
        info!("Jira Rate Limit Summary:");
        info!("       Node: {}", self.node_key());
        info!("     Tokens: {}/{} available", self.remaining, self.limit);
        info!(
            "  Fill Rate: {} tokens per {} seconds = {}",
            self.fill_rate, self.interval_seconds, renewal
        );
        info!(
            "Retry After: {} seconds on node: {}",
            self.retry_after_seconds,
            self.node_key()
        );
    }
}
