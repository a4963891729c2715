use crate::backoff::compute_backoff;
use crate::ratelimit::RateLimitSignal;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Last advertised `retry-after` per backend node, scoped to one fetch.
///
/// Requests may be served by any node, so the tracker answers the global
/// question "is some node still cooling down?" rather than a per-node one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeWaitTracker {
    waits: BTreeMap<String, u64>,
}

impl NodeWaitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the node's wait; a later 0 clears an earlier nonzero value.
    pub fn record_wait(&mut self, node_id: &str, wait_secs: u64) {
        self.waits.insert(node_id.to_string(), wait_secs);
    }

    pub fn any_node_waiting(&self) -> bool {
        self.total_wait_secs() != 0
    }

    pub fn total_wait_secs(&self) -> u64 {
        self.waits.values().fold(0u64, |acc, w| acc.saturating_add(*w))
    }

    pub fn wait_for(&self, node_id: &str) -> Option<u64> {
        self.waits.get(node_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.waits.is_empty()
    }

    /// Backoff callback for a generic retrying HTTP client.
    ///
    /// Only a 429 carrying node id, interval, fill rate and retry-after is
    /// recorded; if no node is then waiting the renewal interval is returned.
    /// Everything else gets plain exponential backoff.
    pub fn backoff_for(
        &mut self,
        min: Duration,
        max: Duration,
        attempt: u32,
        status: Option<StatusCode>,
        headers: &HeaderMap,
    ) -> Duration {
        if status != Some(StatusCode::TOO_MANY_REQUESTS) {
            return compute_backoff(min, max, attempt);
        }
        let signal = RateLimitSignal::from_headers(headers);
        let complete = (
            signal.node_id.as_deref(),
            signal.interval_seconds.value(),
            signal.fill_rate.value(),
            signal.retry_after_seconds.value(),
        );
        let (Some(node), Some(interval), Some(fill_rate), Some(retry_after)) = complete else {
            return compute_backoff(min, max, attempt);
        };
        self.record_wait(node, retry_after);
        if !self.any_node_waiting() && fill_rate > 0 {
            return Duration::from_secs(interval / fill_rate);
        }
        compute_backoff(min, max, attempt)
    }
}

impl fmt::Display for NodeWaitTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (node, wait)) in self.waits.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", node, wait)?;
        }
        f.write_str("}")
    }
}
