use httpmock::{Method::GET, MockServer};
use jira_retry::backoff::compute_backoff;
use jira_retry::config::Config;
use jira_retry::http::{classify_status, issue_url, JiraClient, StatusClass, Transport};
use jira_retry::ratelimit::{RateLimitSignal, SignalField};
use jira_retry::retry::{get_issue_with_retries, FetchOutcome, RetryPolicy, Sleeper};
use reqwest::header::HeaderMap;
use std::cell::RefCell;
use std::future::Future;
use std::time::Duration;

#[test]
fn rate_headers_from_jira() {
    let mut h = HeaderMap::new();
    h.insert("x-ratelimit-limit", "20".parse().unwrap());
    h.insert("x-ratelimit-remaining", "0".parse().unwrap());
    h.insert("x-ratelimit-interval-seconds", "60".parse().unwrap());
    h.insert("x-ratelimit-fillrate", "2".parse().unwrap());
    h.insert("retry-after", "0".parse().unwrap());
    let sig = RateLimitSignal::from_headers(&h);
    assert_eq!(sig.limit, SignalField::Value(20));
    assert_eq!(sig.node_key(), "unknown");
    assert_eq!(sig.renewal_interval().unwrap(), Some(Duration::from_secs(30)));
}

#[test]
fn backoff_examples() {
    let (min, max) = (Duration::from_secs(1), Duration::from_secs(30));
    assert_eq!(compute_backoff(min, max, 0), Duration::from_secs(1));
    assert_eq!(compute_backoff(min, max, 4), Duration::from_secs(16));
    assert_eq!(compute_backoff(min, max, 5), Duration::from_secs(30));
}

#[test]
fn status_dispatch() {
    assert_eq!(classify_status(reqwest::StatusCode::OK), StatusClass::Ok);
    assert_eq!(
        classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS),
        StatusClass::RateLimited
    );
    assert_eq!(
        classify_status(reqwest::StatusCode::BAD_GATEWAY),
        StatusClass::Other
    );
}

#[derive(Default)]
struct NoSleep {
    slept: RefCell<Vec<Duration>>,
}

impl Sleeper for NoSleep {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        self.slept.borrow_mut().push(duration);
        std::future::ready(())
    }
}

fn config_for(server: &MockServer) -> Config {
    let base = server.base_url();
    Config::from_lookup(|name| match name {
        "JIRA_ENDPOINT" => Some(base.clone()),
        "JIRA_API_KEY" => Some("t".to_string()),
        _ => None,
    })
    .unwrap()
}

#[tokio::test]
async fn reqwest_transport_reads_rate_limit_headers() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/api/2/issue/X-1")
                .header("Authorization", "Bearer t");
            then.status(429)
                .header("retry-after", "5")
                .header("x-anodeid", "node-9")
                .body("slow down");
        })
        .await;
    let cfg = config_for(&server);
    let client = JiraClient::new(&cfg).unwrap();
    let res = client.get(&issue_url(&cfg.endpoint, "X-1")).await.unwrap();
    assert_eq!(res.status.as_u16(), 429);
    assert_eq!(res.body, "slow down");
    let sig = RateLimitSignal::from_headers(&res.headers);
    assert_eq!(sig.retry_after_seconds.value(), Some(5));
    assert_eq!(sig.node_key(), "node-9");
    m.assert_async().await;
}

#[tokio::test]
async fn exhausts_against_mock_server_without_sleeping() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/api/2/issue/OCPBUGS-36344");
            then.status(429)
                .header("x-ratelimit-interval-seconds", "60")
                .header("x-ratelimit-fillrate", "2")
                .header("retry-after", "10")
                .header("x-anodeid", "node-1");
        })
        .await;
    let cfg = config_for(&server);
    let client = JiraClient::new(&cfg).unwrap();
    let sleeper = NoSleep::default();
    let out = get_issue_with_retries(
        &client,
        &cfg.endpoint,
        "OCPBUGS-36344",
        &RetryPolicy::default(),
        &sleeper,
    )
    .await
    .unwrap();
    assert!(matches!(out, FetchOutcome::Exhausted { attempts: 3 }));
    let secs: Vec<u64> = sleeper.slept.borrow().iter().map(|d| d.as_secs()).collect();
    assert_eq!(secs, vec![1, 2, 4]);
    m.assert_hits_async(4).await;
}
