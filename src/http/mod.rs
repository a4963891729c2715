use crate::config::{bearer_header, Config};
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0} cannot be sent as an HTTP header value")]
    InvalidHeader(&'static str),
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Raw response handed to the retry engine.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Issues a GET and returns the buffered response.
pub trait Transport {
    fn get(&self, url: &str) -> impl Future<Output = reqwest::Result<ApiResponse>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Ok,
    RateLimited,
    Other,
}

pub fn classify_status(status: StatusCode) -> StatusClass {
    match status {
        StatusCode::TOO_MANY_REQUESTS => StatusClass::RateLimited,
        s if s.is_success() => StatusClass::Ok,
        _ => StatusClass::Other,
    }
}

pub fn build_client(cfg: &Config) -> Result<Client, ClientError> {
    let mut default_headers = HeaderMap::new();
    let ua = HeaderValue::from_str(&cfg.user_agent)
        .map_err(|_| ClientError::InvalidHeader("JIRA_USER_AGENT"))?;
    default_headers.insert(USER_AGENT, ua);
    // Authorization header is injected per request so it can be masked in traces.
    let client = Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()?;
    Ok(client)
}

/// `{endpoint}/rest/api/2/issue/{id}` with the id encoded as one path segment.
pub fn issue_url(endpoint: &str, issue_id: &str) -> String {
    format!(
        "{}/rest/api/2/issue/{}",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(issue_id)
    )
}

const KNOWN_AUTH_SCHEMES: [&str; 3] = ["bearer", "basic", "negotiate"];

/// Hides credentials in an `Authorization` value, keeping well-known schemes readable.
pub fn mask_authorization(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let scheme = value.split(' ').next().unwrap_or(value);
    if !KNOWN_AUTH_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
        return "<masked>".to_string();
    }
    if value.len() > scheme.len() + 1 {
        format!("{} <masked>", scheme)
    } else {
        scheme.to_string()
    }
}

pub fn to_curl(method: &Method, url: &str, headers: &HeaderMap) -> String {
    let mut rendered = String::new();
    for (name, value) in headers {
        let value = value.to_str().unwrap_or("<binary>");
        let value = if *name == AUTHORIZATION {
            mask_authorization(value)
        } else {
            value.to_string()
        };
        rendered.push_str(&format!(" -H {:?}", format!("{}: {}", name, value)));
    }
    format!("curl -v -X{}{} '{}'", method, rendered, url)
}

/// reqwest-backed transport carrying the bearer token.
#[derive(Debug, Clone)]
pub struct JiraClient {
    client: Client,
    authorization: HeaderValue,
}

impl JiraClient {
    pub fn new(cfg: &Config) -> Result<Self, ClientError> {
        let authorization =
            bearer_header(&cfg.api_key).map_err(|_| ClientError::InvalidHeader("JIRA_API_KEY"))?;
        Ok(Self {
            client: build_client(cfg)?,
            authorization,
        })
    }

    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers
    }
}

impl Transport for JiraClient {
    async fn get(&self, url: &str) -> reqwest::Result<ApiResponse> {
        let headers = self.request_headers();
        info!("Executing {} request to {}", Method::GET, url);
        debug!("{}", to_curl(&Method::GET, url, &headers));
        let res = self.client.get(url).headers(headers).send().await?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.text().await?;
        info!("Status Code: {}", status.as_u16());
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
