pub mod backoff;
pub mod config;
pub mod http;
pub mod ratelimit;
pub mod retry;
pub mod tracker;
pub mod types;
