//! Error Types for the Weather Data Adapter

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

/// Single error channel for external data source failures.
///
/// Network faults, non-2xx statuses, empty bodies, and undecodable
/// bodies all arrive here; callers never branch on the root cause.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected status: {0}")]
    Status(u16),

    #[error("Empty response body")]
    EmptyResponse,

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Request(err.to_string())
    }
}
