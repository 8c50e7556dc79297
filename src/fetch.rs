//! Shared HTTP plumbing for the marketplace clients: middleware stack,
//! fetch error taxonomy, response decoding.

use crate::RateLimiter;
use derive_more::{Display, Error};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Debug, Display, Error)]
pub enum FetchError {
    #[display("HTTP {status}: {body}")]
    #[error(ignore)]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    Network(reqwest::Error),
    Middleware(anyhow::Error),
    Decode(serde_json::Error),
    #[display("Ответ без курсора пагинации")]
    MissingCursor,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err)
    }
}

impl From<reqwest_middleware::Error> for FetchError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Middleware(err) => FetchError::Middleware(err),
            reqwest_middleware::Error::Reqwest(err) => FetchError::Network(err),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err)
    }
}

/// Shared HTTP client for every cabinet of a run: retries transient failures,
/// paces requests globally. Fixed per-page pauses stay on top of this, they
/// are part of each endpoint's documented limits.
pub fn build_client() -> Result<ClientWithMiddleware, anyhow::Error> {
    let client = reqwest::ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(90))
        .use_rustls_tls()
        .build()?;
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .with(reqwest_ratelimit::all(RateLimiter::new(60)))
        .build())
}

pub(crate) async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, FetchError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(FetchError::Api {
            status,
            body: crate::truncate_body(&text),
        });
    }
    Ok(serde_json::from_str(&text)?)
}
