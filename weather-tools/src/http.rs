//! Outbound HTTP adapter.
//!
//! Issues a single GET per call and classifies the outcome. It never retries;
//! recovery is the caller's decision.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde_json::Value;
use std::{fmt::Debug, time::Duration};
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::{Result, WeatherError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Current,
    Forecast,
    Geocode,
    OneCall,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Current => "/data/2.5/weather",
            Endpoint::Forecast => "/data/2.5/forecast",
            Endpoint::Geocode => "/geo/1.0/direct",
            Endpoint::OneCall => "/data/3.0/onecall",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Current => "current",
            Endpoint::Forecast => "forecast",
            Endpoint::Geocode => "geocode",
            Endpoint::OneCall => "onecall",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters besides the API key.
pub type QueryParams = Vec<(&'static str, String)>;

#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    /// GET `endpoint` and return the parsed JSON body.
    async fn fetch(&self, endpoint: Endpoint, params: &QueryParams, api_key: &str) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    base_url: String,
    http: Client,
}

impl ReqwestFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(WeatherError::InvalidInput(
                "request timeout must be longer than zero".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::UpstreamUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), http })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WeatherFetcher for ReqwestFetcher {
    async fn fetch(&self, endpoint: Endpoint, params: &QueryParams, api_key: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        debug!(%endpoint, %url, "sending request");

        let res = self
            .http
            .get(&url)
            .query(params)
            .query(&[("appid", api_key)])
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let status = res.status();
        let retry_after = retry_after_header(&res);
        let body = res.text().await.map_err(|e| transport_error(endpoint, e))?;

        if !status.is_success() {
            let err = classify_status(status, &body, retry_after);
            warn!(%endpoint, %status, kind = %err.kind(), "provider request failed");
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            WeatherError::malformed(format!("{endpoint} body is not JSON ({e}): {}", truncate_body(&body)))
        })
    }
}

/// Map a non-2xx provider answer to the error taxonomy.
pub fn classify_status(status: StatusCode, body: &str, retry_after: Option<Duration>) -> WeatherError {
    let message = provider_message(body).unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => WeatherError::UpstreamAuth(message),
        StatusCode::NOT_FOUND => WeatherError::LocationNotFound(message),
        StatusCode::TOO_MANY_REQUESTS => WeatherError::UpstreamRateLimited { retry_after },
        StatusCode::BAD_REQUEST => WeatherError::InvalidInput(message),
        _ => WeatherError::UpstreamUnavailable(format!("HTTP {status}: {message}")),
    }
}

/// The request URL carries `appid`, so it is stripped before the error is
/// logged or returned.
fn transport_error(endpoint: Endpoint, err: reqwest::Error) -> WeatherError {
    let err = err.without_url();
    let what = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    warn!(%endpoint, error = %err, "{what}");
    WeatherError::UpstreamUnavailable(format!("{endpoint} request {what}: {err}"))
}

fn retry_after_header(res: &reqwest::Response) -> Option<Duration> {
    res.headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Pull `message` out of the provider's `{"cod": .., "message": ..}` error body.
fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(truncate_body))
        .or_else(|| (!body.trim().is_empty()).then(|| truncate_body(body)))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
