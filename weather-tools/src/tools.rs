//! The three weather tools.
//!
//! Each call validates its input, resolves the API key, takes a rate-limiter
//! slot and only then talks to the provider. Failures surface unchanged; no
//! call returns a partial result.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    config::{Config, DEFAULT_API_KEY_ENV},
    credentials::{ResolvedKey, SecretContext, resolve_api_key},
    error::{Result, WeatherError},
    http::{Endpoint, QueryParams, ReqwestFetcher, WeatherFetcher},
    model::{Alert, CurrentWeather, Forecast},
    normalize::{
        MAX_FORECAST_DAYS, MIN_FORECAST_DAYS, normalize_alerts, normalize_current,
        normalize_forecast, normalize_geocode,
    },
    rate_limit::RateLimiter,
};

pub const DEFAULT_FORECAST_DAYS: u8 = 5;

/// Only alerts are wanted from the One Call endpoint.
const ONECALL_EXCLUDE: &str = "minutely,hourly,daily,current";

/// Per-call credentials supplied by the host.
#[derive(Clone, Copy, Default)]
pub struct ToolContext<'a> {
    pub api_key: Option<&'a str>,
    pub secrets: Option<&'a dyn SecretContext>,
}

impl<'a> ToolContext<'a> {
    pub fn with_api_key(api_key: &'a str) -> Self {
        Self { api_key: Some(api_key), secrets: None }
    }

    pub fn with_secrets(secrets: &'a dyn SecretContext) -> Self {
        Self { api_key: None, secrets: Some(secrets) }
    }

    /// Same secrets; `api_key` replaces the explicit key when present.
    pub fn overriding_key<'b>(&'b self, api_key: Option<&'b str>) -> ToolContext<'b> {
        ToolContext { api_key: api_key.or(self.api_key), secrets: self.secrets }
    }
}

impl std::fmt::Debug for ToolContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("api_key", &self.api_key.map(|_| "<redacted>"))
            .field("secrets", &self.secrets.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct WeatherTools {
    fetcher: Arc<dyn WeatherFetcher>,
    limiter: Arc<RateLimiter>,
    api_key_env: String,
}

impl WeatherTools {
    pub fn new(fetcher: Arc<dyn WeatherFetcher>, limiter: Arc<RateLimiter>) -> Self {
        Self { fetcher, limiter, api_key_env: DEFAULT_API_KEY_ENV.to_string() }
    }

    /// Reqwest-backed tools with a fresh limiter, both taken from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = ReqwestFetcher::from_config(config)?;
        let limiter = RateLimiter::new(&config.rate_limit)?;

        Ok(Self::new(Arc::new(fetcher), Arc::new(limiter)).with_api_key_env(config.api_key_env.clone()))
    }

    pub fn with_api_key_env(mut self, env_var: impl Into<String>) -> Self {
        self.api_key_env = env_var.into();
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_current_weather(
        &self,
        location: &str,
        ctx: &ToolContext<'_>,
    ) -> Result<CurrentWeather> {
        let location = validate_location(location)?;
        let key = self.resolve_key(ctx)?;
        let params = location_params(location);

        let raw = self.limiter.run(self.fetcher.fetch(Endpoint::Current, &params, &key.key)).await?;

        let current = normalize_current(&raw, location)?;
        debug!(temperature_c = current.temperature_c, condition = %current.condition, "current weather");
        Ok(current)
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_forecast(&self, location: &str, days: u8, ctx: &ToolContext<'_>) -> Result<Forecast> {
        let location = validate_location(location)?;
        let days = validate_days(i64::from(days))?;
        let key = self.resolve_key(ctx)?;
        let params = location_params(location);

        let raw = self.limiter.run(self.fetcher.fetch(Endpoint::Forecast, &params, &key.key)).await?;

        let forecast = normalize_forecast(&raw, location, days)?;
        debug!(total_days = forecast.total_days, "forecast");
        Ok(forecast)
    }

    /// Geocodes the location, then asks the One Call endpoint for alerts.
    /// Both requests share one limiter slot.
    #[instrument(skip(self, ctx))]
    pub async fn get_weather_alerts(&self, location: &str, ctx: &ToolContext<'_>) -> Result<Vec<Alert>> {
        let location = validate_location(location)?;
        let key = self.resolve_key(ctx)?;

        let raw = self
            .limiter
            .run(async {
                let geo_params: QueryParams = vec![("q", location.to_string()), ("limit", "1".to_string())];
                let geo = self.fetcher.fetch(Endpoint::Geocode, &geo_params, &key.key).await?;
                let coords = normalize_geocode(&geo, location)?;

                let params: QueryParams = vec![
                    ("lat", coords.lat.to_string()),
                    ("lon", coords.lon.to_string()),
                    ("exclude", ONECALL_EXCLUDE.to_string()),
                ];
                self.fetcher.fetch(Endpoint::OneCall, &params, &key.key).await
            })
            .await?;

        let alerts = normalize_alerts(&raw)?;
        debug!(count = alerts.len(), "weather alerts");
        Ok(alerts)
    }

    fn resolve_key(&self, ctx: &ToolContext<'_>) -> Result<ResolvedKey> {
        let key = resolve_api_key(ctx.api_key, ctx.secrets, &self.api_key_env)?;
        debug!(source = key.source.as_str(), "resolved API key");
        Ok(key)
    }
}

fn location_params(location: &str) -> QueryParams {
    vec![("q", location.to_string()), ("units", "metric".to_string())]
}

/// Non-empty after trimming; returned trimmed.
pub fn validate_location(location: &str) -> Result<&str> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return Err(WeatherError::InvalidInput("location must be a non-empty string".to_string()));
    }
    Ok(trimmed)
}

/// Out-of-range day counts are rejected, never clamped.
pub fn validate_days(days: i64) -> Result<u8> {
    u8::try_from(days)
        .ok()
        .filter(|d| (MIN_FORECAST_DAYS..=MAX_FORECAST_DAYS).contains(d))
        .ok_or_else(|| {
            WeatherError::InvalidInput(format!(
                "days must be between {MIN_FORECAST_DAYS} and {MAX_FORECAST_DAYS}, got {days}"
            ))
        })
}
