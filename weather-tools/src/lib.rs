//! Core library for the weather tools.
//!
//! This crate defines:
//! - Configuration & credential resolution
//! - A sliding-window rate limiter guarding provider calls
//! - The HTTP adapter and its error classification
//! - Normalization of provider JSON into stable output shapes
//! - The three tools (current weather, forecast, alerts) and name-based dispatch
//!
//! It is used by `weather-tools-cli`, but is meant to be embedded by any agent host.

pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod model;
pub mod normalize;
pub mod rate_limit;
pub mod registry;
pub mod tools;

pub use config::Config;
pub use credentials::{CredentialSource, SecretContext, resolve_api_key};
pub use error::{ErrorKind, ToolFailure, WeatherError};
pub use http::{Endpoint, ReqwestFetcher, WeatherFetcher};
pub use model::{Alert, ConditionCategory, CurrentWeather, Forecast, ForecastDay};
pub use rate_limit::{RateLimitConfig, RateLimitPolicy, RateLimiter};
pub use registry::{ToolSpec, tool_specs};
pub use tools::{ToolContext, WeatherTools};
