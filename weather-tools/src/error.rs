use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the weather tools.
///
/// Every variant maps to a stable [`ErrorKind`] tag so agent hosts can branch
/// on the failure without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// No API key from the explicit argument, the secret context or the environment.
    #[error("API key is required. Provide it as a parameter or set the {env_var} environment variable.")]
    MissingCredential { env_var: String },

    /// Caller supplied an argument the tools cannot use.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider had no match for the requested location.
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// Provider rejected the API key.
    #[error("Provider rejected the API key: {0}")]
    UpstreamAuth(String),

    /// Provider answered HTTP 429.
    #[error("Provider rate limit hit{}", fmt_retry_after(.retry_after))]
    UpstreamRateLimited { retry_after: Option<Duration> },

    /// Local limiter refused the call before it reached the network.
    #[error("Rate limit exceeded. Please wait {:.1}s before making more requests.", secs(.retry_after))]
    RateLimitExceeded { retry_after: Duration },

    /// Timeout, connection failure, 5xx or an unreadable response.
    #[error("Weather service unavailable: {0}")]
    UpstreamUnavailable(String),
}

fn secs(d: &Duration) -> f64 {
    d.as_secs_f64()
}

fn fmt_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(", retry after {}s", d.as_secs()),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingCredential,
    InvalidInput,
    LocationNotFound,
    UpstreamAuthError,
    UpstreamRateLimited,
    RateLimitExceeded,
    UpstreamUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingCredential => "missing_credential",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::LocationNotFound => "location_not_found",
            ErrorKind::UpstreamAuthError => "upstream_auth_error",
            ErrorKind::UpstreamRateLimited => "upstream_rate_limited",
            ErrorKind::RateLimitExceeded => "rate_limit_exceeded",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WeatherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::MissingCredential { .. } => ErrorKind::MissingCredential,
            WeatherError::InvalidInput(_) => ErrorKind::InvalidInput,
            WeatherError::LocationNotFound(_) => ErrorKind::LocationNotFound,
            WeatherError::UpstreamAuth(_) => ErrorKind::UpstreamAuthError,
            WeatherError::UpstreamRateLimited { .. } => ErrorKind::UpstreamRateLimited,
            WeatherError::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
            WeatherError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
        }
    }

    pub(crate) fn malformed(what: impl std::fmt::Display) -> Self {
        WeatherError::UpstreamUnavailable(format!("malformed response: {what}"))
    }
}

/// Serializable error payload handed back to agent hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&WeatherError> for ToolFailure {
    fn from(err: &WeatherError) -> Self {
        Self { kind: err.kind(), message: err.to_string() }
    }
}

pub type Result<T, E = WeatherError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_stable() {
        let err = WeatherError::MissingCredential { env_var: "X".into() };
        assert_eq!(err.kind().as_str(), "missing_credential");

        let err = WeatherError::UpstreamAuth("bad key".into());
        assert_eq!(err.kind().to_string(), "upstream_auth_error");

        let json = serde_json::to_string(&ErrorKind::RateLimitExceeded).unwrap();
        assert_eq!(json, "\"rate_limit_exceeded\"");
    }

    #[test]
    fn missing_credential_names_env_var() {
        let err = WeatherError::MissingCredential { env_var: "OPENWEATHERMAP_API_KEY".into() };
        assert!(err.to_string().contains("OPENWEATHERMAP_API_KEY"));
    }

    #[test]
    fn upstream_rate_limited_message_includes_retry_after() {
        let err = WeatherError::UpstreamRateLimited { retry_after: Some(Duration::from_secs(30)) };
        assert_eq!(err.to_string(), "Provider rate limit hit, retry after 30s");

        let err = WeatherError::UpstreamRateLimited { retry_after: None };
        assert_eq!(err.to_string(), "Provider rate limit hit");
    }

    #[test]
    fn tool_failure_carries_kind_and_message() {
        let err = WeatherError::InvalidInput("days must be between 1 and 5".into());
        let failure = ToolFailure::from(&err);

        assert_eq!(failure.kind, ErrorKind::InvalidInput);
        assert!(failure.message.contains("days must be between 1 and 5"));
    }
}
