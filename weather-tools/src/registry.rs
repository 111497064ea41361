//! Name-based dispatch and JSON-schema descriptors for agent hosts.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    error::{Result, WeatherError},
    tools::{DEFAULT_FORECAST_DAYS, ToolContext, WeatherTools, validate_days},
};

pub const GET_CURRENT_WEATHER: &str = "get_current_weather";
pub const GET_FORECAST: &str = "get_forecast";
pub const GET_WEATHER_ALERTS: &str = "get_weather_alerts";

/// Function declaration advertised to the agent platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

pub fn tool_specs() -> Vec<ToolSpec> {
    let location = json!({
        "type": "string",
        "description": "The city and country, e.g. 'San Francisco, US'"
    });
    let api_key = json!({
        "type": "string",
        "description": "OpenWeatherMap API key; falls back to the host secret or environment"
    });

    vec![
        ToolSpec {
            name: GET_CURRENT_WEATHER,
            description: "Fetch current weather for a location: temperature, conditions, humidity, pressure, wind and visibility.",
            parameters: json!({
                "type": "object",
                "properties": { "location": location, "api_key": api_key },
                "required": ["location"]
            }),
        },
        ToolSpec {
            name: GET_FORECAST,
            description: "Fetch a daily forecast (1-5 days) with min/max temperature and a representative condition per day.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "location": location,
                    "days": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 5,
                        "default": DEFAULT_FORECAST_DAYS,
                        "description": "Number of forecast days (1-5)"
                    },
                    "api_key": api_key
                },
                "required": ["location"]
            }),
        },
        ToolSpec {
            name: GET_WEATHER_ALERTS,
            description: "Fetch active weather alerts and warnings for a location.",
            parameters: json!({
                "type": "object",
                "properties": { "location": location, "api_key": api_key },
                "required": ["location"]
            }),
        },
    ]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LocationArgs {
    location: String,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ForecastArgs {
    location: String,
    #[serde(default = "default_days")]
    days: i64,
    #[serde(default)]
    api_key: Option<String>,
}

fn default_days() -> i64 {
    i64::from(DEFAULT_FORECAST_DAYS)
}

impl WeatherTools {
    /// Run the tool called `name` with a JSON arguments object.
    ///
    /// An `api_key` argument takes precedence over `ctx.api_key`.
    pub async fn invoke(&self, name: &str, args: Value, ctx: &ToolContext<'_>) -> Result<Value> {
        match name {
            GET_CURRENT_WEATHER => {
                let args: LocationArgs = parse_args(name, args)?;
                let ctx = ctx.overriding_key(args.api_key.as_deref());
                to_json(&self.get_current_weather(&args.location, &ctx).await?)
            }
            GET_FORECAST => {
                let args: ForecastArgs = parse_args(name, args)?;
                let days = validate_days(args.days)?;
                let ctx = ctx.overriding_key(args.api_key.as_deref());
                to_json(&self.get_forecast(&args.location, days, &ctx).await?)
            }
            GET_WEATHER_ALERTS => {
                let args: LocationArgs = parse_args(name, args)?;
                let ctx = ctx.overriding_key(args.api_key.as_deref());
                to_json(&self.get_weather_alerts(&args.location, &ctx).await?)
            }
            other => Err(WeatherError::InvalidInput(format!("unknown tool '{other}'"))),
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| WeatherError::InvalidInput(format!("invalid arguments for {tool}: {e}")))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(WeatherError::malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ErrorKind,
        http::Endpoint,
        tools::tests::{FakeFetcher, current_payload, forecast_payload, tools_with},
    };
    use std::sync::Arc;

    fn fake() -> Arc<FakeFetcher> {
        Arc::new(
            FakeFetcher::default()
                .with(Endpoint::Current, Ok(current_payload()))
                .with(Endpoint::Forecast, Ok(forecast_payload())),
        )
    }

    #[test]
    fn specs_list_all_three_tools() {
        let names: Vec<&str> = tool_specs().iter().map(|s| s.name).collect();
        assert_eq!(names, [GET_CURRENT_WEATHER, GET_FORECAST, GET_WEATHER_ALERTS]);

        for spec in tool_specs() {
            assert_eq!(spec.parameters["required"], json!(["location"]));
        }
    }

    #[tokio::test]
    async fn invoke_current_weather_by_name() {
        let tools = tools_with(fake(), 10);

        let out = tools
            .invoke(GET_CURRENT_WEATHER, json!({ "location": "London, UK", "api_key": "k" }), &ToolContext::default())
            .await
            .unwrap();

        assert_eq!(out["location"], "London, GB");
        assert_eq!(out["condition"], "Clouds");
        assert_eq!(out["observed_at"], "2023-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn invoke_forecast_defaults_to_five_days() {
        let tools = tools_with(fake(), 10);
        let ctx = ToolContext::with_api_key("k");

        let out = tools.invoke(GET_FORECAST, json!({ "location": "London" }), &ctx).await.unwrap();

        assert_eq!(out["requested_days"], 5);
        assert_eq!(out["total_days"], 5);
        assert_eq!(out["days"].as_array().map(Vec::len), Some(5));
    }

    #[tokio::test]
    async fn invoke_rejects_bad_arguments() {
        let tools = tools_with(fake(), 10);
        let ctx = ToolContext::with_api_key("k");

        for (tool, args) in [
            (GET_FORECAST, json!({ "location": "London", "days": -2 })),
            (GET_FORECAST, json!({ "location": "London", "days": 10 })),
            (GET_CURRENT_WEATHER, json!({ "city": "London" })),
            (GET_WEATHER_ALERTS, json!("London")),
            ("get_tides", json!({ "location": "London" })),
        ] {
            let err = tools.invoke(tool, args, &ctx).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{tool}");
        }
    }
}
