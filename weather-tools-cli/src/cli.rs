use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use weather_tools::{Config, ToolContext, ToolFailure, WeatherError, WeatherTools, tool_specs};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-tools", version, about = "Weather tools for AI agents")]
pub struct Cli {
    /// API key for this invocation; overrides the stored key and the environment.
    #[arg(long, global = true, env = "WEATHER_TOOLS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Print raw JSON instead of a human-readable summary.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key in the config file.
    Configure {
        /// Key to store; prompted for when absent.
        #[arg(long = "key")]
        key: Option<String>,
    },

    /// Show current weather for a location.
    Current {
        /// City and country, e.g. "London, UK".
        location: String,
    },

    /// Show the daily forecast for a location.
    Forecast {
        location: String,

        /// Number of days (1-5).
        #[arg(long, default_value_t = 5)]
        days: u8,
    },

    /// Show active weather alerts for a location.
    Alerts { location: String },

    /// Print the tool descriptors as JSON.
    Tools,

    /// Invoke a tool by name with a JSON arguments object.
    Call {
        /// Tool name, e.g. "get_forecast".
        tool: String,

        /// Arguments object, e.g. '{"location":"Paris, FR","days":3}'.
        args: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Configure { key } => {
                let key = match key {
                    Some(k) => k,
                    None => Password::new("OpenWeatherMap API key:")
                        .with_display_mode(PasswordDisplayMode::Masked)
                        .without_confirmation()
                        .prompt()
                        .context("Failed to read API key")?,
                };

                config.set_api_key(key);
                if !config.has_api_key() {
                    bail!("API key must not be empty");
                }
                config.save()?;
                println!("API key saved to {}", Config::config_file_path()?.display());
            }
            Command::Tools => {
                println!("{}", serde_json::to_string_pretty(&tool_specs())?);
            }
            Command::Current { location } => {
                let tools = WeatherTools::from_config(&config)?;
                let ctx = context(self.api_key.as_deref(), &config);
                let current = tools.get_current_weather(&location, &ctx).await.map_err(tool_error)?;
                output::print(&current, self.json, output::current)?;
            }
            Command::Forecast { location, days } => {
                let tools = WeatherTools::from_config(&config)?;
                let ctx = context(self.api_key.as_deref(), &config);
                let forecast = tools.get_forecast(&location, days, &ctx).await.map_err(tool_error)?;
                output::print(&forecast, self.json, output::forecast)?;
            }
            Command::Alerts { location } => {
                let tools = WeatherTools::from_config(&config)?;
                let ctx = context(self.api_key.as_deref(), &config);
                let alerts = tools.get_weather_alerts(&location, &ctx).await.map_err(tool_error)?;
                output::print(&alerts, self.json, |a| output::alerts(a))?;
            }
            Command::Call { tool, args } => {
                let args: serde_json::Value =
                    serde_json::from_str(&args).context("Tool arguments must be a JSON object")?;
                let tools = WeatherTools::from_config(&config)?;
                let ctx = context(self.api_key.as_deref(), &config);

                match tools.invoke(&tool, args, &ctx).await {
                    Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                    Err(err) => {
                        println!("{}", serde_json::to_string_pretty(&ToolFailure::from(&err))?);
                        std::process::exit(1);
                    }
                }
            }
        }

        Ok(())
    }
}

/// The stored config stands in for the host's secret context.
fn context<'a>(api_key: Option<&'a str>, config: &'a Config) -> ToolContext<'a> {
    ToolContext { api_key, secrets: Some(config) }
}

fn tool_error(err: WeatherError) -> anyhow::Error {
    anyhow::anyhow!("[{}] {err}", err.kind())
}
