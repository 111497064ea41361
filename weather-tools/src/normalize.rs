//! Pure transforms from provider JSON into the stable output shapes.
//!
//! Raw provider structs keep every optional field as `Option` so a missing
//! key degrades to a default instead of failing the whole call. Only data the
//! output cannot exist without (a current temperature, a list of forecast
//! entries) is treated as required.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::{
    error::{Result, WeatherError},
    model::{Alert, ConditionCategory, Coordinates, CurrentWeather, Forecast, ForecastDay},
};

pub const MIN_FORECAST_DAYS: u8 = 1;
pub const MAX_FORECAST_DAYS: u8 = 5;

/// Provider condition id ranges, inclusive.
///
/// <https://openweathermap.org/weather-conditions>
pub const CONDITION_TABLE: &[(u16, u16, ConditionCategory)] = &[
    (200, 299, ConditionCategory::Thunderstorm),
    (300, 399, ConditionCategory::Drizzle),
    (500, 599, ConditionCategory::Rain),
    (600, 699, ConditionCategory::Snow),
    (700, 799, ConditionCategory::Atmosphere),
    (800, 800, ConditionCategory::Clear),
    (801, 804, ConditionCategory::Clouds),
];

/// Group labels the provider uses for 7xx codes.
const ATMOSPHERE_LABELS: &[&str] =
    &["Mist", "Smoke", "Haze", "Dust", "Fog", "Sand", "Ash", "Squall", "Tornado"];

pub fn category_for_code(code: u16) -> ConditionCategory {
    CONDITION_TABLE
        .iter()
        .find(|(lo, hi, _)| (*lo..=*hi).contains(&code))
        .map(|(_, _, category)| *category)
        .unwrap_or(ConditionCategory::Unknown)
}

/// Fallback when a payload carries the group label but no code.
pub fn category_for_label(label: &str) -> ConditionCategory {
    let known = [
        ConditionCategory::Thunderstorm,
        ConditionCategory::Drizzle,
        ConditionCategory::Rain,
        ConditionCategory::Snow,
        ConditionCategory::Clear,
        ConditionCategory::Clouds,
    ];

    if let Some(category) = known.into_iter().find(|c| c.as_str().eq_ignore_ascii_case(label)) {
        return category;
    }
    if ATMOSPHERE_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)) {
        return ConditionCategory::Atmosphere;
    }
    ConditionCategory::Unknown
}

#[derive(Debug, Default, Deserialize)]
struct OwCondition {
    id: Option<u16>,
    main: Option<String>,
    description: Option<String>,
}

impl OwCondition {
    fn category(&self) -> ConditionCategory {
        match (self.id, self.main.as_deref()) {
            (Some(id), _) => category_for_code(id),
            (None, Some(label)) => category_for_label(label),
            (None, None) => ConditionCategory::Unknown,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    dt: Option<i64>,
    main: Option<OwMain>,
    #[serde(default)]
    weather: Vec<OwCondition>,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    sys: OwSys,
    visibility: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwCity {
    name: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: Option<i64>,
    #[serde(default)]
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwCondition>,
    #[serde(default)]
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwGeocodeMatch {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwAlert {
    #[serde(default)]
    sender_name: String,
    #[serde(default)]
    event: String,
    start: Option<i64>,
    end: Option<i64>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OwOneCallResponse {
    #[serde(default)]
    alerts: Option<Vec<OwAlert>>,
}

pub fn normalize_current(raw: &Value, location: &str) -> Result<CurrentWeather> {
    let parsed = OwCurrentResponse::deserialize(raw).map_err(WeatherError::malformed)?;

    let main = parsed.main.unwrap_or_default();
    let temperature_c = main.temp.ok_or_else(|| WeatherError::malformed("missing main.temp"))?;

    let condition = parsed.weather.first();
    let observed_at = parsed.dt.and_then(unix_to_utc).unwrap_or_else(Utc::now);

    Ok(CurrentWeather {
        location: location_label(parsed.name, parsed.sys.country, location),
        temperature_c,
        feels_like_c: main.feels_like.unwrap_or(temperature_c),
        condition: condition.map(OwCondition::category).unwrap_or(ConditionCategory::Unknown),
        description: condition.and_then(|c| c.description.clone()).unwrap_or_default(),
        humidity_pct: humidity_pct(main.humidity),
        pressure_hpa: main.pressure.unwrap_or_default(),
        wind_speed_mps: parsed.wind.speed.unwrap_or_default(),
        visibility_km: parsed.visibility.map(|metres| metres / 1000.0),
        observed_at,
    })
}

/// Collapse 3-hour slots into one entry per UTC calendar date.
///
/// Min/max come from every slot of the day; condition, description, humidity
/// and wind come from the slot nearest 12:00 UTC, earlier slot on a tie.
pub fn normalize_forecast(raw: &Value, location: &str, requested_days: u8) -> Result<Forecast> {
    let parsed = OwForecastResponse::deserialize(raw).map_err(WeatherError::malformed)?;
    let wanted = requested_days.clamp(MIN_FORECAST_DAYS, MAX_FORECAST_DAYS);

    let mut by_date: BTreeMap<NaiveDate, Vec<(DateTime<Utc>, &OwForecastEntry)>> = BTreeMap::new();
    let mut skipped = 0usize;

    for entry in &parsed.list {
        match (entry.dt.and_then(unix_to_utc), entry.main.temp) {
            (Some(at), Some(_)) => by_date.entry(at.date_naive()).or_default().push((at, entry)),
            _ => skipped += 1,
        }
    }

    let days: Vec<ForecastDay> = by_date
        .into_iter()
        .take(usize::from(wanted))
        .filter_map(|(date, slots)| collapse_day(date, &slots))
        .collect();

    if days.is_empty() {
        return Err(WeatherError::malformed(format!(
            "forecast has no usable entries ({} received, {skipped} skipped)",
            parsed.list.len()
        )));
    }

    debug!(entries = parsed.list.len(), skipped, days = days.len(), "normalized forecast");

    Ok(Forecast {
        location: location_label(parsed.city.name, parsed.city.country, location),
        requested_days: wanted,
        total_days: u8::try_from(days.len()).unwrap_or(MAX_FORECAST_DAYS),
        days,
    })
}

fn collapse_day(date: NaiveDate, slots: &[(DateTime<Utc>, &OwForecastEntry)]) -> Option<ForecastDay> {
    let temps = slots.iter().filter_map(|(_, e)| e.main.temp);
    let (min, max) = temps.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));

    let (_, representative) = slots
        .iter()
        .min_by_key(|(at, _)| (distance_from_noon(at), at.timestamp()))?;

    let condition = representative.weather.first();

    Some(ForecastDay {
        date,
        temperature_min_c: min,
        temperature_max_c: max,
        condition: condition.map(OwCondition::category).unwrap_or(ConditionCategory::Unknown),
        description: condition.and_then(|c| c.description.clone()).unwrap_or_default(),
        humidity_pct: humidity_pct(representative.main.humidity),
        wind_speed_mps: representative.wind.speed.unwrap_or_default(),
    })
}

fn distance_from_noon(at: &DateTime<Utc>) -> i64 {
    (i64::from(at.num_seconds_from_midnight()) - 12 * 3600).abs()
}

/// First geocoding match; an empty result means the provider knows no such place.
pub fn normalize_geocode(raw: &Value, location: &str) -> Result<Coordinates> {
    let matches: Vec<OwGeocodeMatch> = Vec::deserialize(raw).map_err(WeatherError::malformed)?;

    matches
        .first()
        .map(|m| Coordinates { lat: m.lat, lon: m.lon })
        .ok_or_else(|| WeatherError::LocationNotFound(location.to_string()))
}

/// Absent or null `alerts` is an empty list, not an error.
pub fn normalize_alerts(raw: &Value) -> Result<Vec<Alert>> {
    let parsed = OwOneCallResponse::deserialize(raw).map_err(WeatherError::malformed)?;

    Ok(parsed
        .alerts
        .unwrap_or_default()
        .into_iter()
        .map(|a| Alert {
            event: a.event,
            start: a.start.and_then(unix_to_utc),
            end: a.end.and_then(unix_to_utc),
            description: a.description,
            sender: a.sender_name,
            tags: a.tags,
        })
        .collect())
}

fn location_label(name: Option<String>, country: Option<String>, requested: &str) -> String {
    match (name.filter(|n| !n.is_empty()), country.filter(|c| !c.is_empty())) {
        (Some(name), Some(country)) => format!("{name}, {country}"),
        (Some(name), None) => name,
        (None, _) => requested.to_string(),
    }
}

fn humidity_pct(raw: Option<f64>) -> u8 {
    raw.map(|h| h.round().clamp(0.0, 100.0) as u8).unwrap_or_default()
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}
