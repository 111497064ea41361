use chrono::{DateTime, Utc};
use serde::Serialize;
use weather_tools::{Alert, CurrentWeather, Forecast};

pub fn print<T: Serialize>(value: &T, json: bool, human: impl Fn(&T) -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", human(value));
    }
    Ok(())
}

pub fn current(w: &CurrentWeather) -> String {
    let mut out = format!(
        "{}\n  {} ({})\n  Temperature: {:.1}°C (feels like {:.1}°C)\n  Humidity: {}%  Pressure: {:.0} hPa  Wind: {:.1} m/s\n",
        w.location,
        w.condition,
        w.description,
        w.temperature_c,
        w.feels_like_c,
        w.humidity_pct,
        w.pressure_hpa,
        w.wind_speed_mps,
    );
    if let Some(km) = w.visibility_km {
        out.push_str(&format!("  Visibility: {km:.1} km\n"));
    }
    out.push_str(&format!("  Observed: {}\n", fmt_time(&w.observed_at)));
    out
}

pub fn forecast(f: &Forecast) -> String {
    let mut out = format!("{} ({} of {} days)\n", f.location, f.total_days, f.requested_days);
    for day in &f.days {
        out.push_str(&format!(
            "  {}  {:>5.1}°C .. {:>5.1}°C  {:<12} {}\n",
            day.date.format("%a %Y-%m-%d"),
            day.temperature_min_c,
            day.temperature_max_c,
            day.condition.as_str(),
            day.description,
        ));
    }
    out
}

pub fn alerts(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "No active weather alerts.\n".to_string();
    }

    alerts
        .iter()
        .map(|a| {
            let window = match (a.start, a.end) {
                (Some(start), Some(end)) => format!("{} -> {}", fmt_time(&start), fmt_time(&end)),
                (Some(start), None) => format!("from {}", fmt_time(&start)),
                (None, Some(end)) => format!("until {}", fmt_time(&end)),
                (None, None) => "time unknown".to_string(),
            };
            format!("{} [{}]\n  {}\n  {}\n", a.event, a.sender, window, a.description.trim())
        })
        .collect()
}

fn fmt_time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M UTC").to_string()
}
