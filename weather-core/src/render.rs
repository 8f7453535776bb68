//! View model: one slot per page region, each replaced wholesale on render.

use chrono::TimeZone;
use std::fmt::{self, Display};

use crate::{
    error::WeatherError,
    model::{AirQuality, AlertCondition, CurrentConditions, DailyForecast, UnitSystem, round_half_up},
};

const ICON_BASE: &str = "https://openweathermap.org/img/wn";

const AQI_LEVELS: [(&str, &str); 5] = [
    ("Good", "#00e400"),
    ("Fair", "#ffff00"),
    ("Moderate", "#ff7e00"),
    ("Poor", "#ff0000"),
    ("Very Poor", "#99004c"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionsView {
    pub heading: String,
    pub date: String,
    pub icon_url: String,
    pub temperature: String,
    pub description: String,
    pub feels_like: String,
    pub humidity: String,
    pub wind: String,
    pub pressure: String,
    pub visibility: String,
}

impl ConditionsView {
    /// `tz` is applied at the observation instant, so the date follows DST.
    pub fn new<Tz>(current: &CurrentConditions, units: UnitSystem, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let temp_unit = units.temperature_suffix();

        Self {
            heading: format!("{}, {}", current.name, current.country),
            date: current
                .observed_at
                .with_timezone(tz)
                .format("%A, %B %-d, %Y")
                .to_string(),
            icon_url: format!("{ICON_BASE}/{}@2x.png", current.icon),
            temperature: format!("{}{temp_unit}", round_half_up(current.temperature)),
            description: current.description.clone(),
            feels_like: format!("{}{temp_unit}", round_half_up(current.feels_like)),
            humidity: format!("{}%", current.humidity),
            wind: format!("{} {}", current.wind_speed, units.speed_suffix()),
            pressure: format!("{} hPa", current.pressure),
            visibility: format!("{:.1} km", f64::from(current.visibility_m) / 1000.0),
        }
    }
}

impl fmt::Display for ConditionsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.heading)?;
        writeln!(f, "{}", self.date)?;
        writeln!(f)?;
        writeln!(f, "  {}  {}", self.temperature, self.description)?;
        writeln!(f, "  Feels like: {}", self.feels_like)?;
        writeln!(f, "  Icon: {}", self.icon_url)?;
        writeln!(f)?;
        writeln!(f, "  Humidity     {}", self.humidity)?;
        writeln!(f, "  Wind Speed   {}", self.wind)?;
        writeln!(f, "  Pressure     {}", self.pressure)?;
        writeln!(f, "  Visibility   {}", self.visibility)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastTile {
    pub label: String,
    pub icon_url: String,
    pub temperature: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastView {
    pub days: Vec<ForecastTile>,
}

impl ForecastView {
    pub fn new(days: &[DailyForecast], units: UnitSystem) -> Self {
        let days = days
            .iter()
            .map(|day| ForecastTile {
                label: day.label.clone(),
                icon_url: format!("{ICON_BASE}/{}.png", day.icon),
                temperature: format!("{}{}", day.average_temperature, units.temperature_suffix()),
            })
            .collect();
        Self { days }
    }
}

impl fmt::Display for ForecastView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "5-Day Forecast")?;
        for day in &self.days {
            writeln!(f, "  {:<4} {:>6}  {}", day.label, day.temperature, day.icon_url)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertBanner {
    pub title: &'static str,
    pub message: &'static str,
}

impl From<AlertCondition> for AlertBanner {
    fn from(condition: AlertCondition) -> Self {
        let (title, message) = match condition {
            AlertCondition::Thunderstorm => {
                ("⚡ Thunderstorm Alert", "Stay indoors and avoid open areas.")
            }
            AlertCondition::HighWind => ("💨 High Wind Alert", "Secure outdoor objects."),
            AlertCondition::Freezing => ("❄️ Freezing Temperature", "Watch for icy conditions."),
        };
        Self { title, message }
    }
}

impl fmt::Display for AlertBanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirQualityBadge {
    pub aqi: u8,
    pub label: &'static str,
    pub color: &'static str,
}

impl From<AirQuality> for AirQualityBadge {
    fn from(aqi: AirQuality) -> Self {
        // AQI is 1-based, the table is 0-based.
        let (label, color) = AQI_LEVELS[usize::from(aqi.value() - 1)];
        Self {
            aqi: aqi.value(),
            label,
            color,
        }
    }
}

/// Maps a raw AQI reading to its label and color.
pub fn display_air_quality(aqi: i64) -> Result<AirQualityBadge, WeatherError> {
    AirQuality::new(aqi).map(AirQualityBadge::from)
}

impl fmt::Display for AirQualityBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Air Quality  {} ({}/5) [{}]", self.label, self.aqi, self.color)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryView {
    pub entries: Vec<String>,
}

impl fmt::Display for HistoryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return Ok(());
        }
        writeln!(f, "Recent Searches:")?;
        for (idx, city) in self.entries.iter().enumerate() {
            writeln!(f, "  {}. {city}", idx + 1)?;
        }
        Ok(())
    }
}

/// The rendered output area.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    conditions: Option<ConditionsView>,
    forecast: Option<ForecastView>,
    alert: Option<AlertBanner>,
    air_quality: Option<AirQualityBadge>,
    history: Option<HistoryView>,
    error: Option<String>,
}

impl Page {
    pub fn conditions(&self) -> Option<&ConditionsView> {
        self.conditions.as_ref()
    }

    pub fn forecast(&self) -> Option<&ForecastView> {
        self.forecast.as_ref()
    }

    pub fn alert(&self) -> Option<&AlertBanner> {
        self.alert.as_ref()
    }

    pub fn air_quality(&self) -> Option<&AirQualityBadge> {
        self.air_quality.as_ref()
    }

    pub fn history(&self) -> Option<&HistoryView> {
        self.history.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_conditions(&mut self, view: Option<ConditionsView>) {
        self.conditions = view;
    }

    pub fn set_forecast(&mut self, view: Option<ForecastView>) {
        self.forecast = view;
    }

    pub fn set_alert(&mut self, banner: Option<AlertBanner>) {
        self.alert = banner;
    }

    pub fn set_air_quality(&mut self, badge: Option<AirQualityBadge>) {
        self.air_quality = badge;
    }

    pub fn set_history(&mut self, entries: Vec<String>) {
        self.history = Some(HistoryView { entries });
    }

    pub fn show_error(&mut self, err: &WeatherError) {
        self.error = Some(format!("Error: {err}"));
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Drops everything describing the previously shown location.
    pub fn clear_weather(&mut self) {
        self.conditions = None;
        self.forecast = None;
        self.alert = None;
        self.air_quality = None;
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(alert) = &self.alert {
            writeln!(f, "{alert}")?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "{error}")?;
            writeln!(f)?;
        }
        if let Some(conditions) = &self.conditions {
            write!(f, "{conditions}")?;
            if let Some(aqi) = &self.air_quality {
                write!(f, "{aqi}")?;
            }
            writeln!(f)?;
        }
        if let Some(forecast) = &self.forecast {
            writeln!(f, "{forecast}")?;
        }
        if let Some(history) = &self.history {
            write!(f, "{history}")?;
        }
        Ok(())
    }
}
