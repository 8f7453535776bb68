use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WeatherError;

/// Measurement system used for display suffixes and the `units` request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "°C",
            UnitSystem::Imperial => "°F",
        }
    }

    pub fn speed_suffix(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "m/s",
            UnitSystem::Imperial => "mph",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Result<Self, WeatherError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(WeatherError::Validation(format!(
                "Invalid coordinates: {lat}, {lon}"
            )));
        }
        Ok(Self { lat, lon })
    }
}

/// What a fetch is about: a typed city name or a geographic position.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    City(String),
    Coords(Coordinates),
}

impl Location {
    /// Trims a city name and rejects empty input.
    pub fn city(raw: &str) -> Result<Self, WeatherError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WeatherError::empty_city());
        }
        Ok(Self::City(trimmed.to_string()))
    }

    /// Checks the invariants a constructed value may have skipped.
    pub fn validate(&self) -> Result<(), WeatherError> {
        match self {
            Location::City(name) if name.trim().is_empty() => Err(WeatherError::empty_city()),
            Location::City(_) => Ok(()),
            Location::Coords(c) => Coordinates::new(c.lat, c.lon).map(|_| ()),
        }
    }

    pub fn city_name(&self) -> Option<&str> {
        match self {
            Location::City(name) => Some(name),
            Location::Coords(_) => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::City(name) => f.write_str(name),
            Location::Coords(c) => write!(f, "{:.4}, {:.4}", c.lat, c.lon),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub location: Location,
    pub units: UnitSystem,
}

impl Query {
    pub fn new(location: Location, units: UnitSystem) -> Self {
        Self { location, units }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub name: String,
    pub country: String,
    pub coords: Coordinates,
    pub observed_at: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub pressure: u32,
    pub visibility_m: u32,
    /// Condition group, e.g. "Thunderstorm" or "Clouds".
    pub condition: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEntry {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    /// Short weekday name, e.g. "Mon".
    pub label: String,
    pub entries: Vec<ForecastEntry>,
    pub average_temperature: i64,
    pub icon: String,
}

/// Air quality index on the 1 (Good) to 5 (Very Poor) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirQuality(u8);

impl AirQuality {
    pub fn new(aqi: i64) -> Result<Self, WeatherError> {
        match u8::try_from(aqi) {
            Ok(value @ 1..=5) => Ok(Self(value)),
            _ => Err(WeatherError::Range(aqi)),
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Severe-weather condition derived from metric current conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCondition {
    Thunderstorm,
    HighWind,
    Freezing,
}

impl AlertCondition {
    pub const HIGH_WIND_MPS: f64 = 10.0;
    pub const FREEZING_C: f64 = 0.0;

    /// First matching condition wins, in declaration order.
    ///
    /// Expects metric values; the thresholds are in m/s and °C.
    pub fn evaluate(current: &CurrentConditions) -> Option<Self> {
        if current.condition == "Thunderstorm" {
            Some(AlertCondition::Thunderstorm)
        } else if current.wind_speed > Self::HIGH_WIND_MPS {
            Some(AlertCondition::HighWind)
        } else if current.temperature < Self::FREEZING_C {
            Some(AlertCondition::Freezing)
        } else {
            None
        }
    }
}

/// Rounds to the nearest integer with halves going towards positive infinity.
pub(crate) fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
