//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client behind the `WeatherProvider` trait
//! - Search history persistence
//! - The page view model and the controller that drives it
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod config;
pub mod error;
pub mod forecast;
pub mod geo;
pub mod history;
pub mod model;
pub mod provider;
pub mod render;
pub mod session;

pub use config::Config;
pub use error::WeatherError;
pub use geo::{FixedGeolocator, Geolocator, IpGeolocator};
pub use history::{FileStore, HistoryStore, KeyValueStore, MemoryStore};
pub use model::{
    AirQuality, AlertCondition, Coordinates, CurrentConditions, DailyForecast, ForecastEntry,
    Location, Query, UnitSystem,
};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider, provider_from_config};
pub use render::{Page, display_air_quality};
pub use session::{Action, Controller, SessionState};
