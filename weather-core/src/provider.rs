use crate::{
    Config,
    error::WeatherError,
    model::{AirQuality, AlertCondition, Coordinates, CurrentConditions, DailyForecast, Location, Query, UnitSystem},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Source of weather data. Implementations never touch session state.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_current(&self, query: &Query) -> Result<CurrentConditions, WeatherError>;

    async fn fetch_forecast(
        &self,
        location: &Location,
        units: UnitSystem,
    ) -> Result<Vec<DailyForecast>, WeatherError>;

    async fn fetch_air_quality(&self, coords: Coordinates) -> Result<AirQuality, WeatherError>;

    /// Fetches metric conditions for `location` and derives an alert from them.
    async fn check_alerts(&self, location: &Location) -> Result<Option<AlertCondition>, WeatherError> {
        let current = self
            .fetch_current(&Query::new(location.clone(), UnitSystem::Metric))
            .await?;
        Ok(AlertCondition::evaluate(&current))
    }
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
             Hint: run `weather configure` or set OPENWEATHER_API_KEY."
        )
    })?;

    let provider = OpenWeatherProvider::with_base_url(api_key.to_owned(), config.base_url());
    Ok(Box::new(provider))
}
