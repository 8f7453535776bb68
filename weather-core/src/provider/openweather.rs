use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use std::{
    fmt::{Debug, Display},
    time::Duration,
};

use crate::{
    error::WeatherError,
    forecast::group_by_weekday,
    model::{
        AirQuality, Coordinates, CurrentConditions, DailyForecast, ForecastEntry, Location, Query,
        UnitSystem,
    },
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenWeather client. `Tz` is the viewer's zone, used to assign forecast entries to weekdays.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider<Tz = Local> {
    api_key: String,
    base_url: String,
    tz: Tz,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tz: Local,
            http,
        }
    }
}

impl<Tz> OpenWeatherProvider<Tz> {
    pub fn with_timezone<T: TimeZone>(self, tz: T) -> OpenWeatherProvider<T> {
        OpenWeatherProvider {
            api_key: self.api_key,
            base_url: self.base_url,
            tz,
            http: self.http,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!(%url, ?params, "OpenWeather request");

        let res = self
            .http
            .get(&url)
            .query(params)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::NotFound);
        }
        if !status.is_success() {
            tracing::debug!(%status, body = %truncate_body(&body), "OpenWeather request failed");
            return Err(WeatherError::Request {
                status: status.as_u16(),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn location_params(location: &Location) -> Vec<(&'static str, String)> {
    match location {
        Location::City(name) => vec![("q", name.trim().to_string())],
        Location::Coords(c) => vec![("lat", c.lat.to_string()), ("lon", c.lon.to_string())],
    }
}

#[async_trait]
impl<Tz> WeatherProvider for OpenWeatherProvider<Tz>
where
    Tz: TimeZone + Send + Sync + Debug + 'static,
    Tz::Offset: Display + Send + Sync,
{
    async fn fetch_current(&self, query: &Query) -> Result<CurrentConditions, WeatherError> {
        query.location.validate()?;

        let mut params = location_params(&query.location);
        params.push(("units", query.units.as_str().to_string()));

        let parsed: OwCurrentResponse = self.get_json("weather", &params).await?;
        let current = parsed.into_conditions()?;

        tracing::info!(city = %current.name, temp = current.temperature, units = %query.units, "current conditions fetched");
        Ok(current)
    }

    async fn fetch_forecast(
        &self,
        location: &Location,
        units: UnitSystem,
    ) -> Result<Vec<DailyForecast>, WeatherError> {
        location.validate()?;

        let mut params = location_params(location);
        params.push(("units", units.as_str().to_string()));

        let parsed: OwForecastResponse = self.get_json("forecast", &params).await?;
        let entries: Vec<ForecastEntry> = parsed
            .list
            .into_iter()
            .filter_map(OwForecastEntry::into_entry)
            .collect();

        Ok(group_by_weekday(entries, &self.tz))
    }

    async fn fetch_air_quality(&self, coords: Coordinates) -> Result<AirQuality, WeatherError> {
        let coords = Coordinates::new(coords.lat, coords.lon)?;
        let params = [("lat", coords.lat.to_string()), ("lon", coords.lon.to_string())];

        let parsed: OwAirResponse = self.get_json("air_pollution", &params).await?;
        let reading = parsed.list.first().ok_or_else(|| {
            WeatherError::Transport("air pollution response contained no data".to_string())
        })?;

        AirQuality::new(reading.main.aqi)
    }
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    coord: OwCoord,
    sys: OwSys,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    visibility: u32,
}

impl OwCurrentResponse {
    fn into_conditions(self) -> Result<CurrentConditions, WeatherError> {
        let observed_at = unix_to_utc(self.dt).ok_or_else(|| {
            WeatherError::Transport(format!("invalid observation timestamp {}", self.dt))
        })?;
        let weather = self.weather.into_iter().next().ok_or_else(|| {
            WeatherError::Transport("response contained no weather entries".to_string())
        })?;

        Ok(CurrentConditions {
            name: self.name,
            country: self.sys.country,
            coords: Coordinates {
                lat: self.coord.lat,
                lon: self.coord.lon,
            },
            observed_at,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            humidity: self.main.humidity,
            wind_speed: self.wind.speed,
            pressure: self.main.pressure,
            visibility_m: self.visibility,
            condition: weather.main,
            description: weather.description,
            icon: weather.icon,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastWeather {
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwForecastMain,
    weather: Vec<OwForecastWeather>,
}

impl OwForecastEntry {
    fn into_entry(self) -> Option<ForecastEntry> {
        let Some(time) = unix_to_utc(self.dt) else {
            tracing::debug!(dt = self.dt, "skipping forecast entry with bad timestamp");
            return None;
        };
        let icon = self.weather.into_iter().next()?.icon;

        Some(ForecastEntry {
            time,
            temperature: self.main.temp,
            icon,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwAirMain {
    aqi: i64,
}

#[derive(Debug, Deserialize)]
struct OwAirReading {
    main: OwAirMain,
}

#[derive(Debug, Deserialize)]
struct OwAirResponse {
    list: Vec<OwAirReading>,
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
