use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};

use crate::{error::WeatherError, model::Coordinates};

pub const IP_LOOKUP_URL: &str = "https://ipapi.co/json/";

/// Answers "where am I?" for the use-location action.
#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn locate(&self) -> Result<Coordinates, WeatherError>;
}

/// A position known up front, e.g. from flags or config. `None` means unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedGeolocator(pub Option<Coordinates>);

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn locate(&self) -> Result<Coordinates, WeatherError> {
        self.0.ok_or_else(WeatherError::location_unsupported)
    }
}

/// Approximate position from the public IP address.
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    http: Client,
    url: String,
}

impl Default for IpGeolocator {
    fn default() -> Self {
        Self::with_url(IP_LOOKUP_URL)
    }
}

impl IpGeolocator {
    pub fn with_url(url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn locate(&self) -> Result<Coordinates, WeatherError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|err| {
                tracing::warn!(error = %err, "IP geolocation request failed");
                WeatherError::location_denied()
            })?;

        let payload: IpApiResponse = response.json().await.map_err(|err| {
            tracing::warn!(error = %err, "IP geolocation payload unreadable");
            WeatherError::location_denied()
        })?;

        match (payload.latitude, payload.longitude) {
            (Some(lat), Some(lon)) => {
                Coordinates::new(lat, lon).map_err(|_| WeatherError::location_denied())
            }
            _ => Err(WeatherError::location_denied()),
        }
    }
}
