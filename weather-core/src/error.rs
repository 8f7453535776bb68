use thiserror::Error;

/// Failure kinds surfaced by the weather client and the controller.
///
/// The `Display` text of each variant is the message shown to the user.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeatherError {
    #[error("{0}")]
    Validation(String),

    #[error("City not found. Please check the spelling.")]
    NotFound,

    #[error("HTTP error! status: {status}")]
    Request { status: u16 },

    #[error("Failed to reach the weather service: {0}")]
    Transport(String),

    #[error("{0}")]
    Geolocation(String),

    #[error("Air quality index {0} is outside the 1-5 scale")]
    Range(i64),
}

impl WeatherError {
    pub fn empty_city() -> Self {
        Self::Validation("Please enter a city name".to_string())
    }

    pub fn location_denied() -> Self {
        Self::Geolocation("Location access denied. Please search manually.".to_string())
    }

    pub fn location_fetch_failed() -> Self {
        Self::Geolocation("Failed to fetch weather for your location.".to_string())
    }

    pub fn location_unsupported() -> Self {
        Self::Geolocation("Geolocation is not supported on this device.".to_string())
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        Self::Transport(format!("malformed response: {err}"))
    }
}
