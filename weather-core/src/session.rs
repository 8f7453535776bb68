//! Input handling: maps user actions to fetches and applies results to the page.

use chrono::{Local, TimeZone};
use std::fmt::Display;

use crate::{
    error::WeatherError,
    geo::Geolocator,
    history::{HistoryStore, KeyValueStore},
    model::{AirQuality, AlertCondition, CurrentConditions, DailyForecast, Location, Query, UnitSystem},
    provider::WeatherProvider,
    render::{AirQualityBadge, AlertBanner, ConditionsView, ForecastView, Page},
};

/// Tags a fetch cycle; only the newest issued token may update the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// Unit choice and last successful location, owned by the controller.
#[derive(Debug, Clone)]
pub struct SessionState {
    units: UnitSystem,
    last_location: Option<Location>,
    issued: u64,
}

impl SessionState {
    pub fn new(units: UnitSystem) -> Self {
        Self {
            units,
            last_location: None,
            issued: 0,
        }
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn last_location(&self) -> Option<&Location> {
        self.last_location.as_ref()
    }

    fn issue(&mut self) -> RequestToken {
        self.issued += 1;
        RequestToken(self.issued)
    }

    fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.issued
    }
}

/// User-facing input operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Startup: show stored history and fetch the default city.
    Load,
    /// Search button or Enter in the city field.
    Search(String),
    ToggleUnit(UnitSystem),
    UseLocation,
    SelectHistory(String),
}

/// A validated query waiting to be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFetch {
    pub token: RequestToken,
    pub query: Query,
}

/// Results of the forecast, alert and air-quality fetches.
#[derive(Debug)]
pub struct Secondary {
    pub forecast: Result<Vec<DailyForecast>, WeatherError>,
    pub alert: Result<Option<AlertCondition>, WeatherError>,
    pub air_quality: Result<AirQuality, WeatherError>,
}

#[derive(Debug)]
pub struct FetchResult {
    pub token: RequestToken,
    pub query: Query,
    pub outcome: Result<(CurrentConditions, Secondary), WeatherError>,
}

/// Owns the session, page and history. `Tz` is the viewer's zone for rendered dates.
#[derive(Debug)]
pub struct Controller<S, Tz = Local> {
    provider: Box<dyn WeatherProvider>,
    geolocator: Box<dyn Geolocator>,
    history: HistoryStore<S>,
    session: SessionState,
    page: Page,
    default_city: String,
    tz: Tz,
}

impl<S: KeyValueStore> Controller<S> {
    pub fn new(
        provider: Box<dyn WeatherProvider>,
        geolocator: Box<dyn Geolocator>,
        history: HistoryStore<S>,
        default_city: impl Into<String>,
        units: UnitSystem,
    ) -> Self {
        Self {
            provider,
            geolocator,
            history,
            session: SessionState::new(units),
            page: Page::default(),
            default_city: default_city.into(),
            tz: Local,
        }
    }
}

impl<S, Tz> Controller<S, Tz>
where
    S: KeyValueStore,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn with_timezone<T: TimeZone>(self, tz: T) -> Controller<S, T> {
        Controller {
            provider: self.provider,
            geolocator: self.geolocator,
            history: self.history,
            session: self.session,
            page: self.page,
            default_city: self.default_city,
            tz,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn history(&self) -> Vec<String> {
        self.history.list()
    }

    /// Runs one action to completion and returns the updated page.
    pub async fn dispatch(&mut self, action: Action) -> &Page {
        tracing::debug!(?action, "dispatch");
        match self.begin(action).await {
            Ok(Some(pending)) => {
                let result = self.run(pending).await;
                self.apply(result);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "action rejected");
                self.page.show_error(&err);
            }
        }
        &self.page
    }

    /// Validates an action and issues a token for the fetch it needs, if any.
    pub async fn begin(&mut self, action: Action) -> Result<Option<PendingFetch>, WeatherError> {
        match action {
            Action::Load => {
                self.page.set_history(self.history.list());
                let location = Location::city(&self.default_city)?;
                Ok(Some(self.pending(location)))
            }
            Action::Search(text) | Action::SelectHistory(text) => {
                let location = Location::city(&text)?;
                Ok(Some(self.pending(location)))
            }
            Action::ToggleUnit(units) => {
                self.session.units = units;
                let last = self.session.last_location.clone();
                Ok(last.map(|location| self.pending(location)))
            }
            Action::UseLocation => {
                let coords = self.geolocator.locate().await?;
                Ok(Some(self.pending(Location::Coords(coords))))
            }
        }
    }

    fn pending(&mut self, location: Location) -> PendingFetch {
        PendingFetch {
            token: self.session.issue(),
            query: Query::new(location, self.session.units),
        }
    }

    /// Performs the network calls for `pending`. Touches no state.
    pub async fn run(&self, pending: PendingFetch) -> FetchResult {
        let PendingFetch { token, query } = pending;

        let outcome = match self.provider.fetch_current(&query).await {
            Ok(current) => {
                let secondary = self.fetch_secondary(&query, &current).await;
                Ok((current, secondary))
            }
            Err(err) => Err(err),
        };

        FetchResult {
            token,
            query,
            outcome,
        }
    }

    async fn fetch_secondary(&self, query: &Query, current: &CurrentConditions) -> Secondary {
        let (forecast, alert, air_quality) = tokio::join!(
            self.provider.fetch_forecast(&query.location, query.units),
            self.provider.check_alerts(&query.location),
            self.provider.fetch_air_quality(current.coords),
        );
        Secondary {
            forecast,
            alert,
            air_quality,
        }
    }

    /// Renders `result` unless a newer fetch has been issued since. Returns whether it was applied.
    pub fn apply(&mut self, result: FetchResult) -> bool {
        if !self.session.is_current(result.token) {
            tracing::debug!(token = ?result.token, location = %result.query.location, "discarding stale result");
            return false;
        }

        let FetchResult { query, outcome, .. } = result;
        match outcome {
            Ok((current, secondary)) => self.render_success(query, &current, secondary),
            Err(err) => {
                tracing::warn!(error = %err, location = %query.location, "weather fetch failed");
                let err = match &query.location {
                    Location::Coords(_) => WeatherError::location_fetch_failed(),
                    Location::City(_) => err,
                };
                self.page.clear_weather();
                self.page.show_error(&err);
            }
        }
        true
    }

    fn render_success(&mut self, query: Query, current: &CurrentConditions, secondary: Secondary) {
        let units = query.units;
        self.page.clear_error();
        self.page
            .set_conditions(Some(ConditionsView::new(current, units, &self.tz)));

        if let Some(city) = query.location.city_name() {
            let list = self.history.record(city);
            self.page.set_history(list);
        }
        self.session.last_location = Some(query.location);

        let forecast = secondary
            .forecast
            .map_err(|err| tracing::warn!(error = %err, "forecast fetch failed"))
            .ok()
            .map(|days| ForecastView::new(&days, units));
        self.page.set_forecast(forecast);

        let alert = secondary
            .alert
            .map_err(|err| tracing::warn!(error = %err, "alert check failed"))
            .ok()
            .flatten()
            .map(AlertBanner::from);
        self.page.set_alert(alert);

        let air_quality = secondary
            .air_quality
            .map_err(|err| tracing::warn!(error = %err, "air quality fetch failed"))
            .ok()
            .map(AirQualityBadge::from);
        self.page.set_air_quality(air_quality);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geo::FixedGeolocator,
        history::MemoryStore,
        model::{Coordinates, tests::sample_conditions},
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct FakeProvider {
        calls: Arc<Mutex<Vec<Query>>>,
        fail_forecast: bool,
        fail_alerts: bool,
        fail_coords: bool,
        thunder: bool,
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn fetch_current(&self, query: &Query) -> Result<CurrentConditions, WeatherError> {
            query.location.validate()?;
            self.calls.lock().unwrap().push(query.clone());

            let mut current = sample_conditions();
            match &query.location {
                Location::City(name) if name == "Qwxyzcity" => return Err(WeatherError::NotFound),
                Location::City(name) => current.name = name.clone(),
                Location::Coords(_) if self.fail_coords => {
                    return Err(WeatherError::Request { status: 503 });
                }
                Location::Coords(_) => current.name = "Here".to_string(),
            }
            if self.thunder {
                current.condition = "Thunderstorm".to_string();
                current.wind_speed = 15.0;
            }
            if query.units == UnitSystem::Imperial {
                current.temperature = 58.3;
                current.wind_speed = 8.1;
            }
            Ok(current)
        }

        async fn fetch_forecast(
            &self,
            _location: &Location,
            _units: UnitSystem,
        ) -> Result<Vec<DailyForecast>, WeatherError> {
            if self.fail_forecast {
                return Err(WeatherError::Request { status: 500 });
            }
            Ok(vec![DailyForecast {
                label: "Sat".into(),
                entries: Vec::new(),
                average_temperature: 14,
                icon: "04d".into(),
            }])
        }

        async fn fetch_air_quality(&self, _coords: Coordinates) -> Result<AirQuality, WeatherError> {
            AirQuality::new(2)
        }

        async fn check_alerts(
            &self,
            location: &Location,
        ) -> Result<Option<AlertCondition>, WeatherError> {
            if self.fail_alerts {
                return Err(WeatherError::Transport("connection reset".into()));
            }
            let query = Query::new(location.clone(), UnitSystem::Metric);
            let current = self.fetch_current(&query).await?;
            Ok(AlertCondition::evaluate(&current))
        }
    }

    fn controller(provider: FakeProvider) -> Controller<MemoryStore, Utc> {
        controller_with_geo(provider, FixedGeolocator(None))
    }

    fn controller_with_geo(
        provider: FakeProvider,
        geo: FixedGeolocator,
    ) -> Controller<MemoryStore, Utc> {
        Controller::new(
            Box::new(provider),
            Box::new(geo),
            HistoryStore::new(MemoryStore::default()),
            "London",
            UnitSystem::Metric,
        )
        .with_timezone(Utc)
    }

    #[tokio::test]
    async fn load_fetches_the_default_city() {
        let provider = FakeProvider::default();
        let calls = provider.calls.clone();
        let mut ctl = controller(provider);

        let page = ctl.dispatch(Action::Load).await;

        assert_eq!(page.conditions().unwrap().heading, "London, FR");
        assert_eq!(calls.lock().unwrap()[0].location, Location::City("London".into()));
    }

    #[tokio::test]
    async fn search_renders_every_region() {
        let mut ctl = controller(FakeProvider::default());

        let page = ctl.dispatch(Action::Search("Paris".into())).await;

        assert_eq!(page.conditions().unwrap().temperature, "15°C");
        assert_eq!(page.forecast().unwrap().days.len(), 1);
        assert_eq!(page.air_quality().unwrap().label, "Fair");
        assert!(page.alert().is_none());
        assert_eq!(page.history().unwrap().entries, vec!["Paris"]);
        assert!(page.error().is_none());
    }

    #[tokio::test]
    async fn toggle_refetches_last_city_in_new_units() {
        let provider = FakeProvider::default();
        let calls = provider.calls.clone();
        let mut ctl = controller(provider);

        ctl.dispatch(Action::Search("Paris".into())).await;
        let page = ctl.dispatch(Action::ToggleUnit(UnitSystem::Imperial)).await;

        let view = page.conditions().unwrap();
        assert_eq!(view.heading, "Paris, FR");
        assert_eq!(view.temperature, "58°F");
        assert_eq!(view.wind, "8.1 mph");

        // search, alert check, toggle refetch, alert check
        let calls = calls.lock().unwrap();
        let primary: Vec<_> = calls.iter().filter(|q| q.units == UnitSystem::Imperial).collect();
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].location, Location::City("Paris".into()));
    }

    #[tokio::test]
    async fn toggle_without_previous_search_only_changes_units() {
        let provider = FakeProvider::default();
        let calls = provider.calls.clone();
        let mut ctl = controller(provider);

        ctl.dispatch(Action::ToggleUnit(UnitSystem::Imperial)).await;

        assert_eq!(ctl.session().units(), UnitSystem::Imperial);
        assert!(calls.lock().unwrap().is_empty());
        assert!(ctl.page().conditions().is_none());
    }

    #[tokio::test]
    async fn empty_search_shows_validation_message_without_fetching() {
        let provider = FakeProvider::default();
        let calls = provider.calls.clone();
        let mut ctl = controller(provider);

        let page = ctl.dispatch(Action::Search("   ".into())).await;

        assert_eq!(page.error(), Some("Error: Please enter a city name"));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_city_clears_conditions_and_shows_error() {
        let mut ctl = controller(FakeProvider::default());
        ctl.dispatch(Action::Search("Paris".into())).await;

        let page = ctl.dispatch(Action::Search("Qwxyzcity".into())).await;

        assert_eq!(page.error(), Some("Error: City not found. Please check the spelling."));
        assert!(page.conditions().is_none());
        assert!(page.forecast().is_none());
        assert_eq!(ctl.history(), vec!["Paris"]);
    }

    #[tokio::test]
    async fn failed_search_keeps_last_successful_location_for_toggle() {
        let provider = FakeProvider::default();
        let calls = provider.calls.clone();
        let mut ctl = controller(provider);

        ctl.dispatch(Action::Search("Paris".into())).await;
        ctl.dispatch(Action::Search("Qwxyzcity".into())).await;
        ctl.dispatch(Action::ToggleUnit(UnitSystem::Imperial)).await;

        let calls = calls.lock().unwrap();
        assert_eq!(calls.last().unwrap().location, Location::City("Paris".into()));
    }

    #[tokio::test]
    async fn forecast_failure_keeps_conditions() {
        let mut ctl = controller(FakeProvider {
            fail_forecast: true,
            ..FakeProvider::default()
        });

        let page = ctl.dispatch(Action::Search("Paris".into())).await;

        assert!(page.conditions().is_some());
        assert!(page.forecast().is_none());
        assert!(page.error().is_none());
    }

    #[tokio::test]
    async fn alert_check_failure_only_hides_the_banner() {
        let mut ctl = controller(FakeProvider {
            fail_alerts: true,
            thunder: true,
            ..FakeProvider::default()
        });

        let page = ctl.dispatch(Action::Search("Paris".into())).await;

        assert!(page.conditions().is_some());
        assert!(page.forecast().is_some());
        assert!(page.air_quality().is_some());
        assert!(page.alert().is_none());
        assert!(page.error().is_none());
    }

    #[tokio::test]
    async fn thunderstorm_banner_is_shown_alone() {
        let mut ctl = controller(FakeProvider {
            thunder: true,
            ..FakeProvider::default()
        });

        let page = ctl.dispatch(Action::Search("Paris".into())).await;

        assert_eq!(page.alert().unwrap().title, "⚡ Thunderstorm Alert");
    }

    #[tokio::test]
    async fn use_location_without_support_reports_error() {
        let mut ctl = controller(FakeProvider::default());

        let page = ctl.dispatch(Action::UseLocation).await;

        assert_eq!(page.error(), Some("Error: Geolocation is not supported on this device."));
    }

    #[tokio::test]
    async fn use_location_fetches_by_coordinates_without_recording_history() {
        let here = Coordinates { lat: 59.33, lon: 18.07 };
        let mut ctl = controller_with_geo(FakeProvider::default(), FixedGeolocator(Some(here)));

        let page = ctl.dispatch(Action::UseLocation).await;

        assert_eq!(page.conditions().unwrap().heading, "Here, FR");
        assert!(ctl.history().is_empty());
        assert_eq!(ctl.session().last_location(), Some(&Location::Coords(here)));
    }

    #[tokio::test]
    async fn failed_fetch_for_position_uses_location_message() {
        let here = Coordinates { lat: 59.33, lon: 18.07 };
        let provider = FakeProvider {
            fail_coords: true,
            ..FakeProvider::default()
        };
        let mut ctl = controller_with_geo(provider, FixedGeolocator(Some(here)));

        let page = ctl.dispatch(Action::UseLocation).await;

        assert!(page.conditions().is_none());
        assert_eq!(page.error(), Some("Error: Failed to fetch weather for your location."));
    }

    #[tokio::test]
    async fn selecting_history_moves_entry_to_front() {
        let mut ctl = controller(FakeProvider::default());
        ctl.dispatch(Action::Search("Paris".into())).await;
        ctl.dispatch(Action::Search("Rome".into())).await;

        let page = ctl.dispatch(Action::SelectHistory("Paris".into())).await;

        assert_eq!(page.history().unwrap().entries, vec!["Paris", "Rome"]);
    }

    #[tokio::test]
    async fn stale_result_is_discarded() {
        let mut ctl = controller(FakeProvider::default());

        let older = ctl.begin(Action::Search("Paris".into())).await.unwrap().unwrap();
        let newer = ctl.begin(Action::Search("Rome".into())).await.unwrap().unwrap();
        assert!(older.token < newer.token);

        let older = ctl.run(older).await;
        let newer = ctl.run(newer).await;

        assert!(ctl.apply(newer));
        assert!(!ctl.apply(older));
        assert_eq!(ctl.page().conditions().unwrap().heading, "Rome, FR");
        assert_eq!(ctl.history(), vec!["Rome"]);
    }
}
