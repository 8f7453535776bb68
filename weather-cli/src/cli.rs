use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{InquireError, Password, Select, Text};
use std::{fmt, io::Write, process::ExitCode};
use weather_core::{
    Action, Config, Controller, Coordinates, FileStore, FixedGeolocator, Geolocator, HistoryStore,
    IpGeolocator, Page, UnitSystem, provider_from_config,
};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum UnitsArg {
    Metric,
    Imperial,
}

impl From<UnitsArg> for UnitSystem {
    fn from(arg: UnitsArg) -> Self {
        match arg {
            UnitsArg::Metric => UnitSystem::Metric,
            UnitsArg::Imperial => UnitSystem::Imperial,
        }
    }
}

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Measurement system; defaults to the configured one.
    #[arg(long, global = true, value_enum)]
    pub units: Option<UnitsArg>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and default city.
    Configure,

    /// Show weather for a city, or the default city when omitted.
    Show {
        /// City name.
        city: Option<String>,
    },

    /// Show weather for the current position.
    Here {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Print or clear recent searches.
    History {
        #[arg(long)]
        clear: bool,
    },

    /// Menu-driven session: search, toggle units, use location, pick from history.
    Interactive,
}

impl Cli {
    /// Exit status is a failure when the last page ended on an error.
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        match self.command {
            Command::Configure => configure().map(|()| ExitCode::SUCCESS),
            Command::Show { city } => {
                let config = Config::load()?;
                let geo = geolocator(&config, None);
                let mut controller = build_controller(&config, self.units, geo)?;
                let action = match city {
                    Some(city) => Action::Search(city),
                    None => Action::Load,
                };
                finish(controller.dispatch(action).await, &mut std::io::stdout())
            }
            Command::Here { lat, lon } => {
                let config = Config::load()?;
                let position = match (lat, lon) {
                    (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)?),
                    _ => None,
                };
                let geo = geolocator(&config, position);
                let mut controller = build_controller(&config, self.units, geo)?;
                finish(
                    controller.dispatch(Action::UseLocation).await,
                    &mut std::io::stdout(),
                )
            }
            Command::History { clear } => {
                let mut history = HistoryStore::new(FileStore::new(Config::data_dir()?));
                if clear {
                    history.clear()?;
                    println!("Search history cleared.");
                    return Ok(ExitCode::SUCCESS);
                }
                let entries = history.list();
                if entries.is_empty() {
                    println!("No recent searches.");
                }
                for city in entries {
                    println!("{city}");
                }
                Ok(ExitCode::SUCCESS)
            }
            Command::Interactive => {
                let config = Config::load()?;
                let geo = geolocator(&config, None);
                let controller = build_controller(&config, self.units, geo)?;
                interactive(controller).await?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn build_controller(
    config: &Config,
    units: Option<UnitsArg>,
    geolocator: Box<dyn Geolocator>,
) -> anyhow::Result<Controller<FileStore>> {
    let provider = provider_from_config(config)?;
    let history = HistoryStore::new(FileStore::new(Config::data_dir()?));
    let units = units.map(UnitSystem::from).unwrap_or(config.units);
    tracing::debug!(%units, default_city = %config.default_city, "starting session");

    Ok(Controller::new(
        provider,
        geolocator,
        history,
        config.default_city.clone(),
        units,
    ))
}

/// Explicit coordinates win over configured ones; with neither, fall back to IP lookup.
fn geolocator(config: &Config, explicit: Option<Coordinates>) -> Box<dyn Geolocator> {
    match explicit.or_else(|| config.fixed_position()) {
        Some(position) => Box::new(FixedGeolocator(Some(position))),
        None => Box::new(IpGeolocator::default()),
    }
}

fn finish(page: &Page, out: &mut impl Write) -> anyhow::Result<ExitCode> {
    write!(out, "{page}")?;
    out.flush()?;
    Ok(match page.error() {
        Some(_) => ExitCode::FAILURE,
        None => ExitCode::SUCCESS,
    })
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.set_api_key(key.trim().to_string());

    let city = Text::new("Default city:")
        .with_default(&config.default_city)
        .prompt()
        .context("Failed to read default city")?;
    if !city.trim().is_empty() {
        config.default_city = city.trim().to_string();
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum MenuItem {
    Search,
    ToggleUnits(UnitSystem),
    UseLocation,
    Recent(String),
    Quit,
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Search => f.write_str("Search for a city"),
            MenuItem::ToggleUnits(units) => write!(f, "Switch to {units} units"),
            MenuItem::UseLocation => f.write_str("Use my location"),
            MenuItem::Recent(city) => write!(f, "Recent: {city}"),
            MenuItem::Quit => f.write_str("Quit"),
        }
    }
}

fn menu(units: UnitSystem, history: Vec<String>) -> Vec<MenuItem> {
    let mut items = vec![
        MenuItem::Search,
        MenuItem::ToggleUnits(units.toggled()),
        MenuItem::UseLocation,
    ];
    items.extend(history.into_iter().map(MenuItem::Recent));
    items.push(MenuItem::Quit);
    items
}

/// `None` when the user cancelled the prompt.
fn prompt<T>(result: Result<T, InquireError>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

async fn interactive(mut controller: Controller<FileStore>) -> anyhow::Result<()> {
    controller.dispatch(Action::Load).await;

    loop {
        println!("{}", controller.page());

        let items = menu(controller.session().units(), controller.history());
        let Some(choice) = prompt(Select::new("What next?", items).prompt())? else {
            break;
        };

        let action = match choice {
            MenuItem::Search => match prompt(Text::new("City:").prompt())? {
                Some(city) => Action::Search(city),
                None => continue,
            },
            MenuItem::ToggleUnits(units) => Action::ToggleUnit(units),
            MenuItem::UseLocation => Action::UseLocation,
            MenuItem::Recent(city) => Action::SelectHistory(city),
            MenuItem::Quit => break,
        };
        controller.dispatch(action).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_show_with_units() {
        let cli = Cli::try_parse_from(["weather", "show", "Paris", "--units", "imperial"]).unwrap();

        assert_eq!(cli.units, Some(UnitsArg::Imperial));
        assert!(matches!(cli.command, Command::Show { city: Some(ref c) } if c == "Paris"));
    }

    #[test]
    fn here_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["weather", "here", "--lat", "-33.87", "--lon", "151.21"])
            .unwrap();

        assert!(matches!(
            cli.command,
            Command::Here { lat: Some(lat), lon: Some(_) } if lat < 0.0
        ));
    }

    #[test]
    fn here_requires_both_coordinates() {
        assert!(Cli::try_parse_from(["weather", "here", "--lat", "1.0"]).is_err());
    }

    #[test]
    fn error_page_is_printed_and_exits_with_failure() {
        let mut page = Page::default();
        page.show_error(&weather_core::WeatherError::NotFound);
        let mut out = Vec::new();

        let code = finish(&page, &mut out).unwrap();

        assert_eq!(code, ExitCode::FAILURE);
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("City not found. Please check the spelling."));
    }

    #[test]
    fn page_without_error_exits_with_success() {
        let mut out = Vec::new();
        assert_eq!(finish(&Page::default(), &mut out).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn menu_offers_the_other_unit_and_history() {
        let items = menu(UnitSystem::Metric, vec!["Rome".into()]);

        assert_eq!(items[1], MenuItem::ToggleUnits(UnitSystem::Imperial));
        assert!(items.contains(&MenuItem::Recent("Rome".into())));
        assert_eq!(items.last(), Some(&MenuItem::Quit));
    }
}
