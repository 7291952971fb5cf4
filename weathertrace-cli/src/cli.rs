use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, CustomType, Password, Select, Text};
use std::sync::Arc;
use weathertrace_core::{
    City, Config, FilePreferences, TemperatureType, TemperatureUnit, ViewState, WeatherController,
};

use crate::{interactive, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weathertrace", version, about = "Temperature trends across past years for any city")]
pub struct Cli {
    #[command(flatten)]
    pub global: Global,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct Global {
    /// Use generated data instead of calling the weather and geocoding services.
    #[arg(long, env = "WEATHERTRACE_DEV_MODE", global = true)]
    pub dev_mode: bool,

    /// OpenWeather API key; overrides the configured one.
    #[arg(long, env = "WEATHERTRACE_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Temperature unit: c or f.
    #[arg(long, global = true, value_parser = parse_unit)]
    pub unit: Option<TemperatureUnit>,

    /// Years of history to fetch, still bounded by the configured maximum.
    #[arg(long, global = true)]
    pub years: Option<u32>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, contact email and history depth.
    Configure,

    /// Search for cities by name.
    Search {
        query: String,

        #[arg(long)]
        limit: Option<usize>,

        /// Comma-separated country codes, e.g. "fr,be".
        #[arg(long)]
        country: Option<String>,
    },

    /// Show the yearly temperature trend for today's date.
    History {
        /// City to search for, or the label for --lat/--lon.
        query: String,

        /// Which daily extreme to chart: min or max.
        #[arg(long, default_value = "max", value_parser = parse_kind)]
        kind: TemperatureType,

        /// Skip the search and use these coordinates.
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },

    /// Manage favorite cities.
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },

    /// Search, pick and compare cities in a prompt loop.
    Interactive,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    List,
    /// Search a city and add the first match.
    Add { query: String },
    /// Remove the favorite at a 1-based position.
    Remove { index: usize },
    /// Move a favorite between 1-based positions.
    Move { from: usize, to: usize },
    /// Show the trend for the favorite at a 1-based position.
    Show { index: usize },
    Clear,
}

fn parse_unit(value: &str) -> Result<TemperatureUnit, String> {
    TemperatureUnit::try_from(value).map_err(|e| e.to_string())
}

fn parse_kind(value: &str) -> Result<TemperatureType, String> {
    TemperatureType::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        self.global.apply(&mut config);
        log::debug!(
            "Using {} data, {} year(s) of history",
            if config.dev_mode { "generated" } else { "live" },
            config.years_to_fetch()
        );

        match self.command {
            Command::Configure => configure(config),
            Command::Search { query, limit, country } => {
                if let Some(limit) = limit {
                    config.search_limit = limit;
                }
                if country.is_some() {
                    config.country_codes = country;
                }
                let ctl = controller(&config).await?;
                let cities = search(&ctl, &query).await?;
                render::print_cities(&cities);
                Ok(())
            }
            Command::History { query, kind, lat, lon } => {
                let ctl = controller(&config).await?;
                let city = match (lat, lon) {
                    (Some(lat), Some(lon)) => City::new(query, lat, lon),
                    _ => first_match(&ctl, &query).await?,
                };
                ctl.set_temperature_to_display(kind);
                let state = show_city(&ctl, city).await?;
                render::print_trend(&state);
                Ok(())
            }
            Command::Favorites { action } => {
                let ctl = controller(&config).await?;
                favorites(&ctl, action).await
            }
            Command::Interactive => {
                let ctl = controller(&config).await?;
                interactive::run(&ctl).await
            }
        }
    }
}

impl Global {
    fn apply(&self, config: &mut Config) {
        if self.dev_mode {
            config.dev_mode = true;
        }
        if let Some(key) = &self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(unit) = self.unit {
            config.default_unit = unit;
        }
        if let Some(years) = self.years {
            config.past_years_to_fetch = years;
        }
    }
}

async fn controller(config: &Config) -> anyhow::Result<WeatherController> {
    let storage = Arc::new(FilePreferences::new(Config::preferences_file_path()?));
    WeatherController::from_config(config, storage).await
}

/// Run a search through the controller and wait for it to settle.
pub async fn search(ctl: &WeatherController, query: &str) -> anyhow::Result<Vec<City>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut rx = ctl.subscribe();
    let before = rx.borrow_and_update().searches_completed;
    ctl.search_cities(query);

    let state = rx
        .wait_for(|s| s.searches_completed > before)
        .await
        .context("Search was interrupted")?
        .clone();

    if state.is_error_searching_city {
        return Err(anyhow!("City search for '{query}' failed. Run with RUST_LOG=warn for details."));
    }
    Ok(state.search_results)
}

async fn first_match(ctl: &WeatherController, query: &str) -> anyhow::Result<City> {
    search(ctl, query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No city found for '{query}'"))
}

/// Make `city` current and wait for its history.
pub async fn show_city(ctl: &WeatherController, city: City) -> anyhow::Result<ViewState> {
    let mut rx = ctl.subscribe();
    let before = rx.borrow_and_update().fetches_completed;

    if !ctl.set_current_city(city) {
        return Ok(ctl.state());
    }

    let state = rx
        .wait_for(|s| s.fetches_completed > before)
        .await
        .context("Weather fetch was interrupted")?
        .clone();

    if let Some(err) = state.last_error.as_ref().filter(|_| state.is_error_fetching_weather) {
        return Err(anyhow!("Failed to fetch weather: {err}"));
    }
    Ok(state)
}

fn favorite_at(ctl: &WeatherController, index: usize) -> anyhow::Result<City> {
    let favorites = ctl.favorites();
    index
        .checked_sub(1)
        .and_then(|i| favorites.get(i).cloned())
        .ok_or_else(|| anyhow!("No favorite at position {index} (have {})", favorites.len()))
}

async fn favorites(ctl: &WeatherController, action: FavoritesAction) -> anyhow::Result<()> {
    match action {
        FavoritesAction::List => render::print_cities(&ctl.favorites()),
        FavoritesAction::Add { query } => {
            let city = first_match(ctl, &query).await?;
            if ctl.is_favorite(&city) {
                println!("Already a favorite: {}", city.name);
            } else {
                ctl.toggle_favorite(&city).await?;
                println!("Added {}", city.name);
            }
        }
        FavoritesAction::Remove { index } => {
            let city = favorite_at(ctl, index)?;
            ctl.toggle_favorite(&city).await?;
            println!("Removed {}", city.name);
        }
        FavoritesAction::Move { from, to } => {
            let moved = match (from.checked_sub(1), to.checked_sub(1)) {
                (Some(from), Some(to)) => ctl.reorder_favorites(from, to).await?,
                _ => false,
            };
            if moved {
                render::print_cities(&ctl.favorites());
            } else {
                println!("Nothing moved.");
            }
        }
        FavoritesAction::Show { index } => {
            let city = favorite_at(ctl, index)?;
            let state = show_city(ctl, city).await?;
            render::print_trend(&state);
        }
        FavoritesAction::Clear => {
            ctl.clear_favorites().await?;
            println!("Favorites cleared.");
        }
    }
    Ok(())
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeather API key (leave empty to keep current):")
        .without_confirmation()
        .prompt()?;
    if !api_key.trim().is_empty() {
        config.api_key = Some(api_key.trim().to_string());
    }

    let email = Text::new("Contact email for the geocoding service:")
        .with_default(config.contact_email.as_deref().unwrap_or_default())
        .prompt()?;
    config.contact_email = Some(email.trim().to_string()).filter(|e| !e.is_empty());

    config.past_years_to_fetch = CustomType::<u32>::new("Years of history to fetch:")
        .with_default(config.past_years_to_fetch)
        .prompt()?;
    config.past_years_to_fetch_max = CustomType::<u32>::new("Maximum years of history:")
        .with_default(config.past_years_to_fetch_max.max(config.past_years_to_fetch))
        .prompt()?;

    let units = vec![TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius];
    let start = units.iter().position(|u| *u == config.default_unit).unwrap_or(0);
    config.default_unit =
        Select::new("Default temperature unit:", units).with_starting_cursor(start).prompt()?;

    config.dev_mode = Confirm::new("Use generated data instead of the network (dev mode)?")
        .with_default(config.dev_mode)
        .prompt()?;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
