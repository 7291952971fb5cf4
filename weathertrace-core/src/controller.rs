//! Request lifecycle between user intents and the repositories.
//!
//! The controller owns the current city, the unit/type selection, the search
//! debounce and the in-flight fetch. State is published through a single
//! `watch` cell of [`ViewState`] that front ends subscribe to.
//!
//! City search and weather fetch each hold one task slot. Starting a task
//! bumps the slot's generation and aborts the previous task; a task writes
//! state only while holding its slot and only if its generation is still
//! current, so a superseded request can never overwrite newer results.

use chrono::{Local, NaiveDate};
use log::{debug, warn};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle, time::Instant};

use crate::{
    Config,
    error::FavoritesError,
    favorites::FavoritesStore,
    model::{City, DailyWeather, HistoricalSeries, TemperatureType, TemperatureUnit},
    repository::{
        CityRepository, RequestOptions, WeatherRepository, city_repository_from_config,
        weather_repository_from_config,
    },
    storage::PreferenceStorage,
};

/// Minimum spacing between the starts of two dispatched city searches.
pub const SEARCH_SPACING: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub request: RequestOptions,
    pub years_to_fetch: u32,
    pub search_limit: usize,
    pub country_codes: Option<String>,
    pub default_unit: TemperatureUnit,
    pub default_type: TemperatureType,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            request: RequestOptions {
                api_key: config.api_key.clone().unwrap_or_default(),
                units: config.units.clone(),
                lang: config.lang.clone(),
            },
            years_to_fetch: config.years_to_fetch(),
            search_limit: config.search_limit,
            country_codes: config.country_codes.clone(),
            default_unit: config.default_unit,
            default_type: TemperatureType::default(),
        }
    }
}

/// Everything a front end renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub search_results: Vec<City>,
    pub is_searching_city: bool,
    pub is_error_searching_city: bool,

    pub current_city: Option<City>,
    /// Raw summaries of the last successful fetch, oldest first.
    pub daily_weathers: Vec<DailyWeather>,
    pub years: Vec<i32>,
    /// `years`-aligned temperatures for the selected type, in the selected unit.
    pub processed_temperatures: Vec<f64>,
    pub temperature_unit: TemperatureUnit,
    pub temperature_type: TemperatureType,
    pub is_fetching_weather: bool,
    pub is_error_fetching_weather: bool,
    pub last_error: Option<String>,

    /// Bumped each time a dispatched search settles, successfully or not.
    pub searches_completed: u64,
    /// Bumped each time a fetch settles, successfully or not.
    pub fetches_completed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeatherState {
    Idle,
    Loading,
    Success(Vec<DailyWeather>),
    Error(String),
}

impl ViewState {
    pub fn weather_state(&self) -> WeatherState {
        if self.is_fetching_weather {
            WeatherState::Loading
        } else if self.is_error_fetching_weather {
            WeatherState::Error(
                self.last_error.clone().unwrap_or_else(|| "Failed to fetch weather".to_string()),
            )
        } else if self.current_city.is_none() {
            WeatherState::Idle
        } else {
            WeatherState::Success(self.daily_weathers.clone())
        }
    }
}

#[derive(Debug, Default)]
struct TaskSlot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    /// Invalidate and abort whatever runs in this slot.
    fn supersede(&mut self) -> u64 {
        self.generation += 1;
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct Inner {
    cities: Arc<dyn CityRepository>,
    weather: Arc<dyn WeatherRepository>,
    favorites: FavoritesStore,
    settings: ControllerSettings,
    state: watch::Sender<ViewState>,
    series: Mutex<HistoricalSeries>,
    search_slot: Mutex<TaskSlot>,
    fetch_slot: Mutex<TaskSlot>,
    last_search_started: Mutex<Option<Instant>>,
}

#[derive(Debug)]
pub struct WeatherController {
    inner: Arc<Inner>,
}

impl WeatherController {
    pub fn new(
        cities: Arc<dyn CityRepository>,
        weather: Arc<dyn WeatherRepository>,
        favorites: FavoritesStore,
        settings: ControllerSettings,
    ) -> Self {
        let (state, _) = watch::channel(ViewState {
            temperature_unit: settings.default_unit,
            temperature_type: settings.default_type,
            ..ViewState::default()
        });

        Self {
            inner: Arc::new(Inner {
                cities,
                weather,
                favorites,
                settings,
                state,
                series: Mutex::new(HistoricalSeries::default()),
                search_slot: Mutex::new(TaskSlot::default()),
                fetch_slot: Mutex::new(TaskSlot::default()),
                last_search_started: Mutex::new(None),
            }),
        }
    }

    /// Wire repositories (network or dev mode) and favorites from configuration.
    pub async fn from_config(
        config: &Config,
        storage: Arc<dyn PreferenceStorage>,
    ) -> anyhow::Result<Self> {
        let cities = city_repository_from_config(config)?;
        let weather = weather_repository_from_config(config)?;
        let favorites = FavoritesStore::open(storage).await;

        Ok(Self::new(cities, weather, favorites, ControllerSettings::from_config(config)))
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.inner.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ViewState {
        self.inner.state.borrow().clone()
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.inner.settings
    }

    /// Schedule a city search, superseding any pending or running one.
    ///
    /// A blank query clears the results immediately. Otherwise the search is
    /// dispatched once [`SEARCH_SPACING`] has passed since the previous
    /// dispatched search started.
    pub fn search_cities(&self, query: &str) {
        let mut slot = lock(&self.inner.search_slot);
        let generation = slot.supersede();

        if query.trim().is_empty() {
            self.inner.state.send_modify(|s| {
                s.search_results.clear();
                s.is_searching_city = false;
            });
            return;
        }

        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        slot.handle = Some(tokio::spawn(async move { inner.run_search(generation, query).await }));
    }

    pub fn clear_search_results(&self) {
        lock(&self.inner.search_slot).supersede();
        self.inner.state.send_modify(|s| {
            s.search_results.clear();
            s.is_searching_city = false;
        });
    }

    /// Select a city and start fetching its history.
    ///
    /// Returns false without doing anything if it is already the current city.
    pub fn set_current_city(&self, city: City) -> bool {
        let mut slot = lock(&self.inner.fetch_slot);

        let unchanged = self.inner.state.borrow().current_city.as_ref() == Some(&city);
        if unchanged {
            return false;
        }

        let generation = slot.supersede();
        let city = city.with_favorite(self.inner.favorites.is_favorite(&city));
        self.inner.state.send_modify(|s| {
            s.current_city = Some(city.clone());
            s.is_fetching_weather = true;
        });

        let inner = Arc::clone(&self.inner);
        slot.handle = Some(tokio::spawn(async move { inner.run_fetch(generation, city).await }));
        true
    }

    /// Entry point for a geolocated city; same semantics as [`Self::set_current_city`].
    pub fn set_initial_city(&self, city: City) -> bool {
        self.set_current_city(city)
    }

    /// Make `city` current and fetch its history in the caller's task.
    ///
    /// Supersedes any background fetch, even for the same city, so this also
    /// serves as a refresh. Failures only show up in the state flags.
    pub async fn fetch_historical_daily_weathers(&self, city: &City) {
        let generation = {
            let mut slot = lock(&self.inner.fetch_slot);
            let generation = slot.supersede();
            let city = city.with_favorite(self.inner.favorites.is_favorite(city));
            self.inner.state.send_modify(|s| s.current_city = Some(city));
            generation
        };
        self.inner.run_fetch(generation, city.clone()).await;
    }

    pub fn set_temperature_unit(&self, unit: TemperatureUnit) {
        let series = lock(&self.inner.series);
        self.inner.state.send_if_modified(|s| {
            if s.temperature_unit == unit {
                return false;
            }
            s.temperature_unit = unit;
            s.processed_temperatures = series.display(s.temperature_type, unit);
            true
        });
    }

    pub fn set_temperature_to_display(&self, kind: TemperatureType) {
        let series = lock(&self.inner.series);
        self.inner.state.send_if_modified(|s| {
            if s.temperature_type == kind {
                return false;
            }
            s.temperature_type = kind;
            s.processed_temperatures = series.display(kind, s.temperature_unit);
            true
        });
    }

    pub fn favorites(&self) -> Vec<City> {
        self.inner.favorites.list()
    }

    pub fn observe_favorites(&self) -> watch::Receiver<Vec<City>> {
        self.inner.favorites.observe()
    }

    pub fn is_favorite(&self, city: &City) -> bool {
        self.inner.favorites.is_favorite(city)
    }

    /// Add or remove `city` from favorites. Returns whether it is now a favorite.
    pub async fn toggle_favorite(&self, city: &City) -> Result<bool, FavoritesError> {
        let now_favorite = self.inner.favorites.toggle(city).await;
        self.inner.sync_favorite_flags();
        now_favorite
    }

    pub async fn reorder_favorites(&self, from: usize, to: usize) -> Result<bool, FavoritesError> {
        self.inner.favorites.reorder(from, to).await
    }

    pub async fn clear_favorites(&self) -> Result<(), FavoritesError> {
        let cleared = self.inner.favorites.clear().await;
        self.inner.sync_favorite_flags();
        cleared
    }
}

impl Drop for WeatherController {
    fn drop(&mut self) {
        lock(&self.inner.search_slot).supersede();
        lock(&self.inner.fetch_slot).supersede();
    }
}

impl Inner {
    /// Re-derive the favorite flag on every city held in the view state.
    fn sync_favorite_flags(&self) {
        self.state.send_if_modified(|s| {
            let mut changed = false;
            for city in s.current_city.iter_mut().chain(s.search_results.iter_mut()) {
                let is_favorite = self.favorites.is_favorite(city);
                if city.is_favorite != is_favorite {
                    city.is_favorite = is_favorite;
                    changed = true;
                }
            }
            changed
        });
    }

    async fn run_search(&self, generation: u64, query: String) {
        let last_started = *lock(&self.last_search_started);
        let wait = last_started
            .map(|started| SEARCH_SPACING.saturating_sub(started.elapsed()))
            .unwrap_or_default();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        {
            let slot = lock(&self.search_slot);
            if !slot.is_current(generation) {
                return;
            }
            *lock(&self.last_search_started) = Some(Instant::now());
            self.state.send_modify(|s| s.is_searching_city = true);
        }

        debug!("Dispatching city search for '{query}'");
        let result = self
            .cities
            .search(&query, self.settings.search_limit, self.settings.country_codes.as_deref())
            .await;

        let slot = lock(&self.search_slot);
        if !slot.is_current(generation) {
            return;
        }

        match result {
            Ok(cities) => {
                let cities: Vec<City> = cities
                    .into_iter()
                    .map(|c| {
                        let is_favorite = self.favorites.is_favorite(&c);
                        c.with_favorite(is_favorite)
                    })
                    .collect();
                self.state.send_modify(|s| {
                    s.search_results = cities;
                    s.is_error_searching_city = false;
                    s.is_searching_city = false;
                    s.searches_completed += 1;
                });
            }
            Err(err) => {
                warn!("City search for '{query}' failed: {err}");
                self.state.send_modify(|s| {
                    s.is_error_searching_city = true;
                    s.is_searching_city = false;
                    s.searches_completed += 1;
                });
            }
        }
    }

    async fn run_fetch(&self, generation: u64, city: City) {
        {
            let slot = lock(&self.fetch_slot);
            if !slot.is_current(generation) {
                return;
            }
            self.state.send_modify(|s| s.is_fetching_weather = true);
        }

        let today: NaiveDate = Local::now().date_naive();
        debug!(
            "Fetching {} years of history for '{}' ({}, {})",
            self.settings.years_to_fetch, city.name, city.lat, city.lon
        );
        let result = self
            .weather
            .get_historical_daily_weathers(
                city.lat,
                city.lon,
                today,
                self.settings.years_to_fetch,
                &self.settings.request,
            )
            .await;

        let slot = lock(&self.fetch_slot);
        if !slot.is_current(generation) {
            return;
        }

        match result {
            Ok(mut daily) => {
                daily.sort_by_key(|d| d.date);
                let fetched = HistoricalSeries::from_daily(&daily);

                let mut series = lock(&self.series);
                self.state.send_modify(|s| {
                    s.years = fetched.years.clone();
                    s.processed_temperatures =
                        fetched.display(s.temperature_type, s.temperature_unit);
                    s.daily_weathers = daily;
                    s.is_error_fetching_weather = false;
                    s.last_error = None;
                    s.is_fetching_weather = false;
                    s.fetches_completed += 1;
                });
                *series = fetched;
            }
            Err(err) => {
                warn!("Weather fetch for '{}' failed: {err}", city.name);
                self.state.send_modify(|s| {
                    s.is_error_fetching_weather = true;
                    s.last_error = Some(err.to_string());
                    s.is_fetching_weather = false;
                    s.fetches_completed += 1;
                });
            }
        }
    }
}
