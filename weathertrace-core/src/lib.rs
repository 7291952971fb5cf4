//! Core library for the `weathertrace` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - City search and historical weather repositories (network and dev mode)
//! - Persisted favorites
//! - The request-lifecycle controller front ends drive
//!
//! It is used by `weathertrace-cli`, but can also be reused by other front ends.

pub mod config;
pub mod controller;
pub mod dto;
pub mod error;
pub mod favorites;
pub mod mapper;
pub mod model;
pub mod repository;
pub mod storage;

pub use config::Config;
pub use controller::{ControllerSettings, ViewState, WeatherController, WeatherState};
pub use error::{FavoritesError, RepositoryError, StorageError};
pub use favorites::FavoritesStore;
pub use model::{City, DailyWeather, HistoricalSeries, TemperatureType, TemperatureUnit};
pub use repository::{CityRepository, RequestOptions, WeatherRepository};
pub use storage::{FilePreferences, MemoryPreferences, PreferenceStorage};
