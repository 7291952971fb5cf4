//! Ordered, persisted list of favorite cities.
//!
//! Favorites live under a single preference key as a JSON array of flat
//! `{name, lat, lon}` records. Reads never fail: a missing key is an empty list
//! and a malformed payload or unreadable storage degrades to one as well.
//! Every mutation persists the full list before publishing it to observers.

use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

use crate::{error::FavoritesError, model::City, storage::PreferenceStorage};

pub const FAVORITES_KEY: &str = "favorite_cities";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCity {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

impl From<&City> for StoredCity {
    fn from(city: &City) -> Self {
        Self {
            name: city.name.clone(),
            lat: city.lat,
            lon: city.lon,
            display_name: None,
            country: None,
            state: None,
        }
    }
}

impl From<StoredCity> for City {
    fn from(stored: StoredCity) -> Self {
        City::new(stored.name, stored.lat, stored.lon).with_favorite(true)
    }
}

/// Decode a persisted payload; anything malformed is an empty list.
pub fn decode_favorites(payload: &str) -> Vec<City> {
    match serde_json::from_str::<Vec<StoredCity>>(payload) {
        Ok(stored) => stored.into_iter().map(City::from).collect(),
        Err(err) => {
            warn!("Ignoring malformed favorites payload: {err}");
            Vec::new()
        }
    }
}

pub fn encode_favorites(cities: &[City]) -> Result<String, serde_json::Error> {
    let stored: Vec<StoredCity> = cities.iter().map(StoredCity::from).collect();
    serde_json::to_string(&stored)
}

#[derive(Debug)]
pub struct FavoritesStore {
    storage: Arc<dyn PreferenceStorage>,
    cities: watch::Sender<Vec<City>>,
    // Held across persist + publish so mutations apply in call order.
    write_lock: Mutex<()>,
}

impl FavoritesStore {
    /// Open the store, seeding observers with what storage currently holds.
    pub async fn open(storage: Arc<dyn PreferenceStorage>) -> Self {
        let initial = match storage.get(FAVORITES_KEY).await {
            Ok(Some(payload)) => decode_favorites(&payload),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("Failed to read favorites, starting empty: {err}");
                Vec::new()
            }
        };

        let (cities, _) = watch::channel(initial);
        Self { storage, cities, write_lock: Mutex::new(()) }
    }

    pub fn observe(&self) -> watch::Receiver<Vec<City>> {
        self.cities.subscribe()
    }

    pub fn list(&self) -> Vec<City> {
        self.cities.borrow().clone()
    }

    pub fn is_favorite(&self, city: &City) -> bool {
        self.cities.borrow().contains(city)
    }

    /// Replace the whole list. Repeats by identity keep their first position.
    pub async fn save_all(&self, cities: Vec<City>) -> Result<(), FavoritesError> {
        let _guard = self.write_lock.lock().await;
        let mut unique: Vec<City> = Vec::with_capacity(cities.len());
        for city in cities {
            if !unique.contains(&city) {
                unique.push(city.with_favorite(true));
            }
        }
        self.persist(unique).await
    }

    pub async fn clear(&self) -> Result<(), FavoritesError> {
        let _guard = self.write_lock.lock().await;
        self.storage.remove(FAVORITES_KEY).await?;
        self.cities.send_replace(Vec::new());
        Ok(())
    }

    /// Returns false if the city was already a favorite.
    pub async fn add(&self, city: &City) -> Result<bool, FavoritesError> {
        let _guard = self.write_lock.lock().await;
        let mut cities = self.list();
        if cities.contains(city) {
            return Ok(false);
        }
        cities.push(city.with_favorite(true));
        self.persist(cities).await?;
        Ok(true)
    }

    /// Returns false if the city was not a favorite.
    pub async fn remove(&self, city: &City) -> Result<bool, FavoritesError> {
        let _guard = self.write_lock.lock().await;
        let mut cities = self.list();
        let before = cities.len();
        cities.retain(|c| c != city);
        if cities.len() == before {
            return Ok(false);
        }
        self.persist(cities).await?;
        Ok(true)
    }

    /// Add the city if absent, remove it otherwise. Returns whether it is now a favorite.
    pub async fn toggle(&self, city: &City) -> Result<bool, FavoritesError> {
        let _guard = self.write_lock.lock().await;
        let mut cities = self.list();
        let now_favorite = match cities.iter().position(|c| c == city) {
            Some(index) => {
                cities.remove(index);
                false
            }
            None => {
                cities.push(city.with_favorite(true));
                true
            }
        };
        self.persist(cities).await?;
        Ok(now_favorite)
    }

    /// Move one entry. Returns false, leaving the list untouched, when the
    /// indices are equal or either is out of range.
    pub async fn reorder(&self, from: usize, to: usize) -> Result<bool, FavoritesError> {
        let _guard = self.write_lock.lock().await;
        let mut cities = self.list();
        if from == to || from >= cities.len() || to >= cities.len() {
            return Ok(false);
        }
        let city = cities.remove(from);
        cities.insert(to, city);
        self.persist(cities).await?;
        Ok(true)
    }

    async fn persist(&self, cities: Vec<City>) -> Result<(), FavoritesError> {
        let payload = encode_favorites(&cities)?;
        self.storage.set(FAVORITES_KEY, payload).await?;
        self.cities.send_replace(cities);
        Ok(())
    }
}
