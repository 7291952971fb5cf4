//! Offline repositories used in dev mode, so the client works without network or API key.

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::Rng;

use crate::{
    error::RepositoryError,
    model::{Afternoon, City, DailyWeather, KELVIN_OFFSET, MaxWind, Temperature, Total, Wind},
};

use super::{CityRepository, RequestOptions, WeatherRepository};

const GAZETTEER: &[(&str, f64, f64)] = &[
    ("Paris, Île-de-France, France", 48.8566, 2.3522),
    ("Lyon, Auvergne-Rhône-Alpes, France", 45.7640, 4.8357),
    ("London, England, United Kingdom", 51.5074, -0.1278),
    ("Berlin, Germany", 52.5200, 13.4050),
    ("Madrid, Community of Madrid, Spain", 40.4168, -3.7038),
    ("Rome, Lazio, Italy", 41.9028, 12.4964),
    ("New York, United States", 40.7128, -74.0060),
    ("Montreal, Quebec, Canada", 45.5019, -73.5674),
    ("Tokyo, Japan", 35.6762, 139.6503),
    ("Sydney, New South Wales, Australia", -33.8688, 151.2093),
];

#[derive(Debug, Clone, Default)]
pub struct MockCityRepository;

impl MockCityRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CityRepository for MockCityRepository {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        _country_codes: Option<&str>,
    ) -> Result<Vec<City>, RepositoryError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        Ok(GAZETTEER
            .iter()
            .filter(|(name, _, _)| name.to_lowercase().contains(&needle))
            .take(limit)
            .map(|(name, lat, lon)| City::new(*name, *lat, *lon))
            .collect())
    }
}

/// Produces plausible random day summaries; only the shape is fixed.
#[derive(Debug, Clone, Default)]
pub struct MockWeatherRepository;

impl MockWeatherRepository {
    pub fn new() -> Self {
        Self
    }
}

fn random_day(date: NaiveDate) -> DailyWeather {
    let mut rng = rand::thread_rng();

    let min = rng.gen_range(-5.0..20.0) + KELVIN_OFFSET;
    let max = rng.gen_range(min + 1.0..min + 15.0);

    DailyWeather {
        date,
        cloud_cover: Afternoon { afternoon: rng.gen_range(0.0..100.0) },
        humidity: Afternoon { afternoon: rng.gen_range(20.0..100.0) },
        precipitation: Total { total: rng.gen_range(0.0..50.0) },
        pressure: Afternoon { afternoon: rng.gen_range(980.0..1050.0) },
        temperature: Temperature {
            min,
            max,
            morning: rng.gen_range(min..max),
            afternoon: rng.gen_range(min..max),
            evening: rng.gen_range(min..max),
            night: rng.gen_range(min..max),
        },
        wind: Wind {
            max: MaxWind {
                speed: rng.gen_range(0.0..25.0),
                direction: rng.gen_range(0.0..360.0),
            },
        },
    }
}

#[async_trait]
impl WeatherRepository for MockWeatherRepository {
    async fn get_daily_weather(
        &self,
        _lat: f64,
        _lon: f64,
        date: NaiveDate,
        _options: &RequestOptions,
    ) -> Result<DailyWeather, RepositoryError> {
        Ok(random_day(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[tokio::test]
    async fn mock_search_filters_and_limits() {
        let repo = MockCityRepository::new();

        let cities = repo.search("par", 5, None).await.unwrap();
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].name, "Paris, Île-de-France, France");

        let limited = repo.search("a", 2, None).await.unwrap();
        assert_eq!(limited.len(), 2);

        assert!(repo.search("  ", 5, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mock_history_has_one_entry_per_year_in_request_order() {
        let repo = MockWeatherRepository::new();
        let base = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();

        let days = repo
            .get_historical_daily_weathers(0.0, 0.0, base, 4, &RequestOptions::default())
            .await
            .unwrap();

        let years: Vec<i32> = days.iter().map(|d| d.date.year()).collect();
        assert_eq!(years, vec![2025, 2024, 2023, 2022]);
        assert!(days.iter().all(|d| d.date.month() == 7 && d.date.day() == 14));
    }

    #[test]
    fn mock_day_values_stay_in_range() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        for _ in 0..200 {
            let day = random_day(date);
            let t = day.temperature;

            assert!((268.15..293.15).contains(&t.min));
            assert!(t.max >= t.min + 1.0 && t.max < t.min + 15.0);
            for v in [t.morning, t.afternoon, t.evening, t.night] {
                assert!(v >= t.min && v <= t.max);
            }
            assert!((20.0..100.0).contains(&day.humidity.afternoon));
            assert!((980.0..1050.0).contains(&day.pressure.afternoon));
            assert!((0.0..360.0).contains(&day.wind.max.direction));
        }
    }
}
