use crate::{
    Config,
    error::RepositoryError,
    model::{City, DailyWeather},
    repository::{
        mock::{MockCityRepository, MockWeatherRepository},
        nominatim::NominatimCityRepository,
        openweather::OpenWeatherRepository,
    },
};
use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use std::{fmt::Debug, sync::Arc};

pub mod mock;
pub mod nominatim;
pub mod openweather;

/// Per-request parameters forwarded to the weather endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub api_key: String,
    /// `standard` (Kelvin) when absent.
    pub units: Option<String>,
    pub lang: Option<String>,
}

impl RequestOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), ..Self::default() }
    }
}

#[async_trait]
pub trait CityRepository: Send + Sync + Debug {
    /// Look up places matching `query`. A blank query yields no results.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        country_codes: Option<&str>,
    ) -> Result<Vec<City>, RepositoryError>;
}

#[async_trait]
pub trait WeatherRepository: Send + Sync + Debug {
    async fn get_daily_weather(
        &self,
        lat: f64,
        lon: f64,
        date: NaiveDate,
        options: &RequestOptions,
    ) -> Result<DailyWeather, RepositoryError>;

    /// One summary per year back from `base_date`, `base_date` first.
    ///
    /// Requests run concurrently; the result keeps request order.
    async fn get_historical_daily_weathers(
        &self,
        lat: f64,
        lon: f64,
        base_date: NaiveDate,
        years: u32,
        options: &RequestOptions,
    ) -> Result<Vec<DailyWeather>, RepositoryError> {
        let requests = years_back(base_date, years)
            .into_iter()
            .map(|date| self.get_daily_weather(lat, lon, date, options));

        futures::future::try_join_all(requests).await
    }
}

/// Same calendar day in each of the `count` years ending at `base`.
///
/// Feb 29 maps to Feb 28 in non-leap years.
pub fn years_back(base: NaiveDate, count: u32) -> Vec<NaiveDate> {
    (0..count).filter_map(|i| base.checked_sub_months(Months::new(12 * i))).collect()
}

pub fn city_repository_from_config(config: &Config) -> anyhow::Result<Arc<dyn CityRepository>> {
    if config.dev_mode {
        return Ok(Arc::new(MockCityRepository::new()));
    }

    let email = config.contact_email.as_deref().ok_or_else(|| {
        anyhow::anyhow!(
            "No contact email configured for the geocoding service.\n\
             Hint: run `weathertrace configure` or pass --dev-mode."
        )
    })?;

    Ok(Arc::new(NominatimCityRepository::new(&config.geocoding_base_url, email)?))
}

pub fn weather_repository_from_config(
    config: &Config,
) -> anyhow::Result<Arc<dyn WeatherRepository>> {
    if config.dev_mode {
        return Ok(Arc::new(MockWeatherRepository::new()));
    }

    if config.api_key.is_none() {
        return Err(anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
             Hint: run `weathertrace configure` and enter your API key, or pass --dev-mode."
        ));
    }

    Ok(Arc::new(OpenWeatherRepository::new(&config.weather_base_url)))
}
