use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, warn};
use reqwest::Client;

use crate::{
    dto::DailyWeatherDto,
    error::{RepositoryError, truncate_body},
    model::DailyWeather,
};

use super::{RequestOptions, WeatherRepository};

const SERVICE: &str = "OpenWeather";
const DAY_SUMMARY_PATH: &str = "/data/3.0/onecall/day_summary";

/// One Call 3.0 `day_summary` client.
#[derive(Debug, Clone)]
pub struct OpenWeatherRepository {
    base_url: String,
    http: Client,
}

impl OpenWeatherRepository {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), http: Client::new() }
    }

    fn query(
        lat: f64,
        lon: f64,
        date: NaiveDate,
        options: &RequestOptions,
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("date", date.format("%Y-%m-%d").to_string()),
            ("appid", options.api_key.clone()),
        ];
        if let Some(units) = &options.units {
            query.push(("units", units.clone()));
        }
        if let Some(lang) = &options.lang {
            query.push(("lang", lang.clone()));
        }
        query
    }
}

#[async_trait]
impl WeatherRepository for OpenWeatherRepository {
    async fn get_daily_weather(
        &self,
        lat: f64,
        lon: f64,
        date: NaiveDate,
        options: &RequestOptions,
    ) -> Result<DailyWeather, RepositoryError> {
        let url = format!("{}{}", self.base_url, DAY_SUMMARY_PATH);
        debug!("Requesting day summary for ({lat}, {lon}) on {date}");

        let res = self
            .http
            .get(&url)
            .query(&Self::query(lat, lon, date, options))
            .send()
            .await
            .map_err(|source| RepositoryError::transport(SERVICE, source))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| RepositoryError::transport(SERVICE, source))?;

        if !status.is_success() {
            warn!("{SERVICE} day summary for {date} failed with status {status}");
            return Err(RepositoryError::Http {
                service: SERVICE,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: DailyWeatherDto = serde_json::from_str(&body)
            .map_err(|source| RepositoryError::Decode { service: SERVICE, source })?;

        DailyWeather::try_from(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_includes_optional_parameters_only_when_set() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let options = RequestOptions::new("KEY");

        let query = OpenWeatherRepository::query(48.5, 2.25, date, &options);
        assert_eq!(
            query,
            vec![
                ("lat", "48.5".to_string()),
                ("lon", "2.25".to_string()),
                ("date", "2024-03-05".to_string()),
                ("appid", "KEY".to_string()),
            ]
        );

        let options = RequestOptions {
            units: Some("metric".into()),
            lang: Some("fr".into()),
            ..RequestOptions::new("KEY")
        };
        let query = OpenWeatherRepository::query(48.5, 2.25, date, &options);
        assert!(query.contains(&("units", "metric".to_string())));
        assert!(query.contains(&("lang", "fr".to_string())));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let repo = OpenWeatherRepository::new("https://api.openweathermap.org/");
        assert_eq!(repo.base_url, "https://api.openweathermap.org");
    }

    #[tokio::test]
    async fn malformed_base_url_is_unknown_error() {
        let repo = OpenWeatherRepository::new("not a url");
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        let err = repo.get_daily_weather(1.0, 2.0, date, &RequestOptions::new("KEY")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Unknown(_)));
    }
}
