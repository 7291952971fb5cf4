use anyhow::Context;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{
    Client,
    header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue},
};

use crate::{
    dto::PlaceDto,
    error::{RepositoryError, truncate_body},
    model::City,
};

use super::CityRepository;

const SERVICE: &str = "Nominatim";

/// OpenStreetMap geocoding client.
///
/// Nominatim's usage policy requires an identifying User-Agent with contact details.
#[derive(Debug, Clone)]
pub struct NominatimCityRepository {
    base_url: String,
    http: Client,
}

pub fn user_agent(contact_email: &str) -> String {
    format!("WeatherTraceApp/1.0 ({contact_email})")
}

impl NominatimCityRepository {
    pub fn new(base_url: &str, contact_email: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));

        let http = Client::builder()
            .user_agent(user_agent(contact_email))
            .default_headers(headers)
            .build()
            .context("Failed to build geocoding HTTP client")?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http })
    }
}

#[async_trait]
impl CityRepository for NominatimCityRepository {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        country_codes: Option<&str>,
    ) -> Result<Vec<City>, RepositoryError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/search", self.base_url);
        debug!("Searching cities for '{query}' (limit {limit})");

        let mut params = vec![
            ("format", "json".to_string()),
            ("q", query.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(codes) = country_codes {
            params.push(("countrycodes", codes.to_string()));
        }

        let res = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|source| RepositoryError::transport(SERVICE, source))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| RepositoryError::transport(SERVICE, source))?;

        if !status.is_success() {
            warn!("{SERVICE} search for '{query}' failed with status {status}");
            return Err(RepositoryError::Http {
                service: SERVICE,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let places: Vec<PlaceDto> = serde_json::from_str(&body)
            .map_err(|source| RepositoryError::Decode { service: SERVICE, source })?;

        Ok(places.into_iter().map(City::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_carries_contact() {
        assert_eq!(user_agent("me@example.com"), "WeatherTraceApp/1.0 (me@example.com)");
    }

    #[tokio::test]
    async fn blank_query_skips_network() {
        // Port 9 is discard; a request would fail with a connectivity error.
        let repo = NominatimCityRepository::new("http://127.0.0.1:9", "me@example.com").unwrap();
        let cities = repo.search("   ", 5, None).await.unwrap();
        assert!(cities.is_empty());
    }
}
