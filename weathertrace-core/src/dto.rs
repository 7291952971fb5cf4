//! Wire-shaped records returned by the weather and geocoding endpoints.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AfternoonDto<T> {
    pub afternoon: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TotalDto<T> {
    pub total: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemperatureDto {
    pub min: f64,
    pub max: f64,
    pub afternoon: f64,
    pub night: f64,
    pub evening: f64,
    pub morning: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaxWindDto {
    pub speed: f64,
    pub direction: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindDto {
    pub max: MaxWindDto,
}

/// `GET /data/3.0/onecall/day_summary` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyWeatherDto {
    pub lat: f64,
    pub lon: f64,
    pub tz: String,
    pub date: String,
    pub units: String,
    pub cloud_cover: AfternoonDto<f64>,
    pub humidity: AfternoonDto<f64>,
    pub precipitation: TotalDto<f64>,
    pub pressure: AfternoonDto<f64>,
    pub temperature: TemperatureDto,
    pub wind: WindDto,
}

/// One element of the Nominatim `/search?format=json` array.
///
/// Coordinates arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceDto {
    pub display_name: String,
    pub lat: String,
    pub lon: String,
}
