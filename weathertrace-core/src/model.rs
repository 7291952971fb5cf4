use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Offset between Kelvin and Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// A place the user can look weather up for.
///
/// Two cities are equal when their `(name, lat, lon)` identity tuple matches;
/// the favorite flag is presentation state and does not take part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub is_favorite: bool,
}

impl City {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self { name: name.into(), lat, lon, is_favorite: false }
    }

    /// Copy of this city with the favorite flag replaced.
    pub fn with_favorite(&self, is_favorite: bool) -> Self {
        Self { is_favorite, ..self.clone() }
    }
}

impl PartialEq for City {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.lat == other.lat && self.lon == other.lon
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Afternoon<T> {
    pub afternoon: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Total<T> {
    pub total: T,
}

/// Daily temperature aggregate, in Kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub min: f64,
    pub max: f64,
    pub morning: f64,
    pub afternoon: f64,
    pub evening: f64,
    pub night: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxWind {
    pub speed: f64,
    /// Degrees.
    pub direction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub max: MaxWind,
}

/// Summary of one day at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub date: NaiveDate,
    pub cloud_cover: Afternoon<f64>,
    pub humidity: Afternoon<f64>,
    pub precipitation: Total<f64>,
    pub pressure: Afternoon<f64>,
    pub temperature: Temperature,
    pub wind: Wind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[serde(alias = "C", alias = "c")]
    Celsius,
    #[default]
    #[serde(alias = "F", alias = "f")]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    pub fn convert(&self, kelvin: f64) -> f64 {
        let celsius = kelvin - KELVIN_OFFSET;
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn convert_all(&self, kelvins: &[f64]) -> Vec<f64> {
        kelvins.iter().map(|k| self.convert(*k)).collect()
    }
}

impl std::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl TryFrom<&str> for TemperatureUnit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(anyhow::anyhow!("Unknown temperature unit '{value}'. Use 'c' or 'f'.")),
        }
    }
}

/// Which daily extreme the trend shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureType {
    Min,
    #[default]
    Max,
}

impl TryFrom<&str> for TemperatureType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "min" => Ok(TemperatureType::Min),
            "max" => Ok(TemperatureType::Max),
            _ => Err(anyhow::anyhow!("Unknown temperature type '{value}'. Use 'min' or 'max'.")),
        }
    }
}

/// Per-year extremes extracted from a batch of daily summaries, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalSeries {
    pub years: Vec<i32>,
    pub max_kelvin: Vec<f64>,
    pub min_kelvin: Vec<f64>,
}

impl HistoricalSeries {
    pub fn from_daily(daily: &[DailyWeather]) -> Self {
        let mut sorted: Vec<&DailyWeather> = daily.iter().collect();
        sorted.sort_by_key(|d| d.date);

        Self {
            years: sorted.iter().map(|d| d.date.year()).collect(),
            max_kelvin: sorted.iter().map(|d| d.temperature.max).collect(),
            min_kelvin: sorted.iter().map(|d| d.temperature.min).collect(),
        }
    }

    pub fn kelvin_for(&self, kind: TemperatureType) -> &[f64] {
        match kind {
            TemperatureType::Min => &self.min_kelvin,
            TemperatureType::Max => &self.max_kelvin,
        }
    }

    /// The series shown to the user for a given selection.
    pub fn display(&self, kind: TemperatureType, unit: TemperatureUnit) -> Vec<f64> {
        unit.convert_all(self.kelvin_for(kind))
    }
}

#[cfg(test)]
pub(crate) fn sample_day(date: NaiveDate, min: f64, max: f64) -> DailyWeather {
    DailyWeather {
        date,
        cloud_cover: Afternoon { afternoon: 40.0 },
        humidity: Afternoon { afternoon: 60.0 },
        precipitation: Total { total: 1.5 },
        pressure: Afternoon { afternoon: 1013.0 },
        temperature: Temperature {
            min,
            max,
            morning: min,
            afternoon: max,
            evening: max,
            night: min,
        },
        wind: Wind { max: MaxWind { speed: 4.0, direction: 180.0 } },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn converts_kelvin_to_celsius_and_fahrenheit() {
        assert!(approx(TemperatureUnit::Celsius.convert(273.15), 0.0));
        assert!(approx(TemperatureUnit::Fahrenheit.convert(273.15), 32.0));
        assert!(approx(TemperatureUnit::Celsius.convert(300.0), 26.85));
        assert!(approx(TemperatureUnit::Fahrenheit.convert(373.15), 212.0));
    }

    #[test]
    fn convert_all_preserves_order() {
        let kelvins = [300.0, 250.0, 273.15];
        let converted = TemperatureUnit::Celsius.convert_all(&kelvins);

        assert_eq!(converted.len(), 3);
        for (k, c) in kelvins.iter().zip(&converted) {
            assert!(approx(*c, k - KELVIN_OFFSET));
        }
    }

    #[test]
    fn city_equality_ignores_favorite_flag() {
        let paris = City::new("Paris, France", 48.8566, 2.3522);
        assert_eq!(paris, paris.with_favorite(true));
        assert_ne!(paris, City::new("Paris, France", 48.8566, 2.3523));
        assert_ne!(paris, City::new("Paris, Texas", 48.8566, 2.3522));
    }

    #[test]
    fn with_favorite_copies_the_city() {
        let city = City::new("Lyon", 45.76, 4.83);
        let fav = city.with_favorite(true);
        assert!(!city.is_favorite);
        assert!(fav.is_favorite);
    }

    #[test]
    fn series_is_sorted_by_date() {
        let d = |y| NaiveDate::from_ymd_opt(y, 6, 1).unwrap();
        let daily = vec![
            sample_day(d(2024), 280.0, 290.0),
            sample_day(d(2022), 270.0, 285.0),
            sample_day(d(2023), 275.0, 288.0),
        ];

        let series = HistoricalSeries::from_daily(&daily);
        assert_eq!(series.years, vec![2022, 2023, 2024]);
        assert_eq!(series.max_kelvin, vec![285.0, 288.0, 290.0]);
        assert_eq!(series.min_kelvin, vec![270.0, 275.0, 280.0]);
    }

    #[test]
    fn unit_and_type_parse() {
        assert_eq!(TemperatureUnit::try_from("C").unwrap(), TemperatureUnit::Celsius);
        assert_eq!(TemperatureUnit::try_from("fahrenheit").unwrap(), TemperatureUnit::Fahrenheit);
        assert!(TemperatureUnit::try_from("kelvin").is_err());
        assert_eq!(TemperatureType::try_from("MIN").unwrap(), TemperatureType::Min);
    }
}
