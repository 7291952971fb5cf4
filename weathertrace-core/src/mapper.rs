use chrono::NaiveDate;

use crate::{
    dto::{DailyWeatherDto, PlaceDto},
    error::RepositoryError,
    model::{Afternoon, City, DailyWeather, MaxWind, Temperature, Total, Wind},
};

impl TryFrom<DailyWeatherDto> for DailyWeather {
    type Error = RepositoryError;

    fn try_from(dto: DailyWeatherDto) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(&dto.date, "%Y-%m-%d")
            .map_err(|_| RepositoryError::InvalidDate(dto.date.clone()))?;

        Ok(DailyWeather {
            date,
            cloud_cover: Afternoon { afternoon: dto.cloud_cover.afternoon },
            humidity: Afternoon { afternoon: dto.humidity.afternoon },
            precipitation: Total { total: dto.precipitation.total },
            pressure: Afternoon { afternoon: dto.pressure.afternoon },
            temperature: Temperature {
                min: dto.temperature.min,
                max: dto.temperature.max,
                morning: dto.temperature.morning,
                afternoon: dto.temperature.afternoon,
                evening: dto.temperature.evening,
                night: dto.temperature.night,
            },
            wind: Wind {
                max: MaxWind { speed: dto.wind.max.speed, direction: dto.wind.max.direction },
            },
        })
    }
}

impl From<PlaceDto> for City {
    fn from(dto: PlaceDto) -> Self {
        City::new(
            dto.display_name,
            dto.lat.trim().parse().unwrap_or(0.0),
            dto.lon.trim().parse().unwrap_or(0.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_SUMMARY: &str = r#"{
        "lat": 48.8566,
        "lon": 2.3522,
        "tz": "+02:00",
        "date": "2024-06-01",
        "units": "standard",
        "cloud_cover": {"afternoon": 75.0},
        "humidity": {"afternoon": 66.0},
        "precipitation": {"total": 2.5},
        "temperature": {
            "min": 286.48, "max": 299.24, "afternoon": 296.15,
            "night": 289.56, "evening": 295.93, "morning": 287.59
        },
        "pressure": {"afternoon": 1015.0},
        "wind": {"max": {"speed": 8.7, "direction": 120.0}},
        "extra": "ignored"
    }"#;

    #[test]
    fn maps_day_summary() {
        let dto: DailyWeatherDto = serde_json::from_str(DAY_SUMMARY).unwrap();
        let day = DailyWeather::try_from(dto).unwrap();

        assert_eq!(day.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(day.temperature.min, 286.48);
        assert_eq!(day.temperature.max, 299.24);
        assert_eq!(day.temperature.morning, 287.59);
        assert_eq!(day.precipitation.total, 2.5);
        assert_eq!(day.wind.max.direction, 120.0);
    }

    #[test]
    fn rejects_unparsable_date() {
        let body = DAY_SUMMARY.replace("2024-06-01", "yesterday");
        let dto: DailyWeatherDto = serde_json::from_str(&body).unwrap();
        let err = DailyWeather::try_from(dto).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidDate(ref d) if d == "yesterday"));
    }

    #[test]
    fn place_coordinates_default_to_zero() {
        let places: Vec<PlaceDto> = serde_json::from_str(
            r#"[
                {"display_name": "Paris, France", "lat": "48.8566", "lon": "2.3522", "type": "city"},
                {"display_name": "Nowhere", "lat": "n/a", "lon": ""}
            ]"#,
        )
        .unwrap();

        let cities: Vec<City> = places.into_iter().map(City::from).collect();
        assert_eq!(cities[0], City::new("Paris, France", 48.8566, 2.3522));
        assert_eq!(cities[1].lat, 0.0);
        assert_eq!(cities[1].lon, 0.0);
        assert!(!cities[1].is_favorite);
    }
}
