use weathertrace_core::{City, DailyWeather, TemperatureType, TemperatureUnit, ViewState};

const BAR_WIDTH: usize = 40;

pub fn print_cities(cities: &[City]) {
    if cities.is_empty() {
        println!("No cities.");
        return;
    }
    for (i, city) in cities.iter().enumerate() {
        println!("{}", city_line(i + 1, city));
    }
}

pub fn city_line(position: usize, city: &City) -> String {
    let star = if city.is_favorite { "★" } else { " " };
    format!("{position:>2}. {star} {} ({:.4}, {:.4})", city.name, city.lat, city.lon)
}

/// Bar lengths proportional to each value's place between the series extremes.
///
/// The smallest value still gets one cell so every year stays visible.
pub fn bar_lengths(values: &[f64], width: usize) -> Vec<usize> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    values
        .iter()
        .map(|v| {
            if span <= f64::EPSILON {
                width
            } else {
                1 + (((v - min) / span) * (width - 1) as f64).round() as usize
            }
        })
        .collect()
}

pub fn print_trend(state: &ViewState) {
    let Some(city) = &state.current_city else {
        println!("No city selected.");
        return;
    };

    let kind = match state.temperature_type {
        TemperatureType::Min => "Minimum",
        TemperatureType::Max => "Maximum",
    };
    let star = if city.is_favorite { " ★" } else { "" };
    println!("{}{star}", city.name);
    println!("{kind} temperature on this day, by year ({})", state.temperature_unit);

    if state.processed_temperatures.is_empty() {
        println!("No data.");
        return;
    }

    let bars = bar_lengths(&state.processed_temperatures, BAR_WIDTH);
    for ((year, temp), len) in state.years.iter().zip(&state.processed_temperatures).zip(bars) {
        println!("{year}  {temp:>7.1}  {}", "█".repeat(len));
    }

    if let Some(latest) = state.daily_weathers.last() {
        println!();
        println!("{}", day_summary(latest, state.temperature_unit));
    }
}

pub fn day_summary(day: &DailyWeather, unit: TemperatureUnit) -> String {
    let t = &day.temperature;
    let temp = |k: f64| format!("{:.1}{}", unit.convert(k), unit);
    format!(
        "{date}: min {min}, max {max} (morning {morning}, afternoon {afternoon}, evening {evening}, night {night})\n\
         humidity {humidity:.0}%, cloud cover {clouds:.0}%, precipitation {rain:.1} mm, \
         pressure {pressure:.0} hPa, wind up to {wind:.1} m/s from {dir:.0}°",
        date = day.date,
        min = temp(t.min),
        max = temp(t.max),
        morning = temp(t.morning),
        afternoon = temp(t.afternoon),
        evening = temp(t.evening),
        night = temp(t.night),
        humidity = day.humidity.afternoon,
        clouds = day.cloud_cover.afternoon,
        rain = day.precipitation.total,
        pressure = day.pressure.afternoon,
        wind = day.wind.max.speed,
        dir = day.wind.max.direction,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_span_from_one_to_width() {
        let bars = bar_lengths(&[10.0, 20.0, 15.0], 41);
        assert_eq!(bars, vec![1, 41, 21]);
    }

    #[test]
    fn flat_series_fills_width() {
        assert_eq!(bar_lengths(&[3.0, 3.0], 10), vec![10, 10]);
        assert!(bar_lengths(&[], 10).is_empty());
    }

    #[test]
    fn city_line_marks_favorites() {
        let city = City::new("Paris, France", 48.8566, 2.3522).with_favorite(true);
        assert_eq!(city_line(1, &city), " 1. ★ Paris, France (48.8566, 2.3522)");
    }
}
