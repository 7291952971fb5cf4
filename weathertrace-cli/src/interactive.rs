use inquire::{Select, Text};
use std::fmt;
use weathertrace_core::{City, TemperatureType, TemperatureUnit, WeatherController};

use crate::{cli, render};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Search,
    Favorites,
    ToggleFavorite,
    SwitchUnit,
    SwitchType,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Search => "Search a city",
            Action::Favorites => "Open a favorite",
            Action::ToggleFavorite => "Add/remove current city from favorites",
            Action::SwitchUnit => "Switch °C/°F",
            Action::SwitchType => "Switch min/max",
            Action::Quit => "Quit",
        })
    }
}

struct Choice(City);

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let star = if self.0.is_favorite { "★ " } else { "" };
        write!(f, "{star}{}", self.0.name)
    }
}

fn pick(prompt: &str, cities: Vec<City>) -> anyhow::Result<Option<City>> {
    if cities.is_empty() {
        println!("No cities.");
        return Ok(None);
    }
    let choices = cities.into_iter().map(Choice).collect();
    Ok(Select::new(prompt, choices).prompt_skippable()?.map(|c| c.0))
}

async fn open(ctl: &WeatherController, city: City) -> anyhow::Result<()> {
    match cli::show_city(ctl, city).await {
        Ok(state) => render::print_trend(&state),
        Err(err) => println!("{err}"),
    }
    Ok(())
}

pub async fn run(ctl: &WeatherController) -> anyhow::Result<()> {
    let actions = vec![
        Action::Search,
        Action::Favorites,
        Action::ToggleFavorite,
        Action::SwitchUnit,
        Action::SwitchType,
        Action::Quit,
    ];

    loop {
        let Some(action) = Select::new("What next?", actions.clone()).prompt_skippable()? else {
            return Ok(());
        };

        match action {
            Action::Search => {
                let query = Text::new("City:").prompt()?;
                let cities = match cli::search(ctl, &query).await {
                    Ok(cities) => cities,
                    Err(err) => {
                        println!("{err}");
                        continue;
                    }
                };
                if let Some(city) = pick("Pick a city:", cities)? {
                    open(ctl, city).await?;
                }
            }
            Action::Favorites => {
                if let Some(city) = pick("Favorites:", ctl.favorites())? {
                    open(ctl, city).await?;
                }
            }
            Action::ToggleFavorite => match ctl.state().current_city {
                Some(city) => {
                    let now = ctl.toggle_favorite(&city).await?;
                    println!("{} {}", city.name, if now { "added to favorites" } else { "removed from favorites" });
                }
                None => println!("No city selected."),
            },
            Action::SwitchUnit => {
                let next = match ctl.state().temperature_unit {
                    TemperatureUnit::Celsius => TemperatureUnit::Fahrenheit,
                    TemperatureUnit::Fahrenheit => TemperatureUnit::Celsius,
                };
                ctl.set_temperature_unit(next);
                render::print_trend(&ctl.state());
            }
            Action::SwitchType => {
                let next = match ctl.state().temperature_type {
                    TemperatureType::Min => TemperatureType::Max,
                    TemperatureType::Max => TemperatureType::Min,
                };
                ctl.set_temperature_to_display(next);
                render::print_trend(&ctl.state());
            }
            Action::Quit => return Ok(()),
        }
    }
}
