use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::USER_AGENT},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{Datelike, NaiveDate};
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use weathertrace_core::{
    CityRepository, RepositoryError, RequestOptions, WeatherRepository,
    repository::{nominatim::NominatimCityRepository, openweather::OpenWeatherRepository},
};

type Log = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn search(
    State(log): State<Log>,
    headers: HeaderMap,
    Query(mut params): Query<HashMap<String, String>>,
) -> Json<Value> {
    for (name, key) in [(USER_AGENT.as_str(), "user-agent"), ("accept-language", "accept-language")] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            params.insert(key.to_string(), value.to_string());
        }
    }
    log.lock().unwrap().push(params);

    Json(json!([
        {"place_id": 1, "display_name": "Paris, Île-de-France, France", "lat": "48.8534951", "lon": "2.3483915"},
        {"place_id": 2, "display_name": "Paris, Lamar County, Texas", "lat": "33.6617962", "lon": "bad"}
    ]))
}

async fn day_summary(
    State(log): State<Log>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    log.lock().unwrap().push(params.clone());

    if params.get("appid").map(String::as_str) == Some("bad") {
        return (StatusCode::UNAUTHORIZED, r#"{"cod":401,"message":"Invalid API key"}"#)
            .into_response();
    }

    let date = NaiveDate::parse_from_str(&params["date"], "%Y-%m-%d").unwrap();
    // Older dates answer first, so completion order is the reverse of request order.
    let delay = 20 * u64::try_from(date.year() - 2000).unwrap_or(0);
    tokio::time::sleep(Duration::from_millis(delay)).await;

    let max = 290.0 + f64::from(date.year() - 2000);
    Json(json!({
        "lat": params["lat"].parse::<f64>().unwrap(),
        "lon": params["lon"].parse::<f64>().unwrap(),
        "tz": "+01:00",
        "date": params["date"],
        "units": "standard",
        "cloud_cover": {"afternoon": 10.0},
        "humidity": {"afternoon": 55.0},
        "precipitation": {"total": 0.0},
        "temperature": {
            "min": max - 8.0, "max": max, "afternoon": max - 1.0,
            "night": max - 7.0, "evening": max - 3.0, "morning": max - 6.0
        },
        "pressure": {"afternoon": 1012.0},
        "wind": {"max": {"speed": 5.5, "direction": 270.0}}
    }))
    .into_response()
}

fn router(log: &Log) -> Router {
    Router::new()
        .route("/search", get(search))
        .route("/data/3.0/onecall/day_summary", get(day_summary))
        .with_state(log.clone())
}

#[tokio::test]
async fn nominatim_sends_identifying_headers_and_parses_places() {
    let log = Log::default();
    let base = serve(router(&log)).await;
    let repo = NominatimCityRepository::new(&base, "dev@example.com").unwrap();

    let cities = repo.search("Paris", 5, Some("fr,us")).await.unwrap();

    assert_eq!(cities.len(), 2);
    assert_eq!(cities[0].name, "Paris, Île-de-France, France");
    assert_eq!(cities[0].lat, 48.8534951);
    assert_eq!(cities[1].lon, 0.0);

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req["format"], "json");
    assert_eq!(req["q"], "Paris");
    assert_eq!(req["limit"], "5");
    assert_eq!(req["countrycodes"], "fr,us");
    assert_eq!(req["user-agent"], "WeatherTraceApp/1.0 (dev@example.com)");
    assert_eq!(req["accept-language"], "en");
}

#[tokio::test]
async fn nominatim_omits_country_filter_when_absent() {
    let log = Log::default();
    let base = serve(router(&log)).await;
    let repo = NominatimCityRepository::new(&base, "dev@example.com").unwrap();

    repo.search("Lyon", 3, None).await.unwrap();

    let requests = log.lock().unwrap().clone();
    assert!(!requests[0].contains_key("countrycodes"));
    assert_eq!(requests[0]["limit"], "3");
}

#[tokio::test]
async fn day_summary_is_requested_and_mapped() {
    let log = Log::default();
    let base = serve(router(&log)).await;
    let repo = OpenWeatherRepository::new(&base);
    let date = NaiveDate::from_ymd_opt(2020, 5, 17).unwrap();
    let options = RequestOptions { lang: Some("en".into()), ..RequestOptions::new("KEY") };

    let day = repo.get_daily_weather(48.85, 2.35, date, &options).await.unwrap();

    assert_eq!(day.date, date);
    assert_eq!(day.temperature.max, 310.0);
    assert_eq!(day.temperature.min, 302.0);
    assert_eq!(day.wind.max.direction, 270.0);

    let req = log.lock().unwrap()[0].clone();
    assert_eq!(req["date"], "2020-05-17");
    assert_eq!(req["appid"], "KEY");
    assert_eq!(req["lang"], "en");
    assert!(!req.contains_key("units"));
}

#[tokio::test]
async fn historical_results_keep_request_order() {
    let log = Log::default();
    let base = serve(router(&log)).await;
    let repo = OpenWeatherRepository::new(&base);
    let base_date = NaiveDate::from_ymd_opt(2024, 10, 16).unwrap();

    let days = repo
        .get_historical_daily_weathers(48.85, 2.35, base_date, 4, &RequestOptions::new("KEY"))
        .await
        .unwrap();

    let years: Vec<i32> = days.iter().map(|d| d.date.year()).collect();
    assert_eq!(years, vec![2024, 2023, 2022, 2021]);
    assert_eq!(log.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn http_errors_carry_status_and_body() {
    let log = Log::default();
    let base = serve(router(&log)).await;
    let repo = OpenWeatherRepository::new(&base);
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let err = repo
        .get_daily_weather(0.0, 0.0, date, &RequestOptions::new("bad"))
        .await
        .unwrap_err();

    match err {
        RepositoryError::Http { status, body, .. } => {
            assert_eq!(status, 401);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_connectivity_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let repo = OpenWeatherRepository::new(&format!("http://{addr}"));
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let err = repo
        .get_daily_weather(0.0, 0.0, date, &RequestOptions::new("KEY"))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Connectivity { .. }));
}

#[tokio::test]
async fn unexpected_payload_is_a_decode_error() {
    let app = Router::new().route("/search", get(|| async { Json(json!({"error": "nope"})) }));
    let base = serve(app).await;
    let repo = NominatimCityRepository::new(&base, "dev@example.com").unwrap();

    let err = repo.search("Paris", 5, None).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Decode { .. }));
}
