//! Weather fetcher: location lookup, remote request and response mapping.
//!
//! A fetch is two awaits, location then HTTP. Nothing serialises fetches:
//! a second refresh issued while one is in flight runs alongside it and
//! whichever finishes last wins the panel.

use crate::common::Feature;
use crate::config::WeatherConfig;
use crate::error::{Result, TiltError};
use crate::events::{Effect, Severity};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Icon used for condition codes missing from the table.
pub const DEFAULT_ICON: &str = "default";

/// Placeholder shown in every field while in the error state.
pub const PLACEHOLDER: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One-shot coordinate resolution.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn locate(&self) -> Result<Coordinates>;
}

/// Current conditions at a coordinate.
#[async_trait]
pub trait WeatherService: Send + Sync {
    async fn current(&self, at: Coordinates) -> Result<WeatherResponse>;
}

/// A fixed location, or none at all when the host has no location service.
#[derive(Debug, Clone, Copy)]
pub struct StaticLocation(pub Option<Coordinates>);

impl StaticLocation {
    pub fn from_config(config: &WeatherConfig) -> Self {
        match (config.latitude, config.longitude) {
            (Some(latitude), Some(longitude)) => Self(Some(Coordinates {
                latitude,
                longitude,
            })),
            _ => Self(None),
        }
    }
}

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn locate(&self) -> Result<Coordinates> {
        self.0.ok_or_else(|| {
            TiltError::LocationUnavailable("no location service configured".into())
        })
    }
}

// --- Wire format ---

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherResponse {
    pub name: String,
    #[serde(default)]
    pub sys: SysBlock,
    pub main: MainBlock,
    #[serde(default)]
    pub wind: WindBlock,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SysBlock {
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainBlock {
    pub temp: f64,
    pub humidity: f64,
    pub feels_like: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindBlock {
    /// Metres per second with metric units.
    #[serde(default)]
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionBlock {
    pub id: u16,
    #[serde(default)]
    pub description: String,
}

/// HTTP client for an OpenWeatherMap-style current-conditions endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    units: String,
}

impl OpenWeatherClient {
    pub fn new(config: &WeatherConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            units: config.units.clone(),
        }
    }

    /// Expands the endpoint template for `at`.
    pub fn url_for(&self, at: Coordinates) -> String {
        self.endpoint
            .replace("{lat}", &at.latitude.to_string())
            .replace("{lon}", &at.longitude.to_string())
            .replace("{key}", &self.api_key)
            .replace("{units}", &self.units)
    }
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    async fn current(&self, at: Coordinates) -> Result<WeatherResponse> {
        let response = self
            .http
            .get(self.url_for(at))
            .send()
            .await
            .map_err(|e| TiltError::ServiceError {
                status: None,
                message: format!("request failed: {e}"),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TiltError::ServiceError {
                status: Some(status.as_u16()),
                message: format!("HTTP {status}"),
            });
        }
        response
            .json::<WeatherResponse>()
            .await
            .map_err(|e| TiltError::ServiceError {
                status: Some(status.as_u16()),
                message: format!("invalid payload: {e}"),
            })
    }
}

// --- Display model ---

/// Current conditions, replaced wholesale on every successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub temperature_c: f64,
    pub description: String,
    pub humidity_pct: f64,
    pub wind_kph: f64,
    pub feels_like_c: f64,
    pub condition_code: u16,
    pub icon: &'static str,
}

impl WeatherSnapshot {
    pub fn from_response(response: &WeatherResponse) -> Self {
        let (condition_code, description) = response
            .weather
            .first()
            .map(|c| (c.id, c.description.clone()))
            .unwrap_or((0, String::new()));
        let location_name = if response.sys.country.is_empty() {
            response.name.clone()
        } else {
            format!("{}, {}", response.name, response.sys.country)
        };
        Self {
            location_name,
            temperature_c: response.main.temp,
            description,
            humidity_pct: response.main.humidity,
            wind_kph: response.wind.speed * 3.6,
            feels_like_c: response.main.feels_like,
            condition_code,
            icon: icon_for(condition_code),
        }
    }
}

/// Maps a condition code to an icon key.
pub fn icon_for(code: u16) -> &'static str {
    match code {
        200..=232 => "thunderstorm",
        300..=321 => "drizzle",
        500..=504 => "rain",
        511 => "freezing-rain",
        520..=531 => "showers",
        600..=622 => "snow",
        701..=781 => "fog",
        800 => "clear",
        801 => "few-clouds",
        802 => "scattered-clouds",
        803 | 804 => "overcast",
        _ => DEFAULT_ICON,
    }
}

/// What the weather panel shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WeatherPanel {
    #[default]
    Idle,
    Loading,
    Ready(WeatherSnapshot),
    /// Explicit error state; stale data is never kept.
    Failed { reason: String },
}

impl WeatherPanel {
    /// Rendered `(label, value)` rows.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        match self {
            WeatherPanel::Ready(s) => vec![
                ("location", s.location_name.clone()),
                ("temperature", format!("{:.0}°C", s.temperature_c.round())),
                ("conditions", format!("{} [{}]", s.description, s.icon)),
                ("humidity", format!("{:.0}%", s.humidity_pct)),
                ("wind", format!("{:.0} km/h", s.wind_kph.round())),
                ("feels like", format!("{:.0}°C", s.feels_like_c.round())),
            ],
            WeatherPanel::Loading => vec![("location", "Loading...".to_string())],
            WeatherPanel::Idle | WeatherPanel::Failed { .. } => {
                let location = match self {
                    WeatherPanel::Failed { .. } => "Unable to load weather",
                    _ => PLACEHOLDER,
                };
                vec![
                    ("location", location.to_string()),
                    ("temperature", format!("{PLACEHOLDER}°C")),
                    ("conditions", format!("{PLACEHOLDER} [{DEFAULT_ICON}]")),
                    ("humidity", format!("{PLACEHOLDER}%")),
                    ("wind", format!("{PLACEHOLDER} km/h")),
                    ("feels like", format!("{PLACEHOLDER}°C")),
                ]
            }
        }
    }
}

/// Resolves the location and requests current conditions.
///
/// Cheap to clone; each refresh runs on its own clone.
#[derive(Clone)]
pub struct WeatherFetcher {
    location: Arc<dyn LocationProvider>,
    service: Arc<dyn WeatherService>,
    location_timeout: Duration,
}

impl WeatherFetcher {
    pub fn new(
        location: Arc<dyn LocationProvider>,
        service: Arc<dyn WeatherService>,
        location_timeout: Duration,
    ) -> Self {
        Self {
            location,
            service,
            location_timeout,
        }
    }

    pub async fn fetch(&self) -> Result<WeatherSnapshot> {
        let coords = tokio::time::timeout(self.location_timeout, self.location.locate())
            .await
            .map_err(|_| {
                TiltError::LocationUnavailable(format!(
                    "no fix within {}s",
                    self.location_timeout.as_secs()
                ))
            })??;
        debug!(lat = coords.latitude, lon = coords.longitude, "location resolved");

        let response = self.service.current(coords).await?;
        let snapshot = WeatherSnapshot::from_response(&response);
        info!(
            location = %snapshot.location_name,
            code = snapshot.condition_code,
            "weather fetched"
        );
        Ok(snapshot)
    }
}

pub fn success_effects(snapshot: &WeatherSnapshot) -> Vec<Effect> {
    vec![
        Effect::notify(
            "Weather updated",
            format!(
                "{}: {:.0}°C, {}",
                snapshot.location_name,
                snapshot.temperature_c.round(),
                snapshot.description
            ),
            snapshot.icon,
            Severity::Success,
        ),
        Effect::Pulse {
            feature: Feature::Weather,
            duration: Duration::from_millis(600),
        },
    ]
}

pub fn failure_effects(error: &TiltError) -> Vec<Effect> {
    warn!(code = error.code(), error = %error, "weather refresh failed");
    vec![Effect::notify(
        "Weather unavailable",
        error.to_string(),
        DEFAULT_ICON,
        Severity::Error,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANNED: &str = r#"{
        "name": "Berlin",
        "sys": {"country": "DE"},
        "main": {"temp": 18.4, "humidity": 62, "feels_like": 17.6},
        "wind": {"speed": 10},
        "weather": [{"id": 800, "description": "clear sky"}]
    }"#;

    fn canned(code: u16) -> WeatherResponse {
        let mut response: WeatherResponse = serde_json::from_str(CANNED).unwrap();
        response.weather[0].id = code;
        response
    }

    struct FixedService(std::result::Result<WeatherResponse, u16>);

    #[async_trait]
    impl WeatherService for FixedService {
        async fn current(&self, _at: Coordinates) -> Result<WeatherResponse> {
            self.0.clone().map_err(|status| TiltError::ServiceError {
                status: Some(status),
                message: format!("HTTP {status}"),
            })
        }
    }

    struct NeverLocates;

    #[async_trait]
    impl LocationProvider for NeverLocates {
        async fn locate(&self) -> Result<Coordinates> {
            std::future::pending().await
        }
    }

    fn berlin() -> Arc<StaticLocation> {
        Arc::new(StaticLocation(Some(Coordinates {
            latitude: 52.52,
            longitude: 13.40,
        })))
    }

    #[test]
    fn maps_canned_response() {
        let snapshot = WeatherSnapshot::from_response(&canned(800));
        assert_eq!(snapshot.location_name, "Berlin, DE");
        assert_eq!(snapshot.wind_kph.round(), 36.0);
        assert_eq!(snapshot.icon, "clear");
        assert_eq!(snapshot.humidity_pct, 62.0);

        let rows = WeatherPanel::Ready(snapshot).rows();
        assert!(rows.contains(&("wind", "36 km/h".to_string())));
        assert!(rows.contains(&("temperature", "18°C".to_string())));
    }

    #[test]
    fn unknown_codes_use_default_icon() {
        assert_eq!(WeatherSnapshot::from_response(&canned(999)).icon, DEFAULT_ICON);
        assert_eq!(icon_for(0), DEFAULT_ICON);
        assert_eq!(icon_for(511), "freezing-rain");
        assert_eq!(icon_for(804), "overcast");
    }

    #[test]
    fn error_state_shows_placeholders() {
        let rows = WeatherPanel::Failed {
            reason: "offline".into(),
        }
        .rows();
        assert_eq!(rows[0].1, "Unable to load weather");
        assert!(rows[1..].iter().all(|(_, v)| v.contains(PLACEHOLDER)));
    }

    #[test]
    fn url_template_is_expanded() {
        let config = WeatherConfig {
            api_key: "k".into(),
            ..WeatherConfig::default()
        };
        let url = OpenWeatherClient::new(&config).url_for(Coordinates {
            latitude: 1.5,
            longitude: -2.25,
        });
        assert_eq!(
            url,
            "https://api.openweathermap.org/data/2.5/weather?lat=1.5&lon=-2.25&appid=k&units=metric"
        );
    }

    #[tokio::test]
    async fn fetch_maps_success() {
        let fetcher = WeatherFetcher::new(
            berlin(),
            Arc::new(FixedService(Ok(canned(500)))),
            Duration::from_secs(10),
        );
        let snapshot = fetcher.fetch().await.unwrap();
        assert_eq!(snapshot.icon, "rain");
    }

    #[tokio::test]
    async fn missing_location_service_is_location_unavailable() {
        let fetcher = WeatherFetcher::new(
            Arc::new(StaticLocation(None)),
            Arc::new(FixedService(Ok(canned(800)))),
            Duration::from_secs(10),
        );
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, TiltError::LocationUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_location_times_out_after_ten_seconds() {
        let fetcher = WeatherFetcher::new(
            Arc::new(NeverLocates),
            Arc::new(FixedService(Ok(canned(800)))),
            Duration::from_secs(10),
        );
        let started = tokio::time::Instant::now();
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, TiltError::LocationUnavailable(_)));
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn non_success_response_is_service_error() {
        let fetcher = WeatherFetcher::new(
            berlin(),
            Arc::new(FixedService(Err(401))),
            Duration::from_secs(10),
        );
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, TiltError::ServiceError { status: Some(401), .. }));
    }
}
