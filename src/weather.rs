//! Weather client for the OpenMeteo API
//!
//! Fetches current conditions plus a daily forecast for each location and
//! packs them into a [`WeatherRecord`]. Requests are rate limited and retried
//! with exponential backoff.

use crate::config::WeatherConfig;
use crate::models::{Coordinate, LocationMap, WeatherMap, WeatherRecord};
use crate::{Result, WeatherGridError};
use reqwest::blocking::{Client, Response};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Anything that can produce weather for a coordinate
pub trait WeatherSource {
    fn fetch(&mut self, coord: &Coordinate) -> Result<WeatherRecord>;
}

/// Fetch weather for every location, in key order.
///
/// The first failure aborts the whole collection.
#[instrument(skip_all, fields(locations = locations.len()))]
pub fn collect_weather<S: WeatherSource + ?Sized>(
    locations: &LocationMap,
    source: &mut S,
) -> Result<WeatherMap> {
    let start_time = Instant::now();
    let mut weather = WeatherMap::new();

    for (key, coord) in locations {
        debug!("Fetching weather for {} at {}", key, coord);
        let record = source.fetch(coord).map_err(|e| {
            error!("Weather fetch failed for {}: {}", key, e);
            e
        })?;
        weather.insert(key.clone(), record);
    }

    info!(
        "Collected weather for {} locations in {:.3}s",
        weather.len(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(weather)
}

/// Rate limiter for API requests
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum requests per minute
    max_requests_per_minute: u32,
    /// Request timestamps within the last minute
    request_times: Vec<Instant>,
}

impl RateLimiter {
    /// A limit of 0 is raised to 1 so a request is always eventually allowed
    #[must_use]
    pub fn new(max_requests_per_minute: u32) -> Self {
        Self {
            max_requests_per_minute: max_requests_per_minute.max(1),
            request_times: Vec::new(),
        }
    }

    /// Check if a request is allowed and record it
    pub fn allow_request(&mut self) -> bool {
        self.cleanup_old_requests();

        if self.request_times.len() >= self.max_requests_per_minute as usize {
            false
        } else {
            self.request_times.push(Instant::now());
            true
        }
    }

    /// Get time until next request is allowed
    pub fn time_until_next_request(&mut self) -> Duration {
        self.cleanup_old_requests();

        if self.request_times.len() < self.max_requests_per_minute as usize {
            return Duration::ZERO;
        }
        self.request_times
            .first()
            .map_or(Duration::ZERO, |oldest| {
                Duration::from_secs(60).saturating_sub(oldest.elapsed())
            })
    }

    fn cleanup_old_requests(&mut self) {
        let window = Duration::from_secs(60);
        self.request_times.retain(|time| time.elapsed() < window);
    }
}

/// OpenMeteo forecast and geocoding client
pub struct OpenMeteoClient {
    client: Client,
    config: WeatherConfig,
    rate_limiter: RateLimiter,
}

impl OpenMeteoClient {
    pub fn new(config: WeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("weathergrid/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WeatherGridError::api(format!("Failed to create HTTP client: {e}")))?;

        let rate_limiter = RateLimiter::new(config.requests_per_minute);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Current conditions and daily forecast for one coordinate
    #[instrument(skip(self))]
    pub fn get_weather(&mut self, coord: &Coordinate) -> Result<WeatherRecord> {
        let url = format!(
            "{}/forecast?latitude={}&longitude={}\
             &current=temperature_2m,precipitation,weather_code\
             &daily=temperature_2m_max,temperature_2m_min,precipitation_sum,weather_code\
             &timezone=auto&forecast_days={}",
            self.config.base_url.trim_end_matches('/'),
            coord.latitude,
            coord.longitude,
            self.config.forecast_days
        );

        let response = self.make_request(&url)?;
        let body: openmeteo::ForecastResponse = response.json().map_err(|e| {
            error!("Failed to parse forecast response: {}", e);
            WeatherGridError::api(format!(
                "Invalid forecast data received for {}",
                coord.format_coordinates()
            ))
        })?;

        openmeteo::to_record(*coord, &body)
    }

    /// Coordinates of `city` in the country with ISO 3166 code `country_code`
    #[instrument(skip(self))]
    pub fn geocode(&mut self, city: &str, country_code: &str) -> Result<Coordinate> {
        let url = format!(
            "{}/search?name={}&count=10&language=en&format=json",
            self.config.geocoding_url.trim_end_matches('/'),
            urlencoding::encode(city.trim())
        );

        let response = self.make_request(&url)?;
        let body: openmeteo::GeocodingResponse = response.json().map_err(|e| {
            error!("Failed to parse geocoding response for '{}': {}", city, e);
            WeatherGridError::api(format!("Invalid geocoding data received for '{city}'"))
        })?;

        let coord = openmeteo::pick_geocoding_match(&body, country_code).ok_or_else(|| {
            warn!("No geocoding results for '{}' in '{}'", city, country_code);
            WeatherGridError::invalid_input(format!(
                "no coordinates found for {city}, {country_code}; the city or country code might be invalid"
            ))
        })?;

        info!("Geocoded '{}, {}' to {}", city, country_code, coord);
        Ok(coord)
    }

    /// Make a request with rate limiting and retry logic
    fn make_request(&mut self, url: &str) -> Result<Response> {
        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 0;

        while attempt < max_attempts {
            if !self.rate_limiter.allow_request() {
                let wait_time = self.rate_limiter.time_until_next_request();
                warn!(
                    "Client rate limit reached, waiting {:.1}s",
                    wait_time.as_secs_f64()
                );
                thread::sleep(wait_time);
                continue;
            }

            debug!(
                "Making HTTP request (attempt {}/{}): {}",
                attempt + 1,
                max_attempts,
                url
            );

            let last_attempt = attempt + 1 >= max_attempts;
            match self.client.get(url).send() {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if response.status().as_u16() == 429 => {
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    warn!("Server rate limit exceeded (HTTP 429), retry after {}s", retry_after);
                    if last_attempt {
                        return Err(WeatherGridError::api(
                            "Rate limit exceeded and retry attempts exhausted",
                        ));
                    }
                    thread::sleep(Duration::from_secs(retry_after));
                }
                Ok(response) if response.status().is_client_error() => {
                    let status = response.status();
                    error!("Weather API rejected the request: {}", status);
                    return Err(WeatherGridError::api(format!(
                        "API request failed with status: {status}"
                    )));
                }
                Ok(response) => {
                    let status = response.status();
                    warn!("HTTP error on attempt {}: {}", attempt + 1, status);
                    if last_attempt {
                        return Err(WeatherGridError::api(format!(
                            "API request failed with status {status} after {max_attempts} attempts"
                        )));
                    }
                    thread::sleep(backoff(attempt));
                }
                Err(e) => {
                    warn!("Network error on attempt {}: {}", attempt + 1, e);
                    if last_attempt {
                        return Err(WeatherGridError::api(format!(
                            "Network error after {max_attempts} attempts: {e}"
                        )));
                    }
                    thread::sleep(backoff(attempt));
                }
            }
            attempt += 1;
        }

        Err(WeatherGridError::api("Request failed after all retry attempts"))
    }
}

impl WeatherSource for OpenMeteoClient {
    fn fetch(&mut self, coord: &Coordinate) -> Result<WeatherRecord> {
        self.get_weather(coord)
    }
}

/// Exponential backoff: 1s, 2s, 4s, ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(1000 * 2_u64.pow(attempt.min(6)))
}

/// `OpenMeteo` API response structures and conversion utilities
mod openmeteo {
    use crate::models::{Coordinate, WeatherRecord};
    use crate::{Result, WeatherGridError};
    use serde::Deserialize;
    use serde_json::{Value, json};

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub current: Option<CurrentData>,
        pub daily: Option<DailyData>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CurrentData {
        pub time: Option<String>,
        #[serde(rename = "temperature_2m")]
        pub temperature: Option<f64>,
        pub precipitation: Option<f64>,
        #[serde(alias = "weathercode")]
        pub weather_code: Option<u8>,
    }

    #[derive(Debug, Deserialize)]
    pub struct DailyData {
        pub time: Vec<String>,
        #[serde(rename = "temperature_2m_max", default)]
        pub temperature_max: Vec<Option<f64>>,
        #[serde(rename = "temperature_2m_min", default)]
        pub temperature_min: Vec<Option<f64>>,
        #[serde(rename = "precipitation_sum", default)]
        pub precipitation: Vec<Option<f64>>,
        #[serde(alias = "weathercode", default)]
        pub weather_code: Vec<Option<u8>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResponse {
        pub results: Option<Vec<GeocodingResult>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResult {
        pub latitude: f64,
        pub longitude: f64,
        pub country_code: Option<String>,
    }

    /// First result located in `country_code`
    pub fn pick_geocoding_match(
        response: &GeocodingResponse,
        country_code: &str,
    ) -> Option<Coordinate> {
        response
            .results
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|r| {
                r.country_code
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(country_code.trim()))
            })
            .map(|r| Coordinate::new(r.latitude, r.longitude))
    }

    pub fn to_record(coord: Coordinate, response: &ForecastResponse) -> Result<WeatherRecord> {
        let current = response.current.as_ref().ok_or_else(|| {
            WeatherGridError::api(format!(
                "No current weather data available for {}",
                coord.format_coordinates()
            ))
        })?;

        let forecast: Vec<Value> = response
            .daily
            .as_ref()
            .map(|daily| {
                daily
                    .time
                    .iter()
                    .enumerate()
                    .map(|(i, date)| {
                        json!({
                            "date": date,
                            "temperature_max": daily.temperature_max.get(i).copied().flatten(),
                            "temperature_min": daily.temperature_min.get(i).copied().flatten(),
                            "precipitation_sum": daily.precipitation.get(i).copied().flatten(),
                            "weather": daily
                                .weather_code
                                .get(i)
                                .copied()
                                .flatten()
                                .map(weather_code_to_description),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(WeatherRecord::new(coord)
            .with_attribute("time_current", json!(current.time))
            .with_attribute("temperature_current", json!(current.temperature))
            .with_attribute("rain_current", json!(current.precipitation.unwrap_or(0.0)))
            .with_attribute(
                "weather_current",
                json!(current.weather_code.map(weather_code_to_description)),
            )
            .with_attribute("forecast", Value::Array(forecast)))
    }

    /// Convert `OpenMeteo` weather code to human-readable description
    #[must_use]
    pub fn weather_code_to_description(code: u8) -> &'static str {
        match code {
            0 => "Clear sky",
            1 => "Mainly clear",
            2 => "Partly cloudy",
            3 => "Overcast",
            45 => "Fog",
            48 => "Depositing rime fog",
            51 => "Light drizzle",
            53 => "Moderate drizzle",
            55 => "Dense drizzle",
            56 => "Light freezing drizzle",
            57 => "Dense freezing drizzle",
            61 => "Slight rain",
            63 => "Moderate rain",
            65 => "Heavy rain",
            66 => "Light freezing rain",
            67 => "Heavy freezing rain",
            71 => "Slight snow fall",
            73 => "Moderate snow fall",
            75 => "Heavy snow fall",
            77 => "Snow grains",
            80 => "Slight rain showers",
            81 => "Moderate rain showers",
            82 => "Violent rain showers",
            85 => "Slight snow showers",
            86 => "Heavy snow showers",
            95 => "Thunderstorm",
            96 => "Thunderstorm with slight hail",
            99 => "Thunderstorm with heavy hail",
            _ => "Unknown",
        }
    }
}
