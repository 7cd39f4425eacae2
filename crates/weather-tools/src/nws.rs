//! NWS Integration
//!
//! Adapter for the National Weather Service API plus the response
//! shapes the tools care about. One attempt per fetch, no retries.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{FetchError, Result};

/// Base URL for the National Weather Service API
pub const NWS_API_BASE: &str = "https://api.weather.gov";

/// External data source adapter (Strategy pattern)
///
/// Implement this to swap the data provider, or to mock it in tests.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    /// Fetch a fully-formed URL and return the parsed JSON body.
    /// An empty body is a failure, not an empty success.
    async fn fetch(&self, url: &str) -> Result<serde_json::Value>;
}

/// Reqwest-backed NWS client
pub struct NwsClient {
    http: reqwest::Client,
}

impl Default for NwsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NwsClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl WeatherApi for NwsClient {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value> {
        tracing::info!("Making NWS request to: {}", url);

        let response = self
            .http
            .get(url)
            .header("Accept", "application/geo+json")
            // NWS rejects requests without an identifying agent
            .header("User-Agent", "weather-agent/0.1 (weather-agent)")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("NWS request failed with status {}", status);
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(FetchError::EmptyResponse);
        }

        let value = serde_json::from_slice(&body)
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        tracing::debug!("NWS request successful ({} bytes)", body.len());
        Ok(value)
    }
}

// --- Response shapes ---

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AlertsResponse {
    #[serde(default)]
    pub features: Vec<AlertFeature>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AlertFeature {
    #[serde(default)]
    pub properties: AlertProperties,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertProperties {
    pub event: Option<String>,
    pub area_desc: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub headline: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PointsResponse {
    #[serde(default)]
    pub properties: PointsProperties,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PointsProperties {
    pub forecast: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub properties: ForecastProperties,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ForecastProperties {
    #[serde(default)]
    pub periods: Vec<ForecastPeriod>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub name: Option<String>,
    pub temperature: Option<f64>,
    pub temperature_unit: Option<String>,
    pub wind_speed: Option<String>,
    pub wind_direction: Option<String>,
    pub short_forecast: Option<String>,
}

/// Format one alert feature as a fixed five-line block plus delimiter
pub fn format_alert(feature: &AlertFeature) -> String {
    let props = &feature.properties;
    [
        format!("Event: {}", props.event.as_deref().unwrap_or("Unknown")),
        format!("Area: {}", props.area_desc.as_deref().unwrap_or("Unknown")),
        format!(
            "Severity: {}",
            props.severity.as_deref().unwrap_or("Unknown")
        ),
        format!("Status: {}", props.status.as_deref().unwrap_or("Unknown")),
        format!(
            "Headline: {}",
            props.headline.as_deref().unwrap_or("No headline")
        ),
        "---".to_string(),
    ]
    .join("\n")
}
