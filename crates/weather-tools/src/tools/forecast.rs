//! Forecast Tool
//!
//! Point forecast for a latitude/longitude. Two dependent fetches:
//! resolve the grid point, then fetch the forecast document it names.

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::tool::{ParameterSchema, ToolSchema};
use agent_core::{AgentError, ContentEnvelope, Tool, ToolCall};

use crate::nws::{ForecastPeriod, ForecastResponse, NWS_API_BASE, PointsResponse, WeatherApi};

/// Tool for fetching a weather forecast by coordinates
pub struct GetForecastTool {
    api: Arc<dyn WeatherApi>,
}

impl GetForecastTool {
    pub fn new(api: Arc<dyn WeatherApi>) -> Self {
        Self { api }
    }
}

fn format_period(period: &ForecastPeriod) -> String {
    let temperature = period
        .temperature
        .map_or_else(|| "Unknown".to_string(), |t| t.to_string());
    [
        format!("{}:", period.name.as_deref().unwrap_or("Unknown")),
        format!(
            "Temperature: {}°{}",
            temperature,
            period.temperature_unit.as_deref().unwrap_or("F")
        ),
        format!(
            "Wind: {} {}",
            period.wind_speed.as_deref().unwrap_or("Unknown"),
            period.wind_direction.as_deref().unwrap_or("")
        ),
        period
            .short_forecast
            .as_deref()
            .unwrap_or("No forecast available")
            .to_string(),
        "---".to_string(),
    ]
    .join("\n")
}

#[async_trait]
impl Tool for GetForecastTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get-forecast".into(),
            description: "Get weather forecast for a location".into(),
            parameters: vec![
                ParameterSchema::number_in_range(
                    "latitude",
                    -90.0,
                    90.0,
                    "Latitude of the location",
                ),
                ParameterSchema::number_in_range(
                    "longitude",
                    -180.0,
                    180.0,
                    "Longitude of the location",
                ),
            ],
        }
    }

    async fn execute(&self, call: &ToolCall) -> agent_core::Result<ContentEnvelope> {
        let latitude = call
            .arguments
            .get("latitude")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| AgentError::validation("latitude", "missing required parameter"))?;
        let longitude = call
            .arguments
            .get("longitude")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| AgentError::validation("longitude", "missing required parameter"))?;

        // Grid point resolution comes first; its failure short-circuits
        // before any forecast fetch.
        let points_url = format!("{}/points/{:.4},{:.4}", NWS_API_BASE, latitude, longitude);
        let points_data = match self.api.fetch(&points_url).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Grid point fetch failed: {}", e);
                return Ok(ContentEnvelope::text(format!(
                    "Failed to retrieve grid point data for coordinates: {}, {}. \
                     This location may not be supported by the NWS API \
                     (only US locations are supported).",
                    latitude, longitude
                )));
            }
        };

        let points: PointsResponse = serde_json::from_value(points_data).unwrap_or_default();
        let Some(forecast_url) = points.properties.forecast else {
            return Ok(ContentEnvelope::text(
                "Failed to get forecast URL from grid point data",
            ));
        };

        let forecast_data = match self.api.fetch(&forecast_url).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Forecast fetch failed: {}", e);
                return Ok(ContentEnvelope::text("Failed to retrieve forecast data"));
            }
        };

        let forecast: ForecastResponse = serde_json::from_value(forecast_data).unwrap_or_default();
        if forecast.properties.periods.is_empty() {
            return Ok(ContentEnvelope::text("No forecast periods available"));
        }

        let formatted: Vec<String> = forecast.properties.periods.iter().map(format_period).collect();
        let forecast_text = format!(
            "Forecast for {}, {}:\n\n{}",
            latitude,
            longitude,
            formatted.join("\n")
        );

        Ok(ContentEnvelope::text(forecast_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::tools::testing::MockApi;

    fn call_at(latitude: f64, longitude: f64) -> ToolCall {
        ToolCall::new("get-forecast")
            .with_argument("latitude", serde_json::json!(latitude))
            .with_argument("longitude", serde_json::json!(longitude))
    }

    #[tokio::test]
    async fn test_points_failure_short_circuits() {
        let api = Arc::new(MockApi::new(vec![Err(FetchError::Status(404))]));
        let tool = GetForecastTool::new(api.clone());

        let text = tool.execute(&call_at(40.0, -75.0)).await.unwrap().flatten_text();
        assert!(text.starts_with("Failed to retrieve grid point data for coordinates: 40, -75."));
        // Exactly one adapter call: the forecast fetch never happened.
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_forecast_url() {
        let api = Arc::new(MockApi::new(vec![Ok(serde_json::json!({
            "properties": {}
        }))]));
        let tool = GetForecastTool::new(api.clone());

        let text = tool.execute(&call_at(40.0, -75.0)).await.unwrap().flatten_text();
        assert_eq!(text, "Failed to get forecast URL from grid point data");
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_forecast_fetch_failure() {
        let api = Arc::new(MockApi::new(vec![
            Ok(serde_json::json!({
                "properties": {"forecast": "https://api.weather.gov/gridpoints/PHI/50,76/forecast"}
            })),
            Err(FetchError::Status(500)),
        ]));
        let tool = GetForecastTool::new(api.clone());

        let text = tool.execute(&call_at(40.0, -75.0)).await.unwrap().flatten_text();
        assert_eq!(text, "Failed to retrieve forecast data");
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_periods() {
        let api = Arc::new(MockApi::new(vec![
            Ok(serde_json::json!({
                "properties": {"forecast": "https://api.weather.gov/gridpoints/PHI/50,76/forecast"}
            })),
            Ok(serde_json::json!({"properties": {"periods": []}})),
        ]));
        let tool = GetForecastTool::new(api);

        let text = tool.execute(&call_at(40.0, -75.0)).await.unwrap().flatten_text();
        assert_eq!(text, "No forecast periods available");
    }

    #[tokio::test]
    async fn test_renders_periods() {
        let api = Arc::new(MockApi::new(vec![
            Ok(serde_json::json!({
                "properties": {"forecast": "https://api.weather.gov/gridpoints/PHI/50,76/forecast"}
            })),
            Ok(serde_json::json!({
                "properties": {
                    "periods": [{
                        "name": "Tonight",
                        "temperature": 65,
                        "temperatureUnit": "F",
                        "windSpeed": "5 mph",
                        "windDirection": "NW",
                        "shortForecast": "Partly cloudy"
                    }]
                }
            })),
        ]));
        let tool = GetForecastTool::new(api.clone());

        let text = tool.execute(&call_at(40.0, -75.0)).await.unwrap().flatten_text();
        assert!(text.starts_with("Forecast for 40, -75:\n\n"));
        assert!(text.contains("Tonight:"));
        assert!(text.contains("Temperature: 65°F"));
        assert!(text.contains("Wind: 5 mph NW"));
        assert!(text.contains("Partly cloudy"));

        // Coordinates go out formatted to four decimal places.
        assert_eq!(
            api.urls.lock().unwrap()[0],
            "https://api.weather.gov/points/40.0000,-75.0000"
        );
    }
}
