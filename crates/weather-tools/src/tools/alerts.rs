//! Alerts Tool
//!
//! Active weather alerts for a two-letter US state code.

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::tool::ParameterSchema;
use agent_core::{AgentError, ContentEnvelope, Tool, ToolCall};

use crate::nws::{AlertsResponse, NWS_API_BASE, WeatherApi, format_alert};

/// Tool for looking up active weather alerts by state
pub struct GetAlertsTool {
    api: Arc<dyn WeatherApi>,
}

impl GetAlertsTool {
    pub fn new(api: Arc<dyn WeatherApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for GetAlertsTool {
    fn schema(&self) -> agent_core::tool::ToolSchema {
        agent_core::tool::ToolSchema {
            name: "get-alerts".into(),
            description: "Get weather alerts for a state".into(),
            parameters: vec![ParameterSchema::string_of_length(
                "state",
                2,
                "Two-letter state code (e.g. CA, NY)",
            )],
        }
    }

    async fn execute(&self, call: &ToolCall) -> agent_core::Result<ContentEnvelope> {
        let state = call
            .arguments
            .get("state")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::validation("state", "missing required parameter"))?;

        let state_code = state.to_uppercase();
        let alerts_url = format!("{}/alerts?area={}", NWS_API_BASE, state_code);

        let data = match self.api.fetch(&alerts_url).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Alerts fetch failed: {}", e);
                return Ok(ContentEnvelope::text("Failed to retrieve alerts data"));
            }
        };

        // Missing or oddly-shaped feature list reads as no alerts.
        let alerts: AlertsResponse = serde_json::from_value(data).unwrap_or_default();

        if alerts.features.is_empty() {
            return Ok(ContentEnvelope::text(format!(
                "No active alerts for {}",
                state_code
            )));
        }

        let formatted: Vec<String> = alerts.features.iter().map(format_alert).collect();
        let alerts_text = format!(
            "Active alerts for {}:\n\n{}",
            state_code,
            formatted.join("\n")
        );

        Ok(ContentEnvelope::text(alerts_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::tools::testing::MockApi;
    use agent_core::ToolRegistry;

    fn call_with_state(state: &str) -> ToolCall {
        ToolCall::new("get-alerts").with_argument("state", serde_json::json!(state))
    }

    #[tokio::test]
    async fn test_adapter_failure_yields_degraded_envelope() {
        let api = Arc::new(MockApi::failing());
        let tool = GetAlertsTool::new(api);

        let envelope = tool.execute(&call_with_state("NY")).await.unwrap();
        assert_eq!(envelope.flatten_text(), "Failed to retrieve alerts data");
        assert!(!envelope.is_empty());
    }

    #[tokio::test]
    async fn test_empty_feature_list() {
        let api = Arc::new(MockApi::new(vec![Ok(serde_json::json!({"features": []}))]));
        let tool = GetAlertsTool::new(api.clone());

        let envelope = tool.execute(&call_with_state("ca")).await.unwrap();
        assert_eq!(envelope.flatten_text(), "No active alerts for CA");
        assert_eq!(api.call_count(), 1);
        assert_eq!(
            api.urls.lock().unwrap()[0],
            "https://api.weather.gov/alerts?area=CA"
        );
    }

    #[tokio::test]
    async fn test_formats_features() {
        let api = Arc::new(MockApi::new(vec![Ok(serde_json::json!({
            "features": [{
                "properties": {
                    "event": "Flood Warning",
                    "areaDesc": "Sacramento County",
                    "severity": "Severe",
                    "status": "Actual",
                    "headline": "Flood Warning until noon"
                }
            }]
        }))]));
        let tool = GetAlertsTool::new(api);

        let text = tool
            .execute(&call_with_state("CA"))
            .await
            .unwrap()
            .flatten_text();
        assert!(text.starts_with("Active alerts for CA:\n\n"));
        assert!(text.contains("Event: Flood Warning"));
        assert!(text.contains("Area: Sacramento County"));
        assert!(text.contains("Severity: Severe"));
        assert!(text.contains("Status: Actual"));
        assert!(text.contains("Headline: Flood Warning until noon"));
        assert!(text.contains("---"));
    }

    #[tokio::test]
    async fn test_empty_body_is_a_fetch_failure() {
        let api = Arc::new(MockApi::new(vec![Err(FetchError::EmptyResponse)]));
        let tool = GetAlertsTool::new(api);

        let envelope = tool.execute(&call_with_state("CA")).await.unwrap();
        assert_eq!(envelope.flatten_text(), "Failed to retrieve alerts data");
    }

    #[tokio::test]
    async fn test_validation_rejects_before_network() {
        let api = Arc::new(MockApi::failing());
        let mut registry = ToolRegistry::new();
        registry.register(GetAlertsTool::new(api.clone()));

        let call = call_with_state("CAL");
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation { .. }));
        assert_eq!(api.call_count(), 0);
    }
}
