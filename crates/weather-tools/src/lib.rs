//! # weather-tools
//!
//! Weather capabilities for the agent: an adapter over the National
//! Weather Service API and the two protocol-facing tools built on it.
//!
//! Tool handlers absorb every external failure into a valid text
//! envelope, so callers inspect content rather than branching on
//! success/failure.

pub mod error;
pub mod nws;
pub mod tools;

pub use error::{FetchError, Result};
pub use nws::{NWS_API_BASE, NwsClient, WeatherApi};
pub use tools::{GetAlertsTool, GetForecastTool};

use std::sync::Arc;

use agent_core::ToolRegistry;

/// Build a registry holding the weather tool set.
///
/// Registries are cheap: HTTP-bound sessions build a fresh one per
/// request while sharing the adapter.
pub fn weather_registry(api: Arc<dyn WeatherApi>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(GetAlertsTool::new(api.clone()));
    registry.register(GetForecastTool::new(api));
    registry
}
