//! Weather Tools
//!
//! Protocol-facing tools wrapping the NWS adapter. Every failure path
//! produces a valid text envelope, so the protocol layer never needs
//! tool-specific error handling.

mod alerts;
mod forecast;

pub use alerts::GetAlertsTool;
pub use forecast::GetForecastTool;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::{FetchError, Result};
    use crate::nws::WeatherApi;

    /// Scripted adapter: returns queued responses in order and records
    /// every requested URL.
    pub struct MockApi {
        responses: Mutex<Vec<Result<serde_json::Value>>>,
        pub urls: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl MockApi {
        pub fn new(responses: Vec<Result<serde_json::Value>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                urls: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self::new(vec![Err(FetchError::Status(500))])
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherApi for MockApi {
        async fn fetch(&self, url: &str) -> Result<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());

            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(FetchError::EmptyResponse);
            }
            responses.remove(0)
        }
    }
}
