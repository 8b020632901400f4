//! REST API client module for MediConnect services.
//!
//! This module provides the `ApiClient` for communicating with the
//! MediConnect gateway: authentication, doctors, patients and appointments.
//!
//! The API uses bearer access tokens that are refreshed transparently
//! with a longer-lived refresh token when the server answers 401.

pub mod client;
pub mod error;
pub mod refresh;
pub mod resources;
pub mod transport;

pub use client::ApiClient;
pub use error::{ApiError, RefreshError};
pub use refresh::RefreshCoordinator;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::refresh::REFRESH_PATH;
    use super::{ApiError, ApiRequest, ApiResponse, Transport};

    type Handler = Box<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

    /// In-memory transport answering from a closure and recording requests.
    pub(crate) struct MockTransport {
        handler: Handler,
        requests: Mutex<Vec<ApiRequest>>,
        refresh_delay: Option<Duration>,
    }

    impl MockTransport {
        pub(crate) fn new<F>(handler: F) -> Self
        where
            F: Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
        {
            Self {
                handler: Box::new(handler),
                requests: Mutex::new(Vec::new()),
                refresh_delay: None,
            }
        }

        /// Hold refresh exchanges open so concurrent callers overlap
        pub(crate) fn with_refresh_delay(mut self, delay: Duration) -> Self {
            self.refresh_delay = Some(delay);
            self
        }

        pub(crate) fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().clone()
        }

        pub(crate) fn count(&self, path: &str) -> usize {
            self.requests.lock().iter().filter(|r| r.path == path).count()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
            self.requests.lock().push(request.clone());
            if request.path == REFRESH_PATH {
                if let Some(delay) = self.refresh_delay {
                    tokio::time::sleep(delay).await;
                }
            }
            Ok((self.handler)(request))
        }
    }
}
