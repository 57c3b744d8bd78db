//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::ConsoleConfig;
use crate::inflight::InFlightRegistry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ConsoleConfig,
    api: ApiClient,
    in_flight: InFlightRegistry,
}

impl AppState {
    #[must_use]
    pub fn new(config: ConsoleConfig, api: ApiClient) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                in_flight: InFlightRegistry::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.inner.in_flight
    }
}
