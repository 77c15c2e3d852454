use std::sync::Arc;

use crate::core::model::WeatherSample;
use crate::core::state::{AsyncState, StateProjector};
use crate::error::ClientError;
use crate::repository::WeatherRepository;

pub struct WeatherViewModel {
    repo: Arc<WeatherRepository>,
    state: StateProjector<WeatherSample>,
}

impl WeatherViewModel {
    pub fn new(repo: Arc<WeatherRepository>) -> Self {
        Self { repo, state: StateProjector::new("weather") }
    }

    pub fn state(&self) -> &StateProjector<WeatherSample> {
        &self.state
    }

    pub fn fetch_region(&self, code: &str) {
        let repo = self.repo.clone();
        let code = code.trim().to_string();
        self.state.run(async move {
            if code.is_empty() {
                return Err(ClientError::invalid_input("region code is empty"));
            }
            repo.by_region(&code).await
        });
    }

    pub fn fetch_coordinates(&self, latitude: f64, longitude: f64) {
        let repo = self.repo.clone();
        self.state.run(async move {
            if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                return Err(ClientError::invalid_input(format!("coordinates out of range: {latitude}, {longitude}")));
            }
            repo.by_coordinates(latitude, longitude).await
        });
    }

    pub fn reset(&self) {
        self.state.reset();
    }

    pub async fn settled(&self) -> AsyncState<WeatherSample> {
        self.state.settled().await
    }
}
