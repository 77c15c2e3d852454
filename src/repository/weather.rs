use std::sync::Arc;

use crate::core::model::{Location, WeatherEnvelope, WeatherSample, SUCCESS_STATUS};
use crate::error::{ClientError, ClientResult, UNKNOWN_ERROR};
use crate::repository::decode;
use crate::transport::{ApiRequest, Transport};

pub struct WeatherRepository {
    transport: Arc<dyn Transport>,
}

impl WeatherRepository {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Weather for an administrative region code such as `"75"`.
    pub async fn by_region(&self, code: &str) -> ClientResult<WeatherSample> {
        let req = ApiRequest::get("/api/get-weather").with_query("dept_number", code);
        self.fetch(req, Location::Region(code.to_string())).await
    }

    pub async fn by_coordinates(&self, latitude: f64, longitude: f64) -> ClientResult<WeatherSample> {
        let req = ApiRequest::get("/api/get-weather-gps")
            .with_query("latitude", latitude)
            .with_query("longitude", longitude);
        self.fetch(req, Location::Coordinates { latitude, longitude }).await
    }

    /// Both query modes share one envelope. Only `status == "success"` with a
    /// payload present counts as success.
    async fn fetch(&self, req: ApiRequest, queried: Location) -> ClientResult<WeatherSample> {
        let envelope: WeatherEnvelope = decode(self.transport.execute_json(req).await?)?;
        let message = envelope.message.filter(|m| !m.trim().is_empty());

        match (envelope.status.as_deref(), envelope.weather) {
            (Some(SUCCESS_STATUS), Some(payload)) => Ok(payload.into_sample(queried)),
            (Some(SUCCESS_STATUS), None) => Err(match message {
                Some(message) => ClientError::Rejected { message },
                None => ClientError::malformed("weather payload missing from successful response"),
            }),
            (status, _) => {
                tracing::debug!(?status, "weather request rejected");
                Err(ClientError::Rejected { message: message.unwrap_or_else(|| UNKNOWN_ERROR.to_string()) })
            }
        }
    }
}
