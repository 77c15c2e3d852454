use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Envelope `status` value the weather endpoints use for success.
pub const SUCCESS_STATUS: &str = "success";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub source_url: String,
    pub destination_directory: PathBuf,
}

impl DownloadRequest {
    pub fn new(source_url: impl Into<String>, destination_directory: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            destination_directory: destination_directory.into(),
        }
    }
}

/// Terminal result of one download. A `Failure` raised during the copy leaves
/// whatever was already written on disk; callers should treat that file as
/// corrupt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success { file_path: PathBuf, bytes_written: u64 },
    Failure { reason: DownloadFailure },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DownloadFailure {
    #[error("empty response body")]
    EmptyResponseBody,

    #[error("invalid source url: {0}")]
    InvalidSource(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// Message taken verbatim from the server's error payload.
    #[error("{0}")]
    ServerReported(String),

    #[error("storage write error: {0}")]
    StorageWrite(String),
}

/// Error payload the download endpoint returns instead of a stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// An entry of the remote item list. `id` stays `None` until the server
/// assigns one; the client never makes ids up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "nom")]
    pub name: String,
}

/// Body of create and update calls.
#[derive(Debug, Serialize)]
pub(crate) struct ItemBody<'a> {
    #[serde(rename = "nom")]
    pub name: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ItemEnvelope {
    #[serde(default)]
    pub items: Option<ItemData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ItemData {
    #[serde(default)]
    pub data: Option<Vec<Item>>,
}

impl ItemEnvelope {
    pub fn into_items(self) -> Vec<Item> {
        self.items.and_then(|i| i.data).unwrap_or_default()
    }
}

/// What a weather sample is about: the query key it was fetched with, or the
/// one the server echoed back.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Region(String),
    Coordinates { latitude: f64, longitude: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSample {
    pub location: Location,
    pub temperature: Option<f64>,
    pub windspeed: Option<f64>,
    pub winddirection: Option<i32>,
    pub weathercode: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WeatherEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub weather: Option<WeatherPayload>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WeatherPayload {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub windspeed: Option<f64>,
    #[serde(default, deserialize_with = "integral_number")]
    pub winddirection: Option<i32>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub weathercode: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

impl WeatherPayload {
    /// Resolves the sample identity: the server's echo wins, the query that
    /// produced the response fills in when the echo is missing.
    pub fn into_sample(self, queried: Location) -> WeatherSample {
        let location = match (self.department, self.latitude, self.longitude) {
            (Some(dept), _, _) if !dept.is_empty() => Location::Region(dept),
            (_, Some(latitude), Some(longitude)) => Location::Coordinates { latitude, longitude },
            _ => queried,
        };
        WeatherSample {
            location,
            temperature: self.temperature,
            windspeed: self.windspeed,
            winddirection: self.winddirection,
            weathercode: self.weathercode,
            time: self.time,
        }
    }
}

fn string_or_number<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(d)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Whole numbers written either way (`240`, `240.0`). Fractional or
/// out-of-range values read as a missing measurement.
fn integral_number<'de, D>(d: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(serde_json::Value::Number(n)) = Option::<serde_json::Value>::deserialize(d)? else {
        return Ok(None);
    };
    if let Some(i) = n.as_i64() {
        return Ok(i32::try_from(i).ok());
    }
    Ok(n.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX))
        .map(|f| f as i32))
}
