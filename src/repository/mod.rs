pub mod download;
pub mod items;
pub mod weather;

pub use download::DownloadRepository;
pub use items::ItemRepository;
pub use weather::WeatherRepository;

use serde::de::DeserializeOwned;

use crate::error::ClientResult;

/// An empty or `null` body decodes as the envelope's default.
fn decode<T: DeserializeOwned + Default>(value: serde_json::Value) -> ClientResult<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value)?)
}
