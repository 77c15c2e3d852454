pub mod download;
pub mod items;
pub mod weather;

pub use download::{DownloadViewModel, DownloadedFile};
pub use items::ItemsViewModel;
pub use weather::WeatherViewModel;
