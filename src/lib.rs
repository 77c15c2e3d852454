pub mod config;
pub mod core;
pub mod error;
pub mod i18n;
pub mod repository;
pub mod transport;
pub mod viewmodel;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use transport::http::ReqwestTransport;
