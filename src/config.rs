use std::time::Duration;

use url::Url;

use crate::error::ClientResult;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root of the remote API, e.g. `http://localhost:5000`.
    pub(crate) base_url: String,
    pub(crate) user_agent: String,
    /// Whole-request timeout for buffered JSON calls. Streamed downloads only
    /// use `connect_timeout`.
    pub(crate) timeout: Duration,
    pub(crate) connect_timeout: Duration,
    /// Endpoint that streams a video for the `url` query parameter.
    pub(crate) download_path: String,
    /// Name used when the server does not suggest one.
    pub(crate) default_filename: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            user_agent: concat!("meteo-client/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            download_path: "/api/download-video".to_string(),
            default_filename: "video.mp4".to_string(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_download_path(mut self, path: impl Into<String>) -> Self {
        self.download_path = path.into();
        self
    }

    #[must_use]
    pub fn with_default_filename(mut self, name: impl Into<String>) -> Self {
        self.default_filename = name.into();
        self
    }

    pub fn base_url(&self) -> ClientResult<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn download_path(&self) -> &str {
        &self.download_path
    }

    pub fn default_filename(&self) -> &str {
        &self.default_filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::new();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert!(config.user_agent.starts_with("meteo-client/"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.download_path(), "/api/download-video");
        assert_eq!(config.default_filename(), "video.mp4");
    }

    #[test]
    fn test_builder_pattern() {
        let config = ClientConfig::new()
            .with_base_url("https://meteo.example.org")
            .with_user_agent("test-agent")
            .with_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(2))
            .with_download_path("/dl")
            .with_default_filename("clip.mp4");

        assert_eq!(config.base_url().unwrap().as_str(), "https://meteo.example.org/");
        assert_eq!(config.user_agent(), "test-agent");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.download_path(), "/dl");
        assert_eq!(config.default_filename(), "clip.mp4");
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig::new().with_base_url("not a url");
        assert!(config.base_url().is_err());
    }
}
