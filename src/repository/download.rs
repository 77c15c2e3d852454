use std::path::Path;

use url::Url;

use crate::config::ClientConfig;
use crate::core::engine::DownloadEngine;
use crate::core::model::{DownloadFailure, DownloadOutcome, DownloadRequest};
use crate::error::ClientResult;
use crate::transport::ApiRequest;

/// Video downloads: the server extracts and streams the video, this side
/// only names the endpoint and hands the stream to the engine.
pub struct DownloadRepository {
    engine: DownloadEngine,
    base_url: Url,
    download_path: String,
}

impl DownloadRepository {
    pub fn new(engine: DownloadEngine, config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self {
            engine,
            base_url: config.base_url()?,
            download_path: config.download_path().to_string(),
        })
    }

    pub fn engine(&self) -> &DownloadEngine {
        &self.engine
    }

    /// `<base>/<download_path>?url=<video_url>`
    pub fn source_url(&self, video_url: &str) -> ClientResult<String> {
        let url = ApiRequest::get(self.download_path.as_str())
            .with_query("url", video_url)
            .url(&self.base_url)?;
        Ok(url.to_string())
    }

    pub async fn download(&self, video_url: &str, destination: &Path) -> DownloadOutcome {
        let source_url = match self.source_url(video_url) {
            Ok(u) => u,
            Err(e) => {
                return DownloadOutcome::Failure { reason: DownloadFailure::InvalidSource(e.to_string()) };
            }
        };
        self.engine.download(&DownloadRequest::new(source_url, destination)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{FakeTransport, ScriptedStream};
    use bytes::Bytes;
    use std::sync::Arc;

    const VIDEO: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn repo(fake: FakeTransport) -> DownloadRepository {
        let config = ClientConfig::new().with_base_url("http://api.local:5000");
        DownloadRepository::new(DownloadEngine::new(Arc::new(fake), config.default_filename()), &config).unwrap()
    }

    #[test]
    fn source_url_carries_video_as_query() {
        let repo = repo(FakeTransport::new());
        let url = Url::parse(&repo.source_url(VIDEO).unwrap()).unwrap();
        assert_eq!(url.path(), "/api/download-video");
        assert_eq!(url.query_pairs().next().unwrap().1, VIDEO);
    }

    #[tokio::test]
    async fn download_streams_through_engine() {
        let dir = tempfile::tempdir().unwrap();
        let source = repo(FakeTransport::new()).source_url(VIDEO).unwrap();
        let fake = FakeTransport::new().with_stream(
            &source,
            ScriptedStream::ok(vec![Ok(Bytes::from_static(b"\x00\x00\x00\x18ftypmp42"))])
                .header("content-disposition", r#"attachment; filename="Never Gonna.mp4""#),
        );

        let outcome = repo(fake).download(VIDEO, dir.path()).await;

        assert_eq!(
            outcome,
            DownloadOutcome::Success { file_path: dir.path().join("Never Gonna.mp4"), bytes_written: 12 }
        );
    }
}
