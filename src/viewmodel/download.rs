use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::model::{DownloadFailure, DownloadOutcome};
use crate::core::state::{AsyncState, StateProjector};
use crate::repository::DownloadRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub file_path: PathBuf,
    pub bytes_written: u64,
}

pub struct DownloadViewModel {
    repo: Arc<DownloadRepository>,
    state: StateProjector<DownloadedFile>,
}

impl DownloadViewModel {
    pub fn new(repo: Arc<DownloadRepository>) -> Self {
        Self { repo, state: StateProjector::new("download") }
    }

    pub fn state(&self) -> &StateProjector<DownloadedFile> {
        &self.state
    }

    pub fn repository(&self) -> &DownloadRepository {
        &self.repo
    }

    pub fn download(&self, video_url: &str, destination: &Path) {
        let repo = self.repo.clone();
        let video_url = video_url.trim().to_string();
        let destination = destination.to_path_buf();
        self.state.run(async move {
            if video_url.is_empty() {
                return Err(DownloadFailure::InvalidSource("video url is empty".to_string()));
            }
            match repo.download(&video_url, &destination).await {
                DownloadOutcome::Success { file_path, bytes_written } => Ok(DownloadedFile { file_path, bytes_written }),
                DownloadOutcome::Failure { reason } => Err(reason),
            }
        });
    }

    pub fn reset(&self) {
        self.state.reset();
    }

    pub async fn settled(&self) -> AsyncState<DownloadedFile> {
        self.state.settled().await
    }
}
