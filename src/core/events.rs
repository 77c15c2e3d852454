use std::path::PathBuf;
use uuid::Uuid;

pub type DownloadId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Started { id: DownloadId, file_path: PathBuf, total: Option<u64> },
    Progress { id: DownloadId, written: u64, total: Option<u64> },
    Finished { id: DownloadId, file_path: PathBuf, bytes_written: u64 },
    Failed { id: DownloadId, message: String },
}

impl DownloadEvent {
    pub fn id(&self) -> DownloadId {
        match self {
            DownloadEvent::Started { id, .. }
            | DownloadEvent::Progress { id, .. }
            | DownloadEvent::Finished { id, .. }
            | DownloadEvent::Failed { id, .. } => *id,
        }
    }
}
