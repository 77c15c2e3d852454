use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Write side of a download: one owned handle, sequential writes, running
/// byte count.
pub struct FileSink {
    file: File,
    written: u64,
}

impl FileSink {
    /// Creates the file or truncates an existing one. The parent directory
    /// must already exist.
    pub async fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await?;

        Ok(Self { file, written: 0 })
    }

    pub async fn write_chunk(&mut self, data: &[u8]) -> std::io::Result<u64> {
        self.file.write_all(data).await?;
        self.written += data.len() as u64;
        Ok(self.written)
    }

    /// Flushes pending writes and closes the handle. tokio hands writes to a
    /// background thread, so skipping this can leave the last chunk in flight
    /// after the sink is gone.
    pub async fn finish(mut self) -> std::io::Result<u64> {
        self.file.flush().await?;
        Ok(self.written)
    }
}
