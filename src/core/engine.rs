use crate::core::events::{DownloadEvent, DownloadId};
use crate::core::filename::resolve_filename;
use crate::core::model::{DownloadFailure, DownloadOutcome, DownloadRequest};
use crate::core::sink::FileSink;
use crate::error::UNKNOWN_ERROR;
use crate::transport::{error_message, ApiRequest, ByteStream, StreamedResponse, Transport};
use reqwest::header::CONTENT_DISPOSITION;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::broadcast;
use tokio_util::io::StreamReader;
use uuid::Uuid;

/// Read buffer size for the body copy.
pub const CHUNK_SIZE: usize = 4096;

/// Progress events are emitted at most once per this many bytes.
const PROGRESS_EVERY: u64 = 256 * 1024;

/// Upper bound on how much of an error body is read to find its message.
const MAX_ERROR_BODY: u64 = 64 * 1024;

/// Streams a response body to disk. A failure mid-copy leaves the partial
/// file in place. Downloads to the same filename are not coordinated.
#[derive(Clone)]
pub struct DownloadEngine {
    transport: Arc<dyn Transport>,
    default_filename: String,
    event_tx: broadcast::Sender<DownloadEvent>,
}

impl DownloadEngine {
    pub fn new(transport: Arc<dyn Transport>, default_filename: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self { transport, default_filename: default_filename.into(), event_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.event_tx.subscribe()
    }

    pub async fn download(&self, request: &DownloadRequest) -> DownloadOutcome {
        let id = Uuid::new_v4();
        match self.try_download(id, request).await {
            Ok((file_path, bytes_written)) => {
                tracing::info!(%id, path = %file_path.display(), bytes_written, "download saved");
                let _ = self.event_tx.send(DownloadEvent::Finished {
                    id,
                    file_path: file_path.clone(),
                    bytes_written,
                });
                DownloadOutcome::Success { file_path, bytes_written }
            }
            Err(reason) => {
                tracing::warn!(%id, url = %request.source_url, error = %reason, "download failed");
                let _ = self.event_tx.send(DownloadEvent::Failed { id, message: reason.to_string() });
                DownloadOutcome::Failure { reason }
            }
        }
    }

    async fn try_download(&self, id: DownloadId, request: &DownloadRequest) -> Result<(PathBuf, u64), DownloadFailure> {
        let resp = self
            .transport
            .execute_stream(ApiRequest::get(request.source_url.as_str()))
            .await
            .map_err(|e| DownloadFailure::Transport(e.to_string()))?;

        if !resp.is_success() {
            tracing::debug!(%id, status = %resp.status, "download endpoint returned an error");
            return Err(DownloadFailure::ServerReported(read_error_message(resp.body).await));
        }

        let filename = resolve_filename(resp.header(CONTENT_DISPOSITION), &self.default_filename);
        let total = resp.content_length();
        let StreamedResponse { body, .. } = resp;
        let body = body.ok_or(DownloadFailure::EmptyResponseBody)?;

        let file_path = request.destination_directory.join(&filename);
        let mut sink = FileSink::create(&file_path).await.map_err(storage)?;
        let _ = self.event_tx.send(DownloadEvent::Started { id, file_path: file_path.clone(), total });

        let copied = self.copy_body(id, body, &mut sink, total).await;
        // Flush on every path so the partial file reflects everything written.
        let closed = sink.finish().await;
        copied?;
        let bytes_written = closed.map_err(storage)?;

        Ok((file_path, bytes_written))
    }

    async fn copy_body(
        &self,
        id: DownloadId,
        body: ByteStream,
        sink: &mut FileSink,
        total: Option<u64>,
    ) -> Result<(), DownloadFailure> {
        let mut reader = StreamReader::new(body);
        let mut buf = [0u8; CHUNK_SIZE];
        let mut last_reported = 0u64;

        loop {
            let read = reader
                .read(&mut buf)
                .await
                .map_err(|e| DownloadFailure::Transport(e.to_string()))?;
            if read == 0 {
                return Ok(());
            }

            let written = sink.write_chunk(&buf[..read]).await.map_err(storage)?;
            tracing::trace!(%id, read, written, "chunk written");

            if written - last_reported >= PROGRESS_EVERY {
                last_reported = written;
                let _ = self.event_tx.send(DownloadEvent::Progress { id, written, total });
            }
        }
    }
}

fn storage(e: std::io::Error) -> DownloadFailure {
    DownloadFailure::StorageWrite(e.to_string())
}

async fn read_error_message(body: Option<ByteStream>) -> String {
    let Some(body) = body else {
        return UNKNOWN_ERROR.to_string();
    };

    let mut raw = Vec::new();
    if StreamReader::new(body).take(MAX_ERROR_BODY).read_to_end(&mut raw).await.is_err() {
        return UNKNOWN_ERROR.to_string();
    }
    error_message(&raw).unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{FakeTransport, ScriptedStream};
    use bytes::Bytes;

    const URL: &str = "http://localhost:5000/api/download-video?url=abc";
    const MIB: usize = 1024 * 1024;

    fn engine(fake: FakeTransport) -> DownloadEngine {
        DownloadEngine::new(Arc::new(fake), "video.mp4")
    }

    fn chunks(parts: &[&'static [u8]]) -> Vec<std::io::Result<Bytes>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p))).collect()
    }

    #[tokio::test]
    async fn saves_stream_under_disposition_name() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransport::new().with_stream(
            URL,
            ScriptedStream::ok(chunks(&[b"abc", b"defg", b"h"]))
                .header("content-disposition", r#"attachment; filename="x.mp4""#),
        );

        let outcome = engine(fake).download(&DownloadRequest::new(URL, dir.path())).await;

        let expected = dir.path().join("x.mp4");
        assert_eq!(outcome, DownloadOutcome::Success { file_path: expected.clone(), bytes_written: 8 });
        assert_eq!(tokio::fs::read(&expected).await.unwrap(), b"abcdefgh");
    }

    #[tokio::test]
    async fn bytes_written_matches_large_stream() {
        let dir = tempfile::tempdir().unwrap();
        let block = Bytes::from(vec![7u8; MIB + 123]);
        let parts: Vec<std::io::Result<Bytes>> = (0..3).map(|_| Ok(block.clone())).collect();
        let fake = FakeTransport::new().with_stream(URL, ScriptedStream::ok(parts));

        let outcome = engine(fake).download(&DownloadRequest::new(URL, dir.path())).await;

        let expected_len = 3 * (MIB as u64 + 123);
        match outcome {
            DownloadOutcome::Success { file_path, bytes_written } => {
                assert_eq!(bytes_written, expected_len);
                assert_eq!(file_path, dir.path().join("video.mp4"));
                assert_eq!(tokio::fs::metadata(&file_path).await.unwrap().len(), expected_len);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn form_data_disposition_uses_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransport::new()
            .with_stream(URL, ScriptedStream::ok(chunks(&[b"data"])).header("content-disposition", "form-data"));

        let outcome = engine(fake).download(&DownloadRequest::new(URL, dir.path())).await;

        assert_eq!(
            outcome,
            DownloadOutcome::Success { file_path: dir.path().join("video.mp4"), bytes_written: 4 }
        );
    }

    #[tokio::test]
    async fn connection_drop_leaves_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let block = Bytes::from(vec![1u8; MIB]);
        let mut parts: Vec<std::io::Result<Bytes>> = (0..6).map(|_| Ok(block.clone())).collect();
        parts.push(Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset")));
        parts.extend((0..4).map(|_| Ok(block.clone())));
        let fake = FakeTransport::new().with_stream(URL, ScriptedStream::ok(parts));

        let outcome = engine(fake).download(&DownloadRequest::new(URL, dir.path())).await;

        match outcome {
            DownloadOutcome::Failure { reason: DownloadFailure::Transport(msg) } => {
                assert!(msg.contains("connection reset"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let partial = tokio::fs::metadata(dir.path().join("video.mp4")).await.unwrap();
        assert_eq!(partial.len(), 6 * MIB as u64);
    }

    #[tokio::test]
    async fn server_error_payload_is_reported_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransport::new()
            .with_stream(URL, ScriptedStream::error(400, r#"{"status":"error","message":"URL invalide"}"#));

        let outcome = engine(fake).download(&DownloadRequest::new(URL, dir.path())).await;

        assert_eq!(
            outcome,
            DownloadOutcome::Failure { reason: DownloadFailure::ServerReported("URL invalide".into()) }
        );
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn unparseable_error_body_is_unknown_error() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransport::new()
            .with_stream(URL, ScriptedStream::error(500, "Internal Server Error"))
            .with_stream(URL, ScriptedStream::error(500, "").without_body());
        let engine = engine(fake);

        for _ in 0..2 {
            let outcome = engine.download(&DownloadRequest::new(URL, dir.path())).await;
            assert_eq!(
                outcome,
                DownloadOutcome::Failure { reason: DownloadFailure::ServerReported(UNKNOWN_ERROR.into()) }
            );
        }
    }

    #[tokio::test]
    async fn missing_body_is_empty_response_failure() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransport::new().with_stream(URL, ScriptedStream::ok(vec![]).without_body());

        let outcome = engine(fake).download(&DownloadRequest::new(URL, dir.path())).await;

        assert_eq!(outcome, DownloadOutcome::Failure { reason: DownloadFailure::EmptyResponseBody });
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_failure() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = engine(FakeTransport::new()).download(&DownloadRequest::new(URL, dir.path())).await;
        assert!(matches!(outcome, DownloadOutcome::Failure { reason: DownloadFailure::Transport(_) }));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn write_error_mid_copy_is_storage_failure() {
        let block = Bytes::from(vec![1u8; CHUNK_SIZE]);
        let parts: Vec<std::io::Result<Bytes>> = (0..16).map(|_| Ok(block.clone())).collect();
        let fake = FakeTransport::new().with_stream(
            URL,
            ScriptedStream::ok(parts).header("content-disposition", r#"attachment; filename="full""#),
        );
        let engine = engine(fake);
        let mut events = engine.subscribe();

        // /dev/full opens fine and fails every write with ENOSPC.
        let outcome = engine.download(&DownloadRequest::new(URL, "/dev")).await;

        assert!(matches!(outcome, DownloadOutcome::Failure { reason: DownloadFailure::StorageWrite(_) }));
        let mut last = None;
        while let Ok(evt) = events.try_recv() {
            last = Some(evt);
        }
        assert!(matches!(last, Some(DownloadEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn missing_destination_is_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransport::new().with_stream(URL, ScriptedStream::ok(chunks(&[b"data"])));

        let request = DownloadRequest::new(URL, dir.path().join("does-not-exist"));
        let outcome = engine(fake).download(&request).await;

        assert!(matches!(outcome, DownloadOutcome::Failure { reason: DownloadFailure::StorageWrite(_) }));
    }

    #[tokio::test]
    async fn emits_started_progress_and_finished() {
        let dir = tempfile::tempdir().unwrap();
        let block = Bytes::from(vec![0u8; 512 * 1024]);
        let fake = FakeTransport::new().with_stream(
            URL,
            ScriptedStream::ok(vec![Ok(block.clone()), Ok(block)]).header("content-length", "1048576"),
        );
        let engine = engine(fake);
        let mut rx = engine.subscribe();

        engine.download(&DownloadRequest::new(URL, dir.path())).await;

        let mut events = vec![];
        while let Ok(evt) = rx.try_recv() {
            events.push(evt);
        }
        assert!(matches!(events.first(), Some(DownloadEvent::Started { total: Some(1048576), .. })));
        assert!(events.iter().any(|e| matches!(e, DownloadEvent::Progress { .. })));
        assert!(matches!(events.last(), Some(DownloadEvent::Finished { bytes_written: 1048576, .. })));
        assert!(events.iter().all(|e| e.id() == events[0].id()));
    }
}
