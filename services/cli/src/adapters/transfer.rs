//! services/cli/src/adapters/transfer.rs
//!
//! Streams a local file to a presigned URL with a PUT, reporting progress as
//! chunks are handed to the connection.

use async_trait::async_trait;
use burner_core::domain::FileDescriptor;
use burner_core::ports::{ObjectTransfer, PortError, PortResult, ProgressObserver};
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::http::{check, transport};

#[derive(Clone)]
pub struct HttpObjectTransfer {
    client: Client,
}

impl HttpObjectTransfer {
    /// Creates a new `HttpObjectTransfer`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectTransfer for HttpObjectTransfer {
    async fn put(
        &self,
        url: &str,
        file: &FileDescriptor,
        progress: &dyn ProgressObserver,
        cancel: CancellationToken,
    ) -> PortResult<()> {
        let handle = tokio::fs::File::open(&file.path)
            .await
            .map_err(|e| PortError::Unexpected(format!("{}: {}", file.path.display(), e)))?;

        // 1. Count bytes as the body stream yields them.
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel::<u64>();
        let mut sent = 0u64;
        let body = ReaderStream::new(handle).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                let _ = sent_tx.send(sent);
            }
            chunk
        });

        let request = self
            .client
            .put(url)
            .header(CONTENT_TYPE, &file.content_type)
            .header(CONTENT_LENGTH, file.size)
            .body(Body::wrap_stream(body))
            .send();
        tokio::pin!(request);

        // 2. Drive the request, forwarding progress until it completes or is cancelled.
        let total = Some(file.size);
        progress.on_progress(0, total);
        let response = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Transfer of {} cancelled.", file.name);
                    return Err(PortError::Cancelled);
                }
                Some(sent) = sent_rx.recv() => progress.on_progress(sent, total),
                result = &mut request => break result.map_err(transport)?,
            }
        };
        while let Ok(sent) = sent_rx.try_recv() {
            progress.on_progress(sent, total);
        }

        check(response).await?;
        debug!("Stored {} ({} bytes).", file.name, file.size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(u64, Option<u64>)>>,
    }

    impl ProgressObserver for Recorder {
        fn on_progress(&self, sent: u64, total: Option<u64>) {
            self.seen.lock().unwrap().push((sent, total));
        }
    }

    fn descriptor(path: &Path, size: u64) -> FileDescriptor {
        FileDescriptor {
            path: path.to_path_buf(),
            name: "clip.mp4".to_string(),
            size,
            content_type: "video/mp4".to_string(),
        }
    }

    /// Accepts one request, reads it fully and answers with `status_line`.
    async fn serve_once(status_line: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 8192];
            let body_start = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&buf[..body_start]).to_lowercase();
            let length: usize = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .unwrap()
                .trim()
                .parse()
                .unwrap();
            while buf.len() < body_start + length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let reply = format!("{}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n", status_line);
            socket.write_all(reply.as_bytes()).await.unwrap();
            head
        });
        (format!("http://{}/bucket/user/clip.mp4", addr), handle)
    }

    #[tokio::test]
    async fn streams_the_file_with_length_type_and_progress() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![7u8; 100_000]).unwrap();
        let (url, server) = serve_once("HTTP/1.1 200 OK").await;

        let recorder = Recorder::default();
        let transfer = HttpObjectTransfer::new(Client::new());
        transfer
            .put(&url, &descriptor(&path, 100_000), &recorder, CancellationToken::new())
            .await
            .unwrap();

        let head = server.await.unwrap();
        assert!(head.starts_with("put /bucket/user/clip.mp4"));
        assert!(head.contains("content-length: 100000"));
        assert!(head.contains("content-type: video/mp4"));

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&(0, Some(100_000))));
        assert_eq!(seen.last(), Some(&(100_000, Some(100_000))));
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"abc").unwrap();
        let (url, _server) = serve_once("HTTP/1.1 403 Forbidden").await;

        let transfer = HttpObjectTransfer::new(Client::new());
        let err = transfer
            .put(&url, &descriptor(&path, 3), &Recorder::default(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Rejected { status: 403, .. }));
    }

    #[tokio::test]
    async fn cancellation_aborts_a_stalled_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"abc").unwrap();
        // Never accepted, so the request never completes.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/bucket/clip.mp4", listener.local_addr().unwrap());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let transfer = HttpObjectTransfer::new(Client::new());
        let err = transfer
            .put(&url, &descriptor(&path, 3), &Recorder::default(), cancel)
            .await
            .unwrap_err();
        assert_eq!(err, PortError::Cancelled);
    }

    #[tokio::test]
    async fn missing_file_fails_before_any_request() {
        let transfer = HttpObjectTransfer::new(Client::new());
        let err = transfer
            .put(
                "http://127.0.0.1:9/unused",
                &descriptor(Path::new("/definitely/not/here.mp4"), 1),
                &Recorder::default(),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }
}
