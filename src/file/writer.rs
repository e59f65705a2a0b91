//! Pipe backed upload writer / 管道上传写入器
//!
//! Opening the writer spawns the whole-object upload right away; the upload
//! task consumes the read half of an in-memory pipe while the caller fills the
//! write half. The task reports its outcome once, through a oneshot channel
//! awaited by `close`. A writer dropped without `close` aborts the task, so a
//! partial object is never committed.

use std::sync::Arc;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::info::FileInfo;
use crate::error::{Error, Result};
use crate::storage::{Metadata, RemoteStorage, WriteMode};

/// Bytes buffered between the caller and the upload task / 管道容量
pub const PIPE_CAPACITY: usize = 64 * 1024;

pub struct StreamWriter {
    pipe: DuplexStream,
    done: oneshot::Receiver<anyhow::Result<Metadata>>,
    task: JoinHandle<()>,
}

impl StreamWriter {
    /// Spawn the upload task; must be called inside a tokio runtime / 启动后台上传
    pub fn open(storage: Arc<dyn RemoteStorage>, path: &str) -> Self {
        let (pipe, consumer) = tokio::io::duplex(PIPE_CAPACITY);
        let (done_tx, done) = oneshot::channel();
        let path = path.to_string();

        tracing::debug!("opening write stream: path={}", path);

        let task = tokio::spawn(async move {
            // On failure the consumer half is dropped with the request, so
            // pending and later writes fail instead of blocking
            let result = storage.upload(&path, WriteMode::Overwrite, Box::new(consumer)).await;
            match &result {
                Ok(_) => tracing::debug!("upload finished: path={}", path),
                Err(e) => tracing::warn!("upload failed: path={}, error={}", path, e),
            }
            let _ = done_tx.send(result);
        });

        Self { pipe, done, task }
    }

    /// Write the whole buffer, waiting while the pipe is full / 写入全部数据
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.pipe.write_all(buf).await
            .map_err(|e| Error::transport("couldn't write to upload stream", e))?;
        Ok(buf.len())
    }

    /// Signal end of data and wait for the upload result / 结束写入并等待上传结果
    pub async fn close(mut self) -> Result<FileInfo> {
        let shutdown = self.pipe.shutdown().await;

        let outcome = match (&mut self.done).await {
            Ok(Ok(meta)) => Ok(FileInfo::from(meta)),
            Ok(Err(e)) => Err(Error::transport("couldn't upload file", e)),
            Err(_) => Err(Error::UploadInterrupted),
        };

        // An upload error explains a failed shutdown better than the pipe does
        match (outcome, shutdown) {
            (Ok(_), Err(e)) => Err(Error::transport("problem writing file", e)),
            (outcome, _) => outcome,
        }
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        // No-op once the upload has reported; otherwise the request body is
        // dropped before the pipe reaches end of data
        if !self.task.is_finished() {
            tracing::debug!("write stream dropped before close, aborting upload");
            self.task.abort();
        }
    }
}
