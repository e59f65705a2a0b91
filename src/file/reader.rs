//! Range download backed reader / 范围下载读取器

use std::io::SeekFrom;
use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};
use crate::storage::{ByteStream, RemoteStorage};

pub struct StreamReader {
    stream: ByteStream,
    /// Absolute position of the next byte / 当前读取位置
    offset: u64,
}

impl StreamReader {
    /// Start a download of `[start, end)` / 从指定偏移开始下载
    pub async fn open(storage: &dyn RemoteStorage, path: &str, start: u64) -> Result<Self> {
        tracing::debug!("opening read stream: path={}, start={}", path, start);

        let range = (start > 0).then_some(start);
        let stream = storage.download(path, range).await
            .map_err(|e| Error::transport("couldn't download file", e))?;

        Ok(Self { stream, offset: start })
    }

    /// `Ok(0)` for a non-empty buffer means end of data / 返回0表示读完
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.stream.read(buf).await
            .map_err(|e| Error::transport("couldn't read from stream", e))?;
        self.offset += n as u64;
        Ok(n)
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Target position of a seek. End-relative seeks compute `size - offset`.
pub fn seek_target(pos: SeekFrom, current: u64, size: u64) -> Result<i64> {
    let target = match pos {
        SeekFrom::Start(offset) => i64::try_from(offset).ok(),
        SeekFrom::Current(delta) => i64::try_from(current).ok().and_then(|c| c.checked_add(delta)),
        SeekFrom::End(delta) => i64::try_from(size).ok().and_then(|s| s.checked_sub(delta)),
    };

    match target {
        Some(t) if t >= 0 => Ok(t),
        Some(t) => Err(Error::InvalidSeek(t)),
        None => Err(Error::InvalidSeek(i64::MIN)),
    }
}
