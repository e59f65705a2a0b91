//! Remote file handle / 远程文件句柄
//!
//! A `File` is opened either for reading (range downloads), for writing
//! (one background whole-object upload) or as a directory to enumerate.
//! It is not synchronized: every stateful operation takes `&mut self`, and
//! callers that need parallel access open separate handles.

mod info;
mod pager;
mod reader;
mod writer;

pub use info::{FileInfo, SIMULATED_FILE_MODE};
pub use pager::{DirectoryPager, DIR_LISTING_MAX_LIMIT};
pub use reader::{seek_target, StreamReader};
pub use writer::{StreamWriter, PIPE_CAPACITY};

use std::io::SeekFrom;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::storage::RemoteStorage;

pub struct File {
    storage: Arc<dyn RemoteStorage>,
    name: String,
    dir_list_limit: u32,
    reader: Option<StreamReader>,
    writer: Option<StreamWriter>,
    pager: Option<DirectoryPager>,
    cached_info: Option<FileInfo>,
}

impl File {
    /// A handle with no stream open yet / 创建未打开流的句柄
    pub fn new(storage: Arc<dyn RemoteStorage>, name: impl Into<String>, dir_list_limit: u32) -> Self {
        Self {
            storage,
            name: name.into(),
            dir_list_limit,
            reader: None,
            writer: None,
            pager: None,
            cached_info: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start reading at `start` / 打开读取流
    pub async fn open_read_stream(&mut self, start: u64) -> Result<()> {
        if self.reader.is_some() || self.writer.is_some() {
            return Err(Error::AlreadyOpened);
        }
        self.reader = Some(StreamReader::open(self.storage.as_ref(), &self.name, start).await?);
        Ok(())
    }

    /// Start the background upload; cached metadata is dropped / 打开写入流
    pub fn open_write_stream(&mut self) -> Result<()> {
        if self.writer.is_some() || self.reader.is_some() {
            return Err(Error::AlreadyOpened);
        }
        self.cached_info = None;
        self.writer = Some(StreamWriter::open(self.storage.clone(), &self.name));
        Ok(())
    }

    /// Release the open stream. For writes this waits for the upload and
    /// returns its error, if any.
    pub async fn close(&mut self) -> Result<()> {
        if self.reader.take().is_some() {
            tracing::debug!("read stream closed: path={}", self.name);
            return Ok(());
        }

        if let Some(writer) = self.writer.take() {
            let info = writer.close().await?;
            self.cached_info = Some(info);
            return Ok(());
        }

        Ok(())
    }

    /// Read from the current download; `Ok(0)` marks end of data / 读取
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let reader = self.reader.as_mut().ok_or(Error::ClosedHandle)?;
        reader.read(buf).await
    }

    /// Seek `offset` bytes past the current position, then read. Moves the
    /// shared position, so consecutive calls skip relative to each other.
    pub async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.seek(SeekFrom::Current(relative_offset(offset)?)).await?;
        self.read(buf).await
    }

    /// Reposition a read stream by closing it and downloading again from
    /// the target. A negative target leaves the handle with no stream.
    pub async fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        if self.writer.is_some() {
            return Err(Error::NotSupported);
        }
        let current = match &self.reader {
            Some(reader) => reader.offset(),
            None => return Err(Error::ClosedHandle),
        };

        let size = match pos {
            SeekFrom::End(_) => self.stat().await?.size(),
            _ => 0,
        };
        let target = seek_target(pos, current, size);

        self.reader = None;
        let target = target? as u64;
        tracing::debug!("seek: path={}, from={}, to={}", self.name, current, target);

        self.reader = Some(StreamReader::open(self.storage.as_ref(), &self.name, target).await?);
        Ok(target)
    }

    /// Forward the whole buffer to the upload / 写入
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let writer = self.writer.as_mut().ok_or(Error::ClosedHandle)?;
        writer.write(buf).await
    }

    /// Seek, then write. Seeking is refused while writing, so a write-mode
    /// handle always gets `NotSupported` here.
    pub async fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize> {
        self.seek(SeekFrom::Current(relative_offset(offset)?)).await?;
        self.write(buf).await
    }

    pub async fn write_str(&mut self, s: &str) -> Result<usize> {
        self.write(s.as_bytes()).await
    }

    /// Directory entries. `count <= 0` returns everything in one call,
    /// otherwise up to `count` entries continuing where the last call stopped.
    pub async fn readdir(&mut self, count: i64) -> Result<Vec<FileInfo>> {
        let storage = self.storage.clone();
        if count <= 0 {
            return self.pager().read_all(storage.as_ref()).await;
        }
        self.pager().read_page(storage.as_ref(), count as usize).await
    }

    /// Base names of directory entries, same counting rules as `readdir`
    pub async fn readdir_names(&mut self, count: i64) -> Result<Vec<String>> {
        if count <= 0 {
            let infos = self.readdir(count).await?;
            return Ok(infos.iter().map(|info| pager::base_name(info.name()).to_string()).collect());
        }
        let storage = self.storage.clone();
        self.pager().read_names(storage.as_ref(), count as usize).await
    }

    /// Cached metadata, fetched once when missing / 获取文件信息（带缓存）
    pub async fn stat(&mut self) -> Result<FileInfo> {
        if let Some(info) = &self.cached_info {
            return Ok(info.clone());
        }

        let meta = self.storage.get_metadata(&self.name).await
            .map_err(|e| Error::transport("couldn't stat file", e))?;
        let info = FileInfo::from(meta);
        self.cached_info = Some(info.clone());
        Ok(info)
    }

    /// Writes go straight to the upload, nothing to flush / 无需同步
    pub async fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    /// The remote API has no partial-object mutation / 不支持截断
    pub async fn truncate(&mut self, _size: u64) -> Result<()> {
        Err(Error::NotSupported)
    }

    pub(crate) fn set_cached_info(&mut self, info: FileInfo) {
        self.cached_info = Some(info);
    }

    fn pager(&mut self) -> &mut DirectoryPager {
        let (name, limit) = (&self.name, self.dir_list_limit);
        self.pager.get_or_insert_with(|| DirectoryPager::new(name.clone(), limit))
    }
}

fn relative_offset(offset: u64) -> Result<i64> {
    i64::try_from(offset).map_err(|_| Error::InvalidSeek(i64::MIN))
}

#[cfg(test)]
mod tests;
