//! Filesystem entry point / 文件系统入口
//!
//! Thin layer over a `RemoteStorage`: opens handles in the right mode and
//! forwards the path-level operations.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::file::{File, FileInfo};
use crate::storage::RemoteStorage;

/// How a handle is opened / 打开模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Replace the object with whatever gets written / 覆盖写入
    Write,
}

#[derive(Clone)]
pub struct Fs {
    storage: Arc<dyn RemoteStorage>,
    dir_list_limit: u32,
}

impl Fs {
    pub fn new(storage: Arc<dyn RemoteStorage>) -> Self {
        Self { storage, dir_list_limit: 0 }
    }

    /// Page size requested from the server by `readdir`; 0 uses the server default
    pub fn with_dir_list_limit(mut self, limit: u32) -> Self {
        self.dir_list_limit = limit;
        self
    }

    pub fn name(&self) -> &str {
        self.storage.name()
    }

    /// Open for reading. Folders get a handle without a stream for `readdir`.
    pub async fn open(&self, name: &str) -> Result<File> {
        self.open_file(name, OpenMode::Read).await
    }

    /// Open for writing; the upload starts immediately / 创建文件
    pub async fn create(&self, name: &str) -> Result<File> {
        self.open_file(name, OpenMode::Write).await
    }

    pub async fn open_file(&self, name: &str, mode: OpenMode) -> Result<File> {
        let mut file = File::new(self.storage.clone(), name, self.dir_list_limit);

        match mode {
            OpenMode::Write => file.open_write_stream()?,
            OpenMode::Read => {
                let info = self.stat(name).await?;
                let is_dir = info.is_dir();
                file.set_cached_info(info);
                if !is_dir {
                    file.open_read_stream(0).await?;
                }
            }
        }

        Ok(file)
    }

    pub async fn stat(&self, name: &str) -> Result<FileInfo> {
        let meta = self.storage.get_metadata(name).await
            .map_err(|e| Error::transport("couldn't stat file", e))?;
        Ok(FileInfo::from(meta))
    }

    pub async fn mkdir(&self, name: &str) -> Result<FileInfo> {
        let meta = self.storage.create_folder(name).await
            .map_err(|e| Error::transport("couldn't create folder", e))?;
        Ok(FileInfo::from(meta))
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        self.storage.delete(name).await
            .map_err(|e| Error::transport("couldn't delete file", e))
    }

    pub async fn rename(&self, from: &str, to: &str) -> Result<FileInfo> {
        let meta = self.storage.move_item(from, to).await
            .map_err(|e| Error::transport("couldn't move file", e))?;
        tracing::debug!("moved: from={}, to={}", from, meta.path_display());
        Ok(FileInfo::from(meta))
    }
}
