use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

/// Downloaded byte stream / 下载字节流
pub type ByteStream = Box<dyn AsyncRead + Unpin + Send>;

/// Upload body; `Sync` so HTTP drivers can wrap it as a request body / 上传字节流
pub type UploadStream = Box<dyn AsyncRead + Unpin + Send + Sync>;

/// Remote file metadata / 远程文件元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub path_display: String,
    pub size: u64,
    /// Modification time reported by the uploading client / 客户端修改时间
    pub client_modified: DateTime<Utc>,
    pub server_modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
}

/// Remote folder metadata / 远程目录元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMetadata {
    pub name: String,
    pub path_display: String,
}

/// Metadata of one remote object, tagged by kind / 远程对象元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Metadata {
    File(FileMetadata),
    Folder(FolderMetadata),
}

impl Metadata {
    pub fn name(&self) -> &str {
        match self {
            Metadata::File(file) => &file.name,
            Metadata::Folder(folder) => &folder.name,
        }
    }

    pub fn path_display(&self) -> &str {
        match self {
            Metadata::File(file) => &file.path_display,
            Metadata::Folder(folder) => &folder.path_display,
        }
    }
}

/// One page of a folder listing / 目录分页结果
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<Metadata>,
    /// Continuation token for the next page / 下一页游标
    pub cursor: String,
    pub has_more: bool,
}

/// Conflict behaviour of an upload / 上传冲突策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Fail if the path already exists / 已存在则失败
    Add,
    /// Replace any existing object / 覆盖
    Overwrite,
}

/// Remote object storage interface (primitive operations only) / 远程对象存储接口
///
/// Objects can only be uploaded whole and downloaded from an offset to the end;
/// listings are cursor paginated.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Driver name / 驱动名称
    fn name(&self) -> &str;

    /// First page of a folder listing / 列出目录第一页
    async fn list_folder(&self, path: &str, limit: Option<u32>) -> Result<ListPage>;

    /// Next page of a listing started by `list_folder` / 继续列出目录
    async fn list_folder_continue(&self, cursor: &str) -> Result<ListPage>;

    /// Download bytes `[start, end)`; `None` downloads the whole object / 范围下载
    async fn download(&self, path: &str, start: Option<u64>) -> Result<ByteStream>;

    /// Upload a whole object from a stream / 整体上传
    async fn upload(&self, path: &str, mode: WriteMode, body: UploadStream) -> Result<Metadata>;

    /// Fetch metadata of a single path / 获取元数据
    async fn get_metadata(&self, path: &str) -> Result<Metadata>;

    /// Create directory / 创建目录
    async fn create_folder(&self, path: &str) -> Result<Metadata>;

    /// Delete file or directory / 删除文件或目录
    async fn delete(&self, path: &str) -> Result<()>;

    /// Move file or directory / 移动文件或目录
    async fn move_item(&self, from: &str, to: &str) -> Result<Metadata>;
}

pub mod factory;

pub use factory::{create_storage, DriverFactory};
