//! Dropbox API v2 wire types / Dropbox API 数据结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{FileMetadata, FolderMetadata, ListPage, Metadata, WriteMode};

// ============ 请求参数 ============

#[derive(Debug, Serialize)]
pub struct ListFolderArg<'a> {
    pub path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ListFolderContinueArg<'a> {
    pub cursor: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PathArg<'a> {
    pub path: &'a str,
}

/// Upload commit info / 上传提交参数
#[derive(Debug, Serialize)]
pub struct CommitInfo<'a> {
    pub path: &'a str,
    pub mode: WriteMode,
    pub autorename: bool,
    pub mute: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateFolderArg<'a> {
    pub path: &'a str,
    pub autorename: bool,
}

#[derive(Debug, Serialize)]
pub struct RelocationArg<'a> {
    pub from_path: &'a str,
    pub to_path: &'a str,
    pub autorename: bool,
}

// ============ 响应结构 ============

/// API错误
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub error_summary: String,
}

#[derive(Debug, Deserialize)]
pub struct DropboxFile {
    pub name: String,
    pub path_display: Option<String>,
    pub size: u64,
    pub client_modified: DateTime<Utc>,
    pub server_modified: DateTime<Utc>,
    pub rev: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DropboxFolder {
    pub name: String,
    pub path_display: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DropboxDeleted {
    #[allow(dead_code)]
    pub name: String,
}

/// Tagged metadata as returned by listing and metadata calls / 带标签的元数据
#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
pub enum DropboxMetadata {
    File(DropboxFile),
    Folder(DropboxFolder),
    Deleted(DropboxDeleted),
}

#[derive(Debug, Deserialize)]
pub struct ListFolderResult {
    pub entries: Vec<DropboxMetadata>,
    pub cursor: String,
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderResult {
    pub metadata: DropboxFolder,
}

#[derive(Debug, Deserialize)]
pub struct RelocationResult {
    pub metadata: DropboxMetadata,
}

impl From<DropboxFile> for Metadata {
    fn from(file: DropboxFile) -> Self {
        let path_display = file.path_display.unwrap_or_else(|| file.name.clone());
        Metadata::File(FileMetadata {
            name: file.name,
            path_display,
            size: file.size,
            client_modified: file.client_modified,
            server_modified: file.server_modified,
            rev: file.rev,
        })
    }
}

impl From<DropboxFolder> for Metadata {
    fn from(folder: DropboxFolder) -> Self {
        let path_display = folder.path_display.unwrap_or_else(|| folder.name.clone());
        Metadata::Folder(FolderMetadata {
            name: folder.name,
            path_display,
        })
    }
}

impl DropboxMetadata {
    /// Deleted entries have no storage counterpart / 已删除条目返回None
    pub fn into_metadata(self) -> Option<Metadata> {
        match self {
            DropboxMetadata::File(file) => Some(file.into()),
            DropboxMetadata::Folder(folder) => Some(folder.into()),
            DropboxMetadata::Deleted(_) => None,
        }
    }
}

impl From<ListFolderResult> for ListPage {
    fn from(result: ListFolderResult) -> Self {
        ListPage {
            entries: result.entries.into_iter().filter_map(DropboxMetadata::into_metadata).collect(),
            cursor: result.cursor,
            has_more: result.has_more,
        }
    }
}
