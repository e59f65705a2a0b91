//! 内存存储驱动实现
//!
//! Keeps every object in process memory and mimics the remote API contract:
//! whole-object uploads, offset downloads and cursor paginated listings.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tokio::io::AsyncReadExt;

use crate::storage::{
    ByteStream, FileMetadata, FolderMetadata, ListPage, Metadata, RemoteStorage, UploadStream,
    WriteMode,
};

/// Largest page a listing call returns / 单页最大条目数
pub const MAX_PAGE_SIZE: usize = 2000;

/// Injected upload failure / 注入的上传失败
#[derive(Debug, Clone)]
pub enum UploadFailure {
    /// Fail before consuming the body, dropping the stream early / 读取前失败
    BeforeRead(String),
    /// Fail after the whole body has been consumed / 读取完毕后失败
    AfterRead(String),
}

#[derive(Debug, Clone)]
enum Node {
    File {
        data: Bytes,
        modified: DateTime<Utc>,
        rev: u64,
    },
    Folder,
}

#[derive(Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    calls: HashMap<&'static str, usize>,
    next_rev: u64,
    upload_failure: Option<UploadFailure>,
    download_failure: Option<String>,
    list_continue_failure: Option<String>,
}

/// In-memory remote storage / 内存存储
pub struct MemoryStorage {
    page_size: usize,
    state: Mutex<State>,
}

/// Root is "", everything else "/a/b" without a trailing slash / 规范化路径
fn normalize(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_page_size(MAX_PAGE_SIZE)
    }

    /// Server-side page size, clamped to `1..=MAX_PAGE_SIZE` / 设置分页大小
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            state: Mutex::new(State::default()),
        }
    }

    /// Store a file, creating missing parent folders / 写入文件
    pub fn insert_file(&self, path: &str, data: impl Into<Bytes>) -> Metadata {
        let mut state = self.state.lock();
        Self::put_file(&mut state, &normalize(path), data.into())
    }

    /// Create a folder and its parents / 创建目录
    pub fn insert_folder(&self, path: &str) {
        let mut state = self.state.lock();
        Self::ensure_folders(&mut state, &normalize(path));
    }

    /// Current content of a file / 读取文件内容
    pub fn contents(&self, path: &str) -> Option<Bytes> {
        match self.state.lock().nodes.get(&normalize(path)) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    /// How many times an operation was called / 调用次数
    pub fn calls(&self, op: &str) -> usize {
        self.state.lock().calls.get(op).copied().unwrap_or(0)
    }

    pub fn fail_next_upload(&self, failure: UploadFailure) {
        self.state.lock().upload_failure = Some(failure);
    }

    pub fn fail_next_download(&self, message: &str) {
        self.state.lock().download_failure = Some(message.to_string());
    }

    pub fn fail_next_list_continue(&self, message: &str) {
        self.state.lock().list_continue_failure = Some(message.to_string());
    }

    fn record(&self, op: &'static str) {
        *self.state.lock().calls.entry(op).or_insert(0) += 1;
    }

    fn ensure_folders(state: &mut State, path: &str) {
        let mut current = path;
        while !current.is_empty() {
            state.nodes.entry(current.to_string()).or_insert(Node::Folder);
            current = parent_of(current);
        }
    }

    fn put_file(state: &mut State, path: &str, data: Bytes) -> Metadata {
        Self::ensure_folders(state, parent_of(path));
        state.next_rev += 1;
        let node = Node::File {
            data,
            modified: Utc::now().trunc_subsecs(0),
            rev: state.next_rev,
        };
        state.nodes.insert(path.to_string(), node.clone());
        Self::metadata(path, &node)
    }

    fn metadata(path: &str, node: &Node) -> Metadata {
        match node {
            Node::File { data, modified, rev } => Metadata::File(FileMetadata {
                name: base_name(path).to_string(),
                path_display: path.to_string(),
                size: data.len() as u64,
                client_modified: *modified,
                server_modified: *modified,
                rev: Some(format!("{:09x}", rev)),
            }),
            Node::Folder => Metadata::Folder(FolderMetadata {
                name: base_name(path).to_string(),
                path_display: if path.is_empty() { "/".to_string() } else { path.to_string() },
            }),
        }
    }

    /// Build the page starting at `start` / 构建一页
    fn page(&self, folder: &str, start: usize, page_size: usize) -> Result<ListPage> {
        let state = self.state.lock();
        if !folder.is_empty() {
            match state.nodes.get(folder) {
                Some(Node::Folder) => {}
                Some(Node::File { .. }) => return Err(anyhow!("path/not_folder/: {}", folder)),
                None => return Err(anyhow!("path/not_found/: {}", folder)),
            }
        }

        let children: Vec<Metadata> = state.nodes.iter()
            .filter(|(path, _)| parent_of(path) == folder)
            .map(|(path, node)| Self::metadata(path, node))
            .collect();

        let end = (start + page_size).min(children.len());
        let entries = children.get(start..end).map(<[Metadata]>::to_vec).unwrap_or_default();

        Ok(ListPage {
            entries,
            cursor: format!("{}|{}|{}", page_size, end, folder),
            has_more: end < children.len(),
        })
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStorage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_folder(&self, path: &str, limit: Option<u32>) -> Result<ListPage> {
        self.record("list_folder");
        let page_size = limit
            .map(|l| (l as usize).clamp(1, self.page_size))
            .unwrap_or(self.page_size);
        self.page(&normalize(path), 0, page_size)
    }

    async fn list_folder_continue(&self, cursor: &str) -> Result<ListPage> {
        self.record("list_folder_continue");
        if let Some(message) = self.state.lock().list_continue_failure.take() {
            return Err(anyhow!(message));
        }
        let mut parts = cursor.splitn(3, '|');
        let (page_size, start, folder) = match (parts.next(), parts.next(), parts.next()) {
            (Some(size), Some(start), Some(folder)) => (size.parse::<usize>()?, start.parse::<usize>()?, folder),
            _ => return Err(anyhow!("invalid cursor: {}", cursor)),
        };
        self.page(folder, start, page_size)
    }

    async fn download(&self, path: &str, start: Option<u64>) -> Result<ByteStream> {
        self.record("download");
        let mut state = self.state.lock();
        if let Some(message) = state.download_failure.take() {
            return Err(anyhow!(message));
        }

        let path = normalize(path);
        let data = match state.nodes.get(&path) {
            Some(Node::File { data, .. }) => data.clone(),
            Some(Node::Folder) => return Err(anyhow!("path/not_file/: {}", path)),
            None => return Err(anyhow!("path/not_found/: {}", path)),
        };

        let start = start.unwrap_or(0);
        if start > data.len() as u64 {
            return Err(anyhow!("range not satisfiable: {} > {}", start, data.len()));
        }
        Ok(Box::new(std::io::Cursor::new(data.slice(start as usize..))))
    }

    async fn upload(&self, path: &str, mode: WriteMode, mut body: UploadStream) -> Result<Metadata> {
        self.record("upload");
        let failure = self.state.lock().upload_failure.take();
        if let Some(UploadFailure::BeforeRead(message)) = &failure {
            return Err(anyhow!(message.clone()));
        }

        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;

        if let Some(UploadFailure::AfterRead(message)) = &failure {
            return Err(anyhow!(message.clone()));
        }

        let path = normalize(path);
        let mut state = self.state.lock();
        match (state.nodes.get(&path), mode) {
            (Some(Node::Folder), _) => return Err(anyhow!("path/conflict/folder/: {}", path)),
            (Some(Node::File { .. }), WriteMode::Add) => return Err(anyhow!("path/conflict/file/: {}", path)),
            _ => {}
        }
        Ok(Self::put_file(&mut state, &path, Bytes::from(data)))
    }

    async fn get_metadata(&self, path: &str) -> Result<Metadata> {
        self.record("get_metadata");
        let path = normalize(path);
        if path.is_empty() {
            return Ok(Self::metadata(&path, &Node::Folder));
        }
        let state = self.state.lock();
        state.nodes.get(&path)
            .map(|node| Self::metadata(&path, node))
            .ok_or_else(|| anyhow!("path/not_found/: {}", path))
    }

    async fn create_folder(&self, path: &str) -> Result<Metadata> {
        self.record("create_folder");
        let path = normalize(path);
        let mut state = self.state.lock();
        if path.is_empty() || state.nodes.contains_key(&path) {
            return Err(anyhow!("path/conflict/: {}", path));
        }
        Self::ensure_folders(&mut state, &path);
        Ok(Self::metadata(&path, &Node::Folder))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.record("delete");
        let path = normalize(path);
        let mut state = self.state.lock();
        if state.nodes.remove(&path).is_none() {
            return Err(anyhow!("path_lookup/not_found/: {}", path));
        }
        state.nodes.retain(|key, _| !is_descendant(key, &path));
        Ok(())
    }

    async fn move_item(&self, from: &str, to: &str) -> Result<Metadata> {
        self.record("move_item");
        let (from, to) = (normalize(from), normalize(to));
        let mut state = self.state.lock();
        if !state.nodes.contains_key(&from) {
            return Err(anyhow!("from_lookup/not_found/: {}", from));
        }
        if state.nodes.contains_key(&to) || to.is_empty() || is_descendant(&to, &from) {
            return Err(anyhow!("to/conflict/: {}", to));
        }

        let moved: Vec<String> = state.nodes.keys()
            .filter(|key| **key == from || is_descendant(key, &from))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = state.nodes.remove(&key) {
                let target = format!("{}{}", to, &key[from.len()..]);
                state.nodes.insert(target, node);
            }
        }
        Self::ensure_folders(&mut state, parent_of(&to));

        let node = state.nodes.get(&to).cloned().unwrap_or(Node::Folder);
        Ok(Self::metadata(&to, &node))
    }
}
