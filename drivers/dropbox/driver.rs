//! Dropbox 驱动实现
//!
//! 使用reqwest调用Dropbox HTTP API v2，支持范围下载和流式上传

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::*;
use crate::storage::{ByteStream, ListPage, Metadata, RemoteStorage, UploadStream, WriteMode};

/// Dropbox 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropboxConfig {
    /// OAuth2 access token / 访问令牌
    pub access_token: String,
    /// RPC endpoint base / RPC接口地址
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Content endpoint base (upload/download) / 内容接口地址
    #[serde(default = "default_content_url")]
    pub content_url: String,
    /// RPC request timeout in seconds / 普通请求超时（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Upload/download timeout in seconds / 传输超时（秒）
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_secs: u64,
}

fn default_api_url() -> String { "https://api.dropboxapi.com/2".to_string() }
fn default_content_url() -> String { "https://content.dropboxapi.com/2".to_string() }
fn default_timeout() -> u64 { 60 }
fn default_transfer_timeout() -> u64 { 3600 }

/// Dropbox 驱动
pub struct DropboxDriver {
    config: DropboxConfig,
    client: Client,
    transfer_client: Client,
}

impl DropboxDriver {
    pub fn new(config: DropboxConfig) -> Result<Self> {
        if config.access_token.is_empty() {
            return Err(anyhow!("Dropbox access_token is required"));
        }

        // 普通请求客户端（较短超时）
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("创建HTTP客户端失败")?;

        // 传输专用客户端（长超时）
        let transfer_client = Client::builder()
            .timeout(Duration::from_secs(config.transfer_timeout_secs))
            .connect_timeout(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()
            .context("创建传输客户端失败")?;

        Ok(Self { config, client, transfer_client })
    }

    /// Dropbox addresses the root folder as "" / 根目录为空字符串
    fn api_path(path: &str) -> &str {
        if path == "/" { "" } else { path }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.access_token)
    }

    /// Call an RPC endpoint with a JSON body / 调用RPC接口
    async fn rpc<A, T>(&self, endpoint: &str, arg: &A) -> Result<T>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.config.api_url.trim_end_matches('/'), endpoint);
        tracing::debug!("Dropbox RPC: {}", endpoint);

        let response = self.client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(arg)
            .send()
            .await
            .with_context(|| format!("Dropbox {} 请求失败", endpoint))?;

        let response = check_response(response, endpoint).await?;
        response.json().await
            .with_context(|| format!("解析 Dropbox {} 响应失败", endpoint))
    }

    /// Build a content endpoint request; arguments travel in a header / 构建内容接口请求
    fn content_request<A: Serialize>(&self, endpoint: &str, arg: &A) -> Result<RequestBuilder> {
        let url = format!("{}/{}", self.config.content_url.trim_end_matches('/'), endpoint);
        Ok(self.transfer_client
            .post(&url)
            .header("Authorization", self.bearer())
            .header("Dropbox-API-Arg", api_arg_header(arg)?))
    }
}

/// Serialize header arguments, escaping non-ASCII as HTTP headers require / 序列化头部参数
pub fn api_arg_header<A: Serialize + ?Sized>(arg: &A) -> Result<String> {
    let json = serde_json::to_string(arg)?;
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    Ok(escaped)
}

async fn check_response(response: Response, endpoint: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let summary = serde_json::from_str::<ApiError>(&body)
        .map(|e| e.error_summary)
        .unwrap_or(body);
    Err(anyhow!("Dropbox {} 失败: {} - {}", endpoint, status, summary))
}

#[async_trait]
impl RemoteStorage for DropboxDriver {
    fn name(&self) -> &str {
        "dropbox"
    }

    async fn list_folder(&self, path: &str, limit: Option<u32>) -> Result<ListPage> {
        let arg = ListFolderArg { path: Self::api_path(path), limit };
        let result: ListFolderResult = self.rpc("files/list_folder", &arg).await?;
        Ok(result.into())
    }

    async fn list_folder_continue(&self, cursor: &str) -> Result<ListPage> {
        let arg = ListFolderContinueArg { cursor };
        let result: ListFolderResult = self.rpc("files/list_folder/continue", &arg).await?;
        Ok(result.into())
    }

    async fn download(&self, path: &str, start: Option<u64>) -> Result<ByteStream> {
        tracing::debug!("Dropbox download: {} (起始: {:?})", path, start);

        let mut request = self.content_request("files/download", &PathArg { path })?;
        if let Some(offset) = start.filter(|&s| s > 0) {
            request = request.header("Range", format!("bytes={}-", offset));
        }

        let response = request.send().await.context("Dropbox download 请求失败")?;
        let response = check_response(response, "files/download").await?;
        if start.unwrap_or(0) > 0 && response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(anyhow!("Dropbox download 未返回范围内容: {}", response.status()));
        }

        // 流式返回响应体
        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        });
        Ok(Box::new(tokio_util::io::StreamReader::new(stream)))
    }

    async fn upload(&self, path: &str, mode: WriteMode, body: UploadStream) -> Result<Metadata> {
        tracing::debug!("Dropbox upload: {} ({:?})", path, mode);

        let arg = CommitInfo { path, mode, autorename: false, mute: false };
        let body = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::new(body));

        let response = self.content_request("files/upload", &arg)?
            .header("Content-Type", "application/octet-stream")
            .body(body)
            .send()
            .await
            .context("Dropbox upload 请求失败")?;

        let response = check_response(response, "files/upload").await?;
        let file: DropboxFile = response.json().await.context("解析上传结果失败")?;
        Ok(file.into())
    }

    async fn get_metadata(&self, path: &str) -> Result<Metadata> {
        if Self::api_path(path).is_empty() {
            // get_metadata is not supported for the root folder / 根目录不支持get_metadata
            return Ok(DropboxFolder { name: String::new(), path_display: Some("/".to_string()) }.into());
        }

        let meta: DropboxMetadata = self.rpc("files/get_metadata", &PathArg { path }).await?;
        meta.into_metadata()
            .ok_or_else(|| anyhow!("路径已删除: {}", path))
    }

    async fn create_folder(&self, path: &str) -> Result<Metadata> {
        let arg = CreateFolderArg { path, autorename: false };
        let result: CreateFolderResult = self.rpc("files/create_folder_v2", &arg).await?;
        Ok(result.metadata.into())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let _: RelocationResult = self.rpc("files/delete_v2", &PathArg { path }).await?;
        Ok(())
    }

    async fn move_item(&self, from: &str, to: &str) -> Result<Metadata> {
        let arg = RelocationArg { from_path: from, to_path: to, autorename: false };
        let result: RelocationResult = self.rpc("files/move_v2", &arg).await?;
        result.metadata.into_metadata()
            .ok_or_else(|| anyhow!("移动结果无效: {}", to))
    }
}
