//! File handle errors / 文件句柄错误

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// The remote API cannot express the operation / 不支持的操作
    #[error("operation not supported")]
    NotSupported,

    #[error("stream already opened")]
    AlreadyOpened,

    #[error("invalid seek offset: {0}")]
    InvalidSeek(i64),

    #[error("file already closed")]
    ClosedHandle,

    /// The upload task ended without reporting a result / 上传任务未返回结果
    #[error("upload task ended without a result")]
    UploadInterrupted,

    /// Failure from the remote client, annotated with the operation / 远程调用失败
    #[error("{context}: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: BoxError,
    },
}

impl Error {
    pub fn transport(context: &'static str, source: impl Into<BoxError>) -> Self {
        Error::Transport { context, source: source.into() }
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, Error::NotSupported)
    }
}
