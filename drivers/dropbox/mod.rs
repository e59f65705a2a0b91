//! Dropbox 网络存储驱动

mod driver;
mod types;

pub use driver::{DropboxConfig, DropboxDriver};

use std::sync::Arc;
use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::storage::{DriverFactory, RemoteStorage};

/// Dropbox 驱动工厂
pub struct DropboxDriverFactory;

impl DriverFactory for DropboxDriverFactory {
    fn driver_type(&self) -> &'static str {
        "dropbox"
    }

    fn create_driver(&self, config: Value) -> Result<Arc<dyn RemoteStorage>> {
        let config: DropboxConfig = serde_json::from_value(config)
            .map_err(|e| anyhow!("配置解析失败: {}", e))?;
        Ok(Arc::new(DropboxDriver::new(config)?))
    }
}
