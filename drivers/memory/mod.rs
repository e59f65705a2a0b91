//! In-memory storage driver / 内存存储驱动
//!
//! Backs the test suite and lets the CLI run without network access.

mod driver;

pub use driver::{MemoryStorage, UploadFailure, MAX_PAGE_SIZE};

use std::collections::BTreeMap;
use std::sync::Arc;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::storage::{DriverFactory, RemoteStorage};

/// 内存驱动配置
#[derive(Debug, Deserialize)]
struct MemoryConfig {
    #[serde(default = "default_page_size")]
    page_size: usize,
    /// Files to preload: path -> UTF-8 content / 预置文件
    #[serde(default)]
    seed: BTreeMap<String, String>,
}

fn default_page_size() -> usize { MAX_PAGE_SIZE }

/// 内存驱动工厂
pub struct MemoryDriverFactory;

impl DriverFactory for MemoryDriverFactory {
    fn driver_type(&self) -> &'static str {
        "memory"
    }

    fn create_driver(&self, config: Value) -> Result<Arc<dyn RemoteStorage>> {
        let config: MemoryConfig = if config.is_null() {
            serde_json::from_value(serde_json::json!({}))?
        } else {
            serde_json::from_value(config).map_err(|e| anyhow!("配置解析失败: {}", e))?
        };

        let storage = MemoryStorage::with_page_size(config.page_size);
        for (path, content) in config.seed {
            storage.insert_file(&path, content);
        }
        Ok(Arc::new(storage))
    }
}
