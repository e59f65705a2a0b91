use std::sync::Arc;
use anyhow::{anyhow, Result};
use serde_json::Value;

use super::RemoteStorage;
use crate::drivers;

/// Driver factory trait / 驱动工厂 trait
pub trait DriverFactory: Send + Sync {
    /// Driver type name / 驱动类型名称
    fn driver_type(&self) -> &'static str;

    /// 创建驱动实例
    fn create_driver(&self, config: Value) -> Result<Arc<dyn RemoteStorage>>;
}

/// Create a storage driver by type name from its JSON config / 根据类型创建驱动
pub fn create_storage(driver_type: &str, config: Value) -> Result<Arc<dyn RemoteStorage>> {
    let factory = drivers::factories()
        .into_iter()
        .find(|f| f.driver_type() == driver_type)
        .ok_or_else(|| anyhow!("Driver type not found: {}", driver_type))?;

    let storage = factory.create_driver(config)?;
    tracing::info!("Storage driver created: {}", driver_type);
    Ok(storage)
}
