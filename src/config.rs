//! Application configuration module / 应用配置模块
//!
//! Loaded from config.json; a default file is written on first run.
//! `DROPBOX_ACCESS_TOKEN` overrides the token stored in the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Environment variable holding the Dropbox token / 令牌环境变量
pub const ACCESS_TOKEN_ENV: &str = "DROPBOX_ACCESS_TOKEN";

/// Application configuration / 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Storage driver configuration / 存储驱动配置
    #[serde(default)]
    pub storage: StorageConfig,
    /// Directory listing configuration / 目录列表配置
    #[serde(default)]
    pub listing: ListingConfig,
}

/// Storage driver configuration / 存储驱动配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Driver type, `dropbox` or `memory` / 驱动类型
    pub driver: String,
    /// Driver specific settings / 驱动配置
    #[serde(default)]
    pub config: Value,
}

/// Directory listing configuration / 目录列表配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListingConfig {
    /// Entries requested per listing page, 0 = server default / 每页条目数
    #[serde(default)]
    pub dir_list_limit: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: "dropbox".to_string(),
            config: serde_json::json!({ "access_token": "" }),
        }
    }
}

impl AppConfig {
    /// Apply environment overrides / 应用环境变量覆盖
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            self.set_access_token(token);
        }
    }

    fn set_access_token(&mut self, token: String) {
        if self.storage.driver != "dropbox" {
            return;
        }
        if !self.storage.config.is_object() {
            self.storage.config = serde_json::json!({});
        }
        if let Some(obj) = self.storage.config.as_object_mut() {
            obj.insert("access_token".to_string(), Value::String(token));
        }
    }
}

/// Default config file path / 获取配置文件路径
pub fn default_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        tracing::info!("Loaded configuration from {:?}", path);
        config
    } else {
        let config = AppConfig::default();
        save_config(path, &config)?;
        tracing::info!("Created default configuration at {:?}", path);
        config
    };

    config.apply_env();
    Ok(config)
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)
        .context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file {:?}", path))?;
    Ok(())
}
