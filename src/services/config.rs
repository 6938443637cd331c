//! # 应用配置读写
//!
//! 配置文件位于 `~/.chatmark/config.json`：
//! - 文件不存在（首次启动）：使用默认配置
//! - 文件无法读取或 JSON 无效：记录警告并使用默认配置，不阻止应用启动
//! - 保存时自动创建配置目录，JSON 使用 2 空格缩进

use std::path::Path;

use crate::error::ChatError;
use crate::models::settings::AppConfig;
use crate::utils::path;

/// 读取应用配置，任何失败都回退到默认配置
pub async fn read_app_config() -> AppConfig {
    match path::get_app_config_path() {
        Ok(config_path) => read_config_from(&config_path).await,
        Err(e) => {
            log::warn!("无法确定配置文件路径，使用默认配置: {}", e);
            AppConfig::default()
        }
    }
}

/// 保存应用配置到 `~/.chatmark/config.json`
pub async fn save_app_config(config: &AppConfig) -> Result<(), ChatError> {
    let config_path = path::get_app_config_path()?;
    save_config_to(&config_path, config).await
}

/// 从指定路径读取配置
pub async fn read_config_from(config_path: &Path) -> AppConfig {
    if !config_path.exists() {
        return AppConfig::default();
    }

    let content = match tokio::fs::read_to_string(config_path).await {
        Ok(content) => content,
        Err(e) => {
            log::warn!("读取配置文件失败，使用默认配置: {}: {}", config_path.display(), e);
            return AppConfig::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("解析配置文件失败，使用默认配置: {}: {}", config_path.display(), e);
            AppConfig::default()
        }
    }
}

/// 保存配置到指定路径，父目录不存在时自动创建
pub async fn save_config_to(config_path: &Path, config: &AppConfig) -> Result<(), ChatError> {
    if let Some(parent) = config_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ChatError::io("创建配置目录失败", e))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ChatError::Config(format!("序列化配置失败: {}", e)))?;

    tokio::fs::write(config_path, content)
        .await
        .map_err(|e| ChatError::io("写入配置文件失败", e))?;

    log::info!("配置已保存: {}", config_path.display());
    Ok(())
}
