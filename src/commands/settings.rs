//! # 设置和配置 Tauri Commands
//!
//! 提供应用配置的读写 Tauri command 处理函数：
//! - `get_chats_root` - 获取聊天根目录 `~/ChatMark/` 路径
//! - `read_app_config` / `save_app_config` - 读写 `~/.chatmark/config.json`

use tauri::State;

use crate::commands::AppState;
use crate::error::ChatError;
use crate::models::settings::AppConfig;
use crate::services::config;

/// 获取聊天根目录的绝对路径
#[tauri::command]
pub async fn get_chats_root(state: State<'_, AppState>) -> Result<String, ChatError> {
    Ok(state.files.root().to_string_lossy().to_string())
}

/// 读取当前生效的应用配置
#[tauri::command]
pub async fn read_app_config(state: State<'_, AppState>) -> Result<AppConfig, ChatError> {
    Ok(state.config())
}

/// 保存应用配置
///
/// 写入配置文件并更新内存中的配置。默认聊天设置立即生效；
/// 文档格式、后端地址、自动保存间隔在下次启动时生效。
///
/// # 错误
/// 配置目录创建失败或文件写入失败时返回错误
#[tauri::command]
pub async fn save_app_config(
    config: AppConfig,
    state: State<'_, AppState>,
) -> Result<(), ChatError> {
    config::save_app_config(&config).await?;
    if let Ok(mut current) = state.config.write() {
        *current = config;
    }
    Ok(())
}
