//! # 路径工具函数
//!
//! 提供与文件路径相关的工具函数，包括：
//! - 获取聊天根目录路径（`~/ChatMark/`）
//! - 获取应用配置文件路径（`~/.chatmark/config.json`）
//! - 校验聊天标题，确保标题只能寻址根目录下的文件
//! - 判断对话框选择的路径是否直接位于根目录下

use std::path::{Component, Path, PathBuf};

use crate::error::ChatError;

/// 聊天根目录名（位于用户主目录下）
pub const APP_DIRECTORY_NAME: &str = "ChatMark";

/// 应用配置目录名（位于用户主目录下）
pub const CONFIG_DIRECTORY_NAME: &str = ".chatmark";

/// 应用配置文件名
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 获取聊天根目录的绝对路径
///
/// 所有聊天文档都存储在用户主目录下的 `ChatMark` 文件夹中。
/// 使用 `dirs` crate 获取跨平台的主目录路径。
///
/// # 示例
/// - Windows: `C:\Users\username\ChatMark`
/// - Linux/macOS: `/home/username/ChatMark`
///
/// # 错误
/// 如果无法确定用户主目录（如无 HOME 环境变量），返回错误
pub fn get_chats_root() -> Result<PathBuf, ChatError> {
    let home = dirs::home_dir().ok_or_else(|| ChatError::Config("无法获取用户主目录".into()))?;
    Ok(home.join(APP_DIRECTORY_NAME))
}

/// 获取应用配置文件的绝对路径（`~/.chatmark/config.json`）
///
/// 配置独立存储在 `~/.chatmark/` 下，不与聊天文档混在一起，
/// 否则 `config.json` 会被当作一个聊天列出。
pub fn get_app_config_path() -> Result<PathBuf, ChatError> {
    let home = dirs::home_dir().ok_or_else(|| ChatError::Config("无法获取用户主目录".into()))?;
    Ok(home.join(CONFIG_DIRECTORY_NAME).join(CONFIG_FILE_NAME))
}

/// 校验聊天标题
///
/// 标题直接拼接成 `<root>/<title>.<ext>`，因此必须是单个普通路径组件：
/// 非空、不含路径分隔符、不是 `.` 或 `..`、不含 NUL 字符。
///
/// # 错误
/// 标题不合法时返回 `PathViolation`
pub fn validate_title(title: &str) -> Result<(), ChatError> {
    let violation = || ChatError::PathViolation(title.to_string());

    if title.trim().is_empty() || title.contains(['/', '\\', '\0']) {
        return Err(violation());
    }

    let mut components = Path::new(title).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(violation()),
    }
}

/// 判断 `path` 是否直接位于 `root` 目录下（不含子目录）
///
/// 使用 `tokio::fs::canonicalize` 解析父目录的符号链接和 `..` 等组件，
/// 目标文件本身可以尚不存在。任何一侧无法解析时视为不在根目录下。
pub async fn is_directly_under(root: &Path, path: &Path) -> bool {
    let Some(parent) = path.parent() else {
        return false;
    };

    match tokio::join!(
        tokio::fs::canonicalize(parent),
        tokio::fs::canonicalize(root)
    ) {
        (Ok(parent), Ok(root)) => parent == root,
        _ => false,
    }
}
