//! # 错误类型
//!
//! 核心层统一使用 `ChatError`，通过 `thiserror` 派生 `Display`/`Error`。
//!
//! ## 错误分类
//! - `NotFound` - 读取不存在的聊天文档
//! - `Io` - 目录或文件的创建、读取、写入、删除失败
//! - `PathViolation` - 标题或目标路径不在聊天根目录下
//! - `IndexOutOfBounds` - 按下标更新消息时越界
//! - `Parse` - 结构化解析失败（消息适配器会在本地恢复，不会抛给用户）
//! - `Backend` - 外部推理后端请求失败
//! - `Config` - 应用配置读写失败
//!
//! 用户取消新建/删除不属于错误，以 `None` / `false` 返回值表示。
//!
//! 错误跨越 IPC 边界时序列化为 `{ kind, message }`，前端据此区分错误类型。

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// 核心层错误类型
#[derive(Debug, Error)]
pub enum ChatError {
    /// 聊天文档不存在
    #[error("聊天不存在: {0}")]
    NotFound(String),

    /// 文件系统操作失败
    #[error("{context}: {source}")]
    Io {
        /// 失败的操作描述（如 "读取聊天文件失败"）
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// 路径安全检查失败：目标不在聊天根目录下
    #[error("安全检查失败：{0} 不在聊天目录下")]
    PathViolation(String),

    /// 消息下标越界
    #[error("消息下标越界: index={index}, len={len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// 结构化解析失败
    #[error("解析失败: {0}")]
    Parse(String),

    /// 推理后端请求失败
    #[error("后端请求失败: {0}")]
    Backend(String),

    /// 应用配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

impl ChatError {
    /// 构造带上下文的 I/O 错误
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// 错误类别名称，供前端区分处理
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "notFound",
            Self::Io { .. } => "io",
            Self::PathViolation(_) => "pathViolation",
            Self::IndexOutOfBounds { .. } => "indexOutOfBounds",
            Self::Parse(_) => "parse",
            Self::Backend(_) => "backend",
            Self::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Tauri command 的错误类型必须实现 `Serialize`，前端收到的是 rejected Promise
impl Serialize for ChatError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChatError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
