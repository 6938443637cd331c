//! # 应用配置与聊天设置数据模型
//!
//! 定义了应用配置（AppConfig）、文档格式（DocumentFormat）以及随每次对话请求
//! 发送给后端的聊天设置（ChatSettings）。
//!
//! 应用配置存储在 `~/.chatmark/config.json`，与聊天根目录 `~/ChatMark/` 分离，
//! 避免配置文件被当作聊天文档列出。

use serde::{Deserialize, Serialize};

/// 推理后端的默认地址
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5053/api";

/// 自动保存节流窗口的默认长度（毫秒）
pub const DEFAULT_AUTO_SAVE_INTERVAL_MS: u64 = 3000;

/// 聊天文档的存储格式
///
/// 决定文件扩展名以及消息适配器的编码方式：
/// - `Json`：`<title>.json`，内容为 Message 数组
/// - `Markdown`：`<title>.md`，内容为 `**role**: content` 分块文本（旧版部署）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Json,
    Markdown,
}

impl DocumentFormat {
    /// 文档文件扩展名（不含点）
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Json => "json",
            DocumentFormat::Markdown => "md",
        }
    }

    /// 新建聊天时写入的空文档内容
    pub fn empty_document(&self) -> &'static str {
        match self {
            DocumentFormat::Json => "[]",
            DocumentFormat::Markdown => "",
        }
    }

    /// 保存对话框中显示的文件类型名称
    pub fn filter_name(&self) -> &'static str {
        match self {
            DocumentFormat::Json => "JSON",
            DocumentFormat::Markdown => "Markdown",
        }
    }
}

/// 随对话请求发送给后端的聊天设置
///
/// 对应前端 TypeScript 接口：
/// ```typescript
/// interface ChatSettings {
///   modelName?: string;
///   temperature: number;
///   maxTokens: number;
///   isTensorlinkConnected: boolean;
///   isModelInitialized: boolean;
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    pub temperature: f32,

    pub max_tokens: u32,

    #[serde(default)]
    pub is_tensorlink_connected: bool,

    #[serde(default)]
    pub is_model_initialized: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model_name: Some("default-model".to_string()),
            temperature: 0.7,
            max_tokens: 1024,
            is_tensorlink_connected: false,
            is_model_initialized: false,
        }
    }
}

/// 应用配置
///
/// 所有字段都有默认值，配置文件中缺失的字段自动补齐，
/// 旧版本写出的配置文件可以直接读取。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// 推理后端的基础地址（如 `http://127.0.0.1:5053/api`）
    pub backend_url: String,

    /// 自动保存节流窗口（毫秒）
    pub auto_save_interval_ms: u64,

    /// 聊天文档格式
    pub document_format: DocumentFormat,

    /// 后端请求超时（秒）；为 `None` 时不设超时，沿用传输层默认行为
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// 新对话使用的默认聊天设置
    pub chat_settings: ChatSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            auto_save_interval_ms: DEFAULT_AUTO_SAVE_INTERVAL_MS,
            document_format: DocumentFormat::default(),
            request_timeout_secs: None,
            chat_settings: ChatSettings::default(),
        }
    }
}
