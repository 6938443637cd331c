//! # 推理后端接口数据模型
//!
//! 外部推理后端（模型服务、微调、Tensorlink 网络）是独立进程，
//! 本模块只定义其 REST 接口的请求/响应结构：
//! - `GET /models` → `ModelInfo[]`
//! - `GET /status` → `ConnectionStatus`
//! - `POST /chat` → `ChatResponse`
//! - `POST /finetune` → `FineTuneAck`
//! - `GET /finetune/:id` → `FineTuneStatus`
//!
//! `/connect` 与 `/stats` 的响应结构由后端决定，直接以 `serde_json::Value` 透传。

use serde::{Deserialize, Serialize};

use crate::models::message::{Feedback, Role};
use crate::models::settings::ChatSettings;

/// 可用模型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    /// 是否需要先连接 Tensorlink 网络
    #[serde(default)]
    pub requires_tensorlink: bool,
}

impl ModelInfo {
    /// 后端不可用时展示的默认模型列表
    pub fn fallback() -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            name: "Qwen2.5-7B".to_string(),
            requires_tensorlink: true,
        }]
    }
}

/// Tensorlink 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
}

/// 对话历史中的一轮：只保留角色和文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub role: Role,
    pub content: String,
}

/// `POST /chat` 请求体
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub history: &'a [HistoryItem],
    pub settings: &'a ChatSettings,
}

/// `POST /chat` 响应体
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// 微调请求中的单条反馈记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    /// 消息在完整日志中的下标
    pub message_id: usize,
    pub feedback: Feedback,
}

/// `POST /finetune` 请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FineTuneRequest {
    pub model_name: String,
    /// 非 system 角色的全部消息
    pub chat_history: Vec<HistoryItem>,
    pub feedback_data: Vec<FeedbackEntry>,
}

/// `POST /finetune` 响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineTuneAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// 微调任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Processing,
    Completed,
    Failed,
}

/// 微调任务详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineTuningJob {
    pub model: String,
    pub status: JobState,
    pub progress: f64,
    pub created_at: f64,
}

/// `GET /finetune/:id` 响应体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineTuneStatus {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<FineTuningJob>,
}
