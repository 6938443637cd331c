//! # 推理后端客户端
//!
//! 通过 HTTP 访问外部推理后端（模型列表、Tensorlink 连接、对话、微调）。
//! 后端是独立进程，本模块只负责请求的发送与响应的解析：
//! - 非 2xx 响应转换为 `ChatError::Backend`，携带状态码和响应正文
//! - 模型列表获取失败时回退到默认模型，不向上传递错误
//! - 默认不设请求超时；可通过配置 `requestTimeoutSecs` 启用

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ChatError;
use crate::models::backend::{
    ChatRequest, ChatResponse, ConnectionStatus, FineTuneAck, FineTuneRequest, FineTuneStatus,
    HistoryItem, ModelInfo,
};
use crate::models::settings::{AppConfig, ChatSettings};

/// 对话补全接口
///
/// `Conversation::send` 只依赖此接口，测试中可以替换为本地实现。
pub trait ChatBackend: Send + Sync {
    /// 发送一条消息及其之前的对话历史，返回助手回复文本
    fn complete(
        &self,
        message: &str,
        history: &[HistoryItem],
        settings: &ChatSettings,
    ) -> impl Future<Output = Result<String, ChatError>> + Send;
}

/// 推理后端 HTTP 客户端
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: Client,
}

/// 检查响应状态并解析 JSON 正文
async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ChatError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ChatError::Backend(format!("{} - {}", status, body)));
    }
    Ok(response.json::<T>().await?)
}

impl BackendClient {
    /// 创建客户端
    ///
    /// # 参数
    /// - `base_url`: 后端基础地址，如 `http://127.0.0.1:5053/api`
    /// - `timeout`: 请求超时；`None` 表示不设超时
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ChatError> {
        let mut builder = Client::builder().user_agent(concat!("chatmark/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ChatError::Backend(format!("创建 HTTP 客户端失败: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        log::info!("推理后端地址: {}", base_url);

        Ok(Self { base_url, http })
    }

    /// 按应用配置创建客户端
    pub fn from_config(config: &AppConfig) -> Result<Self, ChatError> {
        Self::new(
            config.backend_url.clone(),
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ChatError> {
        let response = self.http.get(self.url(path)).send().await?;
        parse_json(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ChatError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        parse_json(response).await
    }

    /// 可用模型列表；请求失败时返回默认模型
    pub async fn models(&self) -> Vec<ModelInfo> {
        match self.get_json::<Vec<ModelInfo>>("models").await {
            Ok(models) => models,
            Err(e) => {
                log::warn!("获取模型列表失败，使用默认模型: {}", e);
                ModelInfo::fallback()
            }
        }
    }

    /// Tensorlink 连接状态
    pub async fn status(&self) -> Result<ConnectionStatus, ChatError> {
        self.get_json("status").await
    }

    /// 连接 Tensorlink 网络
    pub async fn connect(&self) -> Result<Value, ChatError> {
        self.get_json("connect").await
    }

    /// Tensorlink 网络统计
    pub async fn stats(&self) -> Result<Value, ChatError> {
        self.get_json("stats").await
    }

    /// 发送对话请求
    pub async fn chat(
        &self,
        message: &str,
        history: &[HistoryItem],
        settings: &ChatSettings,
    ) -> Result<ChatResponse, ChatError> {
        let request = ChatRequest {
            message,
            history,
            settings,
        };
        self.post_json("chat", &request).await
    }

    /// 提交微调任务
    pub async fn start_fine_tune(&self, request: &FineTuneRequest) -> Result<FineTuneAck, ChatError> {
        log::info!(
            "提交微调任务: model={}, turns={}, feedback={}",
            request.model_name,
            request.chat_history.len(),
            request.feedback_data.len()
        );
        self.post_json("finetune", request).await
    }

    /// 查询微调任务状态
    pub async fn fine_tune_status(&self, job_id: &str) -> Result<FineTuneStatus, ChatError> {
        if job_id.trim().is_empty() || job_id.contains('/') {
            return Err(ChatError::Backend(format!("无效的任务 ID: {:?}", job_id)));
        }
        self.get_json(&format!("finetune/{}", job_id)).await
    }
}

impl ChatBackend for BackendClient {
    async fn complete(
        &self,
        message: &str,
        history: &[HistoryItem],
        settings: &ChatSettings,
    ) -> Result<String, ChatError> {
        Ok(self.chat(message, history, settings).await?.response)
    }
}
