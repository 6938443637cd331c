//! # 推理后端 Commands
//!
//! 前端通过这些 command 间接访问推理后端，请求统一由 `BackendClient` 发出：
//! - `fetch_models` - 模型列表（失败时返回默认模型）
//! - `backend_status` / `connect_tensorlink` / `tensorlink_stats` - Tensorlink 网络
//! - `start_fine_tune` / `fine_tune_status` - 基于当前对话和反馈的微调
//!
//! 连接和微调的结果以 system 消息写入聊天，前端随后通过 `chat_messages` 刷新。

use serde_json::Value;
use tauri::{AppHandle, Manager, State};

use crate::commands::AppState;
use crate::error::ChatError;
use crate::models::backend::{ConnectionStatus, FineTuneAck, FineTuneStatus, ModelInfo};
use crate::services::conversation::FINE_TUNE_POLL_INTERVAL;

#[tauri::command]
pub async fn fetch_models(state: State<'_, AppState>) -> Result<Vec<ModelInfo>, ChatError> {
    Ok(state.backend.models().await)
}

#[tauri::command]
pub async fn backend_status(state: State<'_, AppState>) -> Result<ConnectionStatus, ChatError> {
    state.backend.status().await
}

/// 连接 Tensorlink；成功时在内存配置中记录连接状态
#[tauri::command]
pub async fn connect_tensorlink(state: State<'_, AppState>) -> Result<bool, ChatError> {
    let was_connected = state.config().chat_settings.is_tensorlink_connected;
    let connected = state
        .conversation
        .connect_tensorlink(&state.backend, was_connected)
        .await?;
    if connected {
        if let Ok(mut config) = state.config.write() {
            config.chat_settings.is_tensorlink_connected = true;
        }
    }
    Ok(connected)
}

#[tauri::command]
pub async fn tensorlink_stats(state: State<'_, AppState>) -> Result<Value, ChatError> {
    state.backend.stats().await
}

/// 以当前对话和反馈提交微调任务
///
/// 后端返回任务 ID 时在后台每 5 秒轮询一次，完成后向提交任务的聊天追加完成消息。
///
/// # 参数
/// - `model_name` - 微调的基础模型；为空时使用配置中的默认模型
///
/// # 返回值
/// 未选中聊天或提交失败时返回 `None`（失败消息已写入聊天）
#[tauri::command]
pub async fn start_fine_tune(
    model_name: Option<String>,
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<Option<FineTuneAck>, ChatError> {
    let model_name = model_name
        .or_else(|| state.config().chat_settings.model_name)
        .ok_or_else(|| ChatError::Config("未指定微调模型".into()))?;
    let ack = state
        .conversation
        .start_fine_tune(model_name, &state.backend)
        .await?;

    if let Some(job_id) = ack.as_ref().and_then(|ack| ack.job_id.clone()) {
        tauri::async_runtime::spawn(async move {
            let state = app.state::<AppState>();
            state
                .conversation
                .watch_fine_tune(&job_id, &state.backend, FINE_TUNE_POLL_INTERVAL)
                .await;
        });
    }
    Ok(ack)
}

#[tauri::command]
pub async fn fine_tune_status(
    job_id: String,
    state: State<'_, AppState>,
) -> Result<FineTuneStatus, ChatError> {
    state.conversation.check_fine_tune(&job_id, &state.backend).await
}
