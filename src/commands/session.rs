//! # 聊天会话 Commands
//!
//! 聊天界面使用的 command，全部经过 `ChatStore` / `AutoSaver` / `Conversation`：
//! - 目录：`list_chats` / `refresh_chats`
//! - 选中：`select_chat` / `select_chat_at` / `selected_chat`
//! - 变更：`new_chat` / `delete_selected_chat` / `clear_chat`
//! - 编辑器：`editor_input` / `editor_blur`
//! - 对话：`chat_messages` / `append_message` / `append_messages` / `update_message` / `send_message`
//! - 导出：`export_chat`
//!
//! 切换、新建选中聊天之前先立即保存待执行的自动保存，
//! 避免窗口结束时把上一个聊天的内容写进新选中的聊天。

use tauri::State;

use crate::commands::AppState;
use crate::error::ChatError;
use crate::models::chat::{ChatInfo, SelectedChat};
use crate::models::message::{Message, MessagePatch};
use crate::models::settings::ChatSettings;
use crate::services::conversation::SendOutcome;
use crate::services::markdown::{self, ExportFormat};

/// 聊天目录（必要时先加载）
#[tauri::command]
pub async fn list_chats(state: State<'_, AppState>) -> Result<Vec<ChatInfo>, ChatError> {
    state.store.chats().await
}

/// 从磁盘重新加载聊天目录
#[tauri::command]
pub async fn refresh_chats(state: State<'_, AppState>) -> Result<Vec<ChatInfo>, ChatError> {
    state.store.refresh().await
}

/// 按标题选中聊天（`null` 清除选中），返回选中聊天解码后的消息
#[tauri::command]
pub async fn select_chat(
    title: Option<String>,
    state: State<'_, AppState>,
) -> Result<Vec<Message>, ChatError> {
    state.autosave.blur(None).await?;
    state.store.select(title.as_deref()).await?;
    state.conversation.reload().await
}

/// 按列表位置选中聊天
#[tauri::command]
pub async fn select_chat_at(
    index: Option<usize>,
    state: State<'_, AppState>,
) -> Result<Vec<Message>, ChatError> {
    state.autosave.blur(None).await?;
    state.store.select_index(index).await?;
    state.conversation.reload().await
}

/// 当前选中聊天：`{ title, lastEditTime, content }`
#[tauri::command]
pub async fn selected_chat(state: State<'_, AppState>) -> Result<Option<SelectedChat>, ChatError> {
    state.store.selected_chat().await
}

/// 新建聊天并选中；用户取消时返回 `null`
#[tauri::command]
pub async fn new_chat(state: State<'_, AppState>) -> Result<Option<String>, ChatError> {
    state.autosave.blur(None).await?;
    let title = state.store.create().await?;
    if title.is_some() {
        state.conversation.reload().await?;
    }
    Ok(title)
}

/// 删除选中的聊天；没有选中或用户取消时返回 `false`
#[tauri::command]
pub async fn delete_selected_chat(state: State<'_, AppState>) -> Result<bool, ChatError> {
    state.autosave.cancel();
    let deleted = state.store.delete().await?;
    if deleted {
        state.conversation.reload().await?;
    }
    Ok(deleted)
}

/// 清空选中聊天的内容，返回重新解码后的消息
#[tauri::command]
pub async fn clear_chat(state: State<'_, AppState>) -> Result<Vec<Message>, ChatError> {
    state.autosave.cancel();
    state.store.clear_selected().await?;
    state.conversation.reload().await
}

/// 编辑器内容变化，交给自动保存节流
#[tauri::command]
pub async fn editor_input(content: String, state: State<'_, AppState>) -> Result<(), ChatError> {
    state.autosave.input(content);
    Ok(())
}

/// 编辑器失焦，立即保存；返回是否执行了保存
#[tauri::command]
pub async fn editor_blur(
    content: Option<String>,
    state: State<'_, AppState>,
) -> Result<bool, ChatError> {
    state.autosave.blur(content).await
}

/// 当前消息列表
#[tauri::command]
pub async fn chat_messages(state: State<'_, AppState>) -> Result<Vec<Message>, ChatError> {
    Ok(state.conversation.messages())
}

#[tauri::command]
pub async fn append_message(
    message: Message,
    state: State<'_, AppState>,
) -> Result<Vec<Message>, ChatError> {
    state.conversation.append(message).await
}

#[tauri::command]
pub async fn append_messages(
    messages: Vec<Message>,
    state: State<'_, AppState>,
) -> Result<Vec<Message>, ChatError> {
    state.conversation.append_many(messages).await
}

/// 合并更新指定下标的消息（如点赞/点踩）
#[tauri::command]
pub async fn update_message(
    index: usize,
    patch: MessagePatch,
    state: State<'_, AppState>,
) -> Result<Vec<Message>, ChatError> {
    state.conversation.update(index, patch).await
}

/// 发送用户消息；未传入设置时使用配置中的默认聊天设置
#[tauri::command]
pub async fn send_message(
    text: String,
    settings: Option<ChatSettings>,
    state: State<'_, AppState>,
) -> Result<SendOutcome, ChatError> {
    let settings = settings.unwrap_or_else(|| state.config().chat_settings);
    state
        .conversation
        .send(&text, &settings, &state.backend)
        .await
}

/// 导出当前聊天为 Markdown 或 JSON 文本
#[tauri::command]
pub async fn export_chat(
    format: ExportFormat,
    state: State<'_, AppState>,
) -> Result<String, ChatError> {
    let title = state
        .store
        .selected_title()
        .unwrap_or_else(|| "Untitled".to_string());
    Ok(markdown::export(format, &title, &state.conversation.messages()))
}
