//! # IPC 桥接 Commands
//!
//! 前端访问聊天文档的五个 command，每次调用恰好对应一次 `FileStore` 调用：
//! - `get_chats` - 列出所有聊天
//! - `read_chat` / `write_chat` - 按标题读写内容
//! - `create_chat` - 保存对话框新建聊天，取消时返回 `null`
//! - `delete_chat` - 确认后删除聊天，取消时返回 `false`
//!
//! 这些 command 不经过 `ChatStore`，使用它们修改文档后需要调用
//! `refresh_chats` 让状态存储重新加载目录。

use tauri::State;

use crate::commands::AppState;
use crate::error::ChatError;
use crate::models::chat::{ChatContent, ChatInfo};

#[tauri::command]
pub async fn get_chats(state: State<'_, AppState>) -> Result<Vec<ChatInfo>, ChatError> {
    state.files.list().await
}

#[tauri::command]
pub async fn read_chat(title: String, state: State<'_, AppState>) -> Result<ChatContent, ChatError> {
    state.files.read(&title).await
}

#[tauri::command]
pub async fn write_chat(
    title: String,
    content: ChatContent,
    state: State<'_, AppState>,
) -> Result<(), ChatError> {
    state.files.write(&title, &content).await
}

#[tauri::command]
pub async fn create_chat(state: State<'_, AppState>) -> Result<Option<String>, ChatError> {
    state.files.create(&state.prompter).await
}

#[tauri::command]
pub async fn delete_chat(title: String, state: State<'_, AppState>) -> Result<bool, ChatError> {
    state.files.delete(&title, &state.prompter).await
}
