//! # IPC 桥接契约
//!
//! 界面侧状态层访问聊天文档的唯一通道，固定五个请求/响应操作：
//! `getChats` / `readChat` / `writeChat` / `createChat` / `deleteChat`。
//!
//! ## 契约
//! - 无状态透传：每次调用恰好对应一次文件存储调用，不重排、不合并、不重试
//! - 文件存储的错误原样向上传递（rejected），不会被吞成 `false` / `None`
//! - 只有 `createChat` / `deleteChat` 以 `None` / `false` 表示用户取消
//!
//! 桌面端的五个 Tauri command（见 `commands::chats`）与 `FileStoreBridge`
//! 共享同一个 `FileStore`，两条路径的行为完全一致。

use std::future::Future;
use std::sync::Arc;

use crate::error::ChatError;
use crate::models::chat::{ChatContent, ChatInfo};
use crate::services::file_store::FileStore;
use crate::services::prompt::Prompter;

/// 聊天文档访问契约
pub trait ChatBridge: Send + Sync + 'static {
    /// 列出所有聊天
    fn get_chats(&self) -> impl Future<Output = Result<Vec<ChatInfo>, ChatError>> + Send;

    /// 读取聊天内容
    fn read_chat(&self, title: &str)
    -> impl Future<Output = Result<ChatContent, ChatError>> + Send;

    /// 写入聊天内容
    fn write_chat(
        &self,
        title: &str,
        content: &str,
    ) -> impl Future<Output = Result<(), ChatError>> + Send;

    /// 新建聊天；用户取消或路径越界时返回 `None`
    fn create_chat(&self) -> impl Future<Output = Result<Option<String>, ChatError>> + Send;

    /// 删除聊天；用户取消时返回 `false`
    fn delete_chat(&self, title: &str) -> impl Future<Output = Result<bool, ChatError>> + Send;
}

/// 进程内桥接：直接调用 `FileStore`，交互提示交给 `Prompter`
pub struct FileStoreBridge<P> {
    files: Arc<FileStore>,
    prompter: P,
}

impl<P: Prompter> FileStoreBridge<P> {
    pub fn new(files: Arc<FileStore>, prompter: P) -> Self {
        Self { files, prompter }
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }
}

impl<P: Prompter + 'static> ChatBridge for FileStoreBridge<P> {
    async fn get_chats(&self) -> Result<Vec<ChatInfo>, ChatError> {
        self.files.list().await
    }

    async fn read_chat(&self, title: &str) -> Result<ChatContent, ChatError> {
        self.files.read(title).await
    }

    async fn write_chat(&self, title: &str, content: &str) -> Result<(), ChatError> {
        self.files.write(title, content).await
    }

    async fn create_chat(&self) -> Result<Option<String>, ChatError> {
        self.files.create(&self.prompter).await
    }

    async fn delete_chat(&self, title: &str) -> Result<bool, ChatError> {
        self.files.delete(title, &self.prompter).await
    }
}
