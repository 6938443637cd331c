//! 测试辅助：预设应答的交互提示与记录调用的桥接

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::ChatError;
use crate::models::chat::{ChatContent, ChatInfo};
use crate::models::settings::DocumentFormat;
use crate::services::bridge::{ChatBridge, FileStoreBridge};
use crate::services::file_store::FileStore;
use crate::services::prompt::{NewChatDialog, Prompter};

/// 按预设结果应答的 `Prompter`
#[derive(Default)]
pub struct ScriptedPrompter {
    save_path: Mutex<Option<PathBuf>>,
    confirm: AtomicBool,
    dialogs: Mutex<Vec<NewChatDialog>>,
    alerts: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// 保存对话框选择 `path`
    pub fn saving_to(path: impl Into<PathBuf>) -> Self {
        let prompter = Self::default();
        prompter.set_save_path(Some(path.into()));
        prompter
    }

    /// 取消所有对话框
    pub fn cancelling() -> Self {
        Self::default()
    }

    /// 确认所有删除
    pub fn confirming() -> Self {
        let prompter = Self::default();
        prompter.confirm.store(true, Ordering::SeqCst);
        prompter
    }

    pub fn set_save_path(&self, path: Option<PathBuf>) {
        *self.save_path.lock().unwrap() = path;
    }

    pub fn set_confirm(&self, confirm: bool) {
        self.confirm.store(confirm, Ordering::SeqCst);
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn last_dialog(&self) -> Option<NewChatDialog> {
        self.dialogs.lock().unwrap().last().cloned()
    }
}

impl Prompter for ScriptedPrompter {
    async fn pick_new_chat_path(&self, dialog: NewChatDialog) -> Option<PathBuf> {
        self.dialogs.lock().unwrap().push(dialog);
        self.save_path.lock().unwrap().clone()
    }

    async fn confirm_delete(&self, _title: &str) -> bool {
        self.confirm.load(Ordering::SeqCst)
    }

    async fn alert(&self, title: &str, _message: &str) {
        self.alerts.lock().unwrap().push(title.to_string());
    }
}

/// 记录调用次数、可注入失败的桥接，内部委托给真实的 `FileStoreBridge`
pub struct RecordingBridge {
    inner: FileStoreBridge<ScriptedPrompter>,
    pub lists: AtomicUsize,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    fail_next_list: AtomicBool,
    fail_next_write: AtomicBool,
}

impl RecordingBridge {
    pub fn new(root: &Path) -> Self {
        let files = Arc::new(FileStore::new(root, DocumentFormat::Json));
        Self {
            inner: FileStoreBridge::new(files, ScriptedPrompter::default()),
            lists: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_next_list: AtomicBool::new(false),
            fail_next_write: AtomicBool::new(false),
        }
    }

    pub fn prompter(&self) -> &ScriptedPrompter {
        self.inner.prompter()
    }

    pub fn files(&self) -> &FileStore {
        self.inner.files()
    }

    pub fn fail_next_list(&self) {
        self.fail_next_list.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ChatBridge for RecordingBridge {
    async fn get_chats(&self) -> Result<Vec<ChatInfo>, ChatError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_list.swap(false, Ordering::SeqCst) {
            return Err(ChatError::io(
                "读取聊天目录失败",
                std::io::Error::other("injected"),
            ));
        }
        self.inner.get_chats().await
    }

    async fn read_chat(&self, title: &str) -> Result<ChatContent, ChatError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_chat(title).await
    }

    async fn write_chat(&self, title: &str, content: &str) -> Result<(), ChatError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(ChatError::io(
                format!("写入聊天失败: {}", title),
                std::io::Error::other("injected"),
            ));
        }
        self.inner.write_chat(title, content).await
    }

    async fn create_chat(&self) -> Result<Option<String>, ChatError> {
        self.inner.create_chat().await
    }

    async fn delete_chat(&self, title: &str) -> Result<bool, ChatError> {
        self.inner.delete_chat(title).await
    }
}
