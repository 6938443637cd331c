//! # 原生对话框交互提示
//!
//! 使用 `tauri-plugin-dialog` 实现 `Prompter`：
//! - 新建聊天：原生保存对话框
//! - 删除聊天：Delete / Cancel 确认框
//! - 路径越界：错误提示框
//!
//! 插件的对话框 API 是回调式的，这里通过 `oneshot` 通道转换为 future，
//! 等待期间不阻塞任何线程。
//!
//! 注意：插件不支持指定默认按钮，确认框的"默认取消"只能依赖
//! 关闭对话框（Esc）时回调收到 `false` 来近似。

use std::path::PathBuf;

use tauri::AppHandle;
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tokio::sync::oneshot;

use crate::services::prompt::{NewChatDialog, Prompter};

/// 基于原生对话框的交互提示
#[derive(Clone)]
pub struct DialogPrompter {
    app: AppHandle,
}

impl DialogPrompter {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl Prompter for DialogPrompter {
    async fn pick_new_chat_path(&self, dialog: NewChatDialog) -> Option<PathBuf> {
        let (tx, rx) = oneshot::channel();

        let mut builder = self
            .app
            .dialog()
            .file()
            .set_title(dialog.title)
            .add_filter(dialog.filter_name, &[dialog.extension.as_str()]);
        if let Some(directory) = dialog.default_path.parent() {
            builder = builder.set_directory(directory);
        }
        if let Some(file_name) = dialog.default_path.file_name().and_then(|n| n.to_str()) {
            builder = builder.set_file_name(file_name);
        }

        builder.save_file(move |path| {
            let _ = tx.send(path);
        });

        let path = rx.await.ok().flatten()?;
        match path.into_path() {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("保存对话框返回了无法识别的路径: {}", e);
                None
            }
        }
    }

    async fn confirm_delete(&self, title: &str) -> bool {
        let (tx, rx) = oneshot::channel();

        self.app
            .dialog()
            .message(format!(
                "Are you sure you want to delete \"{}\"? This cannot be undone.",
                title
            ))
            .title("Delete chat")
            .kind(MessageDialogKind::Warning)
            .buttons(MessageDialogButtons::OkCancelCustom(
                "Delete".to_string(),
                "Cancel".to_string(),
            ))
            .show(move |confirmed| {
                let _ = tx.send(confirmed);
            });

        rx.await.unwrap_or(false)
    }

    async fn alert(&self, title: &str, message: &str) {
        let (tx, rx) = oneshot::channel();

        self.app
            .dialog()
            .message(message)
            .title(title)
            .kind(MessageDialogKind::Error)
            .show(move |_| {
                let _ = tx.send(());
            });

        let _ = rx.await;
    }
}
