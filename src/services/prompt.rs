//! # 用户交互提示接口
//!
//! 新建聊天需要保存对话框，删除聊天需要确认框，路径越界需要阻塞式错误提示。
//! 这些交互通过 `Prompter` trait 抽象，文件存储层只依赖该接口：
//! - 桌面端由 `tauri-plugin-dialog` 实现（见 `commands::dialog`）
//! - 测试中使用预设应答的实现

use std::future::Future;
use std::path::PathBuf;

/// 新建聊天保存对话框的参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatDialog {
    /// 对话框标题
    pub title: String,
    /// 默认路径：`<root>/Untitled.<ext>`
    pub default_path: PathBuf,
    /// 文件类型过滤器名称（如 "JSON"）
    pub filter_name: String,
    /// 文件类型过滤器扩展名（不含点）
    pub extension: String,
}

/// 用户交互提示
///
/// 每个方法都会等待用户做出选择后才返回。
pub trait Prompter: Send + Sync {
    /// 弹出保存对话框选择新聊天的路径；用户取消时返回 `None`
    fn pick_new_chat_path(
        &self,
        dialog: NewChatDialog,
    ) -> impl Future<Output = Option<PathBuf>> + Send;

    /// 确认删除聊天；默认选项为取消，用户确认删除时返回 `true`
    fn confirm_delete(&self, title: &str) -> impl Future<Output = bool> + Send;

    /// 阻塞式错误提示，用户关闭提示后返回
    fn alert(&self, title: &str, message: &str) -> impl Future<Output = ()> + Send;
}
