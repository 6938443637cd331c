//! # Tauri Command 处理模块
//!
//! 本模块包含所有注册到 Tauri 的 command 处理函数，只在 `desktop` feature 下编译。
//! 每个子模块对应一个功能域：
//! - `chats` - 五个 IPC 桥接 command（getChats/readChat/writeChat/createChat/deleteChat）
//! - `session` - 状态存储、自动保存和对话相关 commands
//! - `backend` - 推理后端代理 commands
//! - `settings` - 应用配置读写 commands
//! - `dialog` - 基于 `tauri-plugin-dialog` 的交互提示实现
//!
//! 所有 command 的错误类型都是 `ChatError`，序列化为 `{ kind, message }` 传给前端。

pub mod backend;
pub mod chats;
pub mod dialog;
pub mod session;
pub mod settings;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tauri::AppHandle;

use crate::error::ChatError;
use crate::models::settings::AppConfig;
use crate::services::autosave::AutoSaver;
use crate::services::backend::BackendClient;
use crate::services::bridge::FileStoreBridge;
use crate::services::conversation::Conversation;
use crate::services::file_store::FileStore;
use crate::services::message_log::MessageCodec;
use crate::services::store::ChatStore;

use dialog::DialogPrompter;

/// 桌面端使用的桥接：进程内 `FileStore` + 原生对话框
pub type DesktopBridge = FileStoreBridge<DialogPrompter>;

/// 应用全局状态（Tauri managed state）
///
/// 在 `setup` 钩子中构造一次，所有 command 通过 `State<AppState>` 注入访问。
pub struct AppState {
    /// 当前生效的应用配置；文档格式和后端地址的修改在重启后生效
    pub config: RwLock<AppConfig>,
    /// 桥接 command 直接使用的文件存储
    pub files: Arc<FileStore>,
    /// 桥接 command 使用的交互提示
    pub prompter: DialogPrompter,
    pub store: Arc<ChatStore<DesktopBridge>>,
    pub autosave: AutoSaver<ChatStore<DesktopBridge>>,
    pub conversation: Conversation<DesktopBridge>,
    pub backend: BackendClient,
}

impl AppState {
    /// 按配置构造全部服务
    ///
    /// # 错误
    /// 无法确定聊天根目录或无法创建 HTTP 客户端时返回错误
    pub fn new(app: AppHandle, config: AppConfig) -> Result<Self, ChatError> {
        let files = Arc::new(FileStore::open_default(config.document_format)?);
        let prompter = DialogPrompter::new(app);

        let bridge = FileStoreBridge::new(Arc::clone(&files), prompter.clone());
        let store = Arc::new(ChatStore::new(bridge));
        let autosave = AutoSaver::new(
            Arc::clone(&store),
            Duration::from_millis(config.auto_save_interval_ms),
        );
        let conversation = Conversation::new(
            Arc::clone(&store),
            MessageCodec::new(config.document_format),
        );
        let backend = BackendClient::from_config(&config)?;

        log::info!(
            "聊天根目录: {}, 文档格式: {:?}",
            files.root().display(),
            config.document_format
        );

        Ok(Self {
            config: RwLock::new(config),
            files,
            prompter,
            store,
            autosave,
            conversation,
            backend,
        })
    }

    /// 当前配置的副本
    pub fn config(&self) -> AppConfig {
        self.config
            .read()
            .map(|config| config.clone())
            .unwrap_or_default()
    }
}
