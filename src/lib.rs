//! # ChatMark - 本地聊天笔记应用核心
//!
//! 聊天以文档形式保存在用户主目录下的 `ChatMark/` 中，每个聊天一个文件。
//! 本 crate 分为两层：
//! - 核心层（始终编译）：文件存储、IPC 桥接契约、状态存储、自动保存、
//!   消息编解码、对话控制器、推理后端客户端
//! - 桌面层（`desktop` feature）：Tauri 应用初始化和 command 处理函数
//!
//! ## 架构说明
//! 通过将核心逻辑放在 `lib.rs` 而非 `main.rs` 中，
//! Tauri 可以在桌面端（`main.rs`）和移动端入口之间共享此初始化代码。
//!
//! ## 模块结构
//! - `commands/` - Tauri command 处理函数（IPC 接口层，仅桌面端）
//! - `models/` - 数据模型（对应前端 TypeScript 类型）
//! - `services/` - 核心业务逻辑
//! - `utils/` - 通用工具函数
//! - `error` - 统一错误类型

pub mod error;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(feature = "desktop")]
mod commands;

#[cfg(test)]
mod test_utils;

#[cfg(feature = "desktop")]
use tauri::{Emitter, Manager};

/// 状态存储变更事件在前端的事件名
#[cfg(feature = "desktop")]
const STORE_EVENT_NAME: &str = "chat-store";

// 当目标平台为移动端（Android/iOS）时，此属性将 `run()` 函数标记为
// Tauri 移动端入口点；在桌面端编译时不生效，`run()` 由 `main.rs` 直接调用。
#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
/// Tauri 应用启动函数
///
/// 1. 注册对话框插件（新建/删除聊天的原生对话框）
/// 2. 在 `setup` 钩子中读取配置并构造 `AppState`，注册为 managed state
/// 3. 将状态存储的变更事件转发给前端（`chat-store` 事件）
/// 4. 注册所有自定义 Tauri commands
///
/// # Panics
/// 如果 Tauri 应用启动失败（例如配置文件缺失或窗口创建失败），
/// 将通过 `.expect()` 触发 panic 并输出错误信息。
pub fn run() {
    tauri::Builder::default()
        // 对话框插件：新建聊天的保存对话框、删除确认框、错误提示框
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            // 仅在开发调试模式下启用日志插件
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let config = tauri::async_runtime::block_on(services::config::read_app_config());
            let state = commands::AppState::new(app.handle().clone(), config)?;

            let handle = app.handle().clone();
            state.store.subscribe(move |event| {
                if let Err(e) = handle.emit(STORE_EVENT_NAME, event) {
                    log::warn!("转发状态事件失败: {}", e);
                }
            });

            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // IPC 桥接 commands
            commands::chats::get_chats,
            commands::chats::read_chat,
            commands::chats::write_chat,
            commands::chats::create_chat,
            commands::chats::delete_chat,
            // 会话 commands
            commands::session::list_chats,
            commands::session::refresh_chats,
            commands::session::select_chat,
            commands::session::select_chat_at,
            commands::session::selected_chat,
            commands::session::new_chat,
            commands::session::delete_selected_chat,
            commands::session::clear_chat,
            commands::session::editor_input,
            commands::session::editor_blur,
            commands::session::chat_messages,
            commands::session::append_message,
            commands::session::append_messages,
            commands::session::update_message,
            commands::session::send_message,
            commands::session::export_chat,
            // 推理后端 commands
            commands::backend::fetch_models,
            commands::backend::backend_status,
            commands::backend::connect_tensorlink,
            commands::backend::tensorlink_stats,
            commands::backend::start_fine_tune,
            commands::backend::fine_tune_status,
            // 设置 commands
            commands::settings::get_chats_root,
            commands::settings::read_app_config,
            commands::settings::save_app_config,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
