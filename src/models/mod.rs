//! # 数据模型模块
//!
//! 定义了与前端 TypeScript 类型一一对应的 Rust 数据结构。
//! 所有结构体均派生 `Serialize` / `Deserialize`，用于 Tauri IPC 传输和 JSON 文件读写。
//! - `chat` - 聊天元数据和当前打开的聊天
//! - `message` - 聊天消息、角色、反馈和部分更新补丁
//! - `settings` - 应用配置、文档格式和聊天设置
//! - `backend` - 外部推理后端 REST 接口的请求/响应结构

pub mod backend;
pub mod chat;
pub mod message;
pub mod settings;
