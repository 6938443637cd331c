//! # 业务逻辑服务模块
//!
//! 包含核心业务逻辑的实现，与 Tauri command 层解耦：
//! - `file_store` - 聊天根目录下文档的列出、读写、新建和删除
//! - `prompt` - 新建/删除所需的用户交互提示接口
//! - `bridge` - 状态层访问文档的五个 IPC 操作契约
//! - `store` - 聊天目录与选中聊天的状态存储
//! - `autosave` - 编辑器输入的尾沿节流自动保存
//! - `message_log` - 文档内容与消息列表之间的编解码
//! - `markdown` - `**role**: content` 分块格式的渲染、解析和导出
//! - `conversation` - 聊天界面的对话控制器
//! - `backend` - 外部推理后端 HTTP 客户端
//! - `config` - 应用配置文件读写

pub mod autosave;
pub mod backend;
pub mod bridge;
pub mod config;
pub mod conversation;
pub mod file_store;
pub mod markdown;
pub mod message_log;
pub mod prompt;
pub mod store;
