//! # 聊天文档数据模型
//!
//! 定义了聊天元数据（ChatInfo）和当前打开聊天的派生视图（SelectedChat），
//! 对应前端 TypeScript 中的 `ChatInfo` 和 `selectedChat` 结构。
//!
//! 所有时间戳均为 Unix 毫秒时间戳，与前端 `Date.now()` 保持一致。

use serde::{Deserialize, Serialize};

/// 聊天文档内容：文档文件的原始文本
///
/// 使用消息适配器后，内容是 `Message` 数组的 JSON 编码；
/// 旧版 Markdown 文档则是 `**role**: content` 分块文本。
pub type ChatContent = String;

/// 聊天元数据
///
/// 表示根目录下的一个聊天文档。`title` 由文件名去掉扩展名得到，
/// 在聊天目录中唯一。
///
/// 对应前端 TypeScript 接口：
/// ```typescript
/// interface ChatInfo {
///   title: string;
///   lastEditTime: number;
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatInfo {
    /// 聊天标题：文件名去掉扩展名
    pub title: String,

    /// 最后编辑时间：文件 mtime（Unix 毫秒），每次成功写入后更新
    pub last_edit_time: u64,
}

/// 当前打开的聊天
///
/// 由聊天目录和选中标题派生：元数据来自目录缓存，内容通过 `readChat` 读取。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedChat {
    pub title: String,
    pub last_edit_time: u64,
    pub content: ChatContent,
}

impl SelectedChat {
    /// 由目录条目和读取到的内容组装
    pub fn new(info: ChatInfo, content: ChatContent) -> Self {
        Self {
            title: info.title,
            last_edit_time: info.last_edit_time,
            content,
        }
    }
}
