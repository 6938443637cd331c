//! # 消息日志适配器
//!
//! 在聊天文档的原始文本（ChatContent）与结构化消息列表之间转换，
//! 是聊天界面和文件存储之间的唯一格式边界。
//!
//! ## 解码容错策略
//! 1. 内容是 Message 数组的 JSON：直接使用
//! 2. Markdown 格式文档：尝试按 `**role**: content` 分块解析
//! 3. 其他非空内容（旧版笔记等）：整体包装成一条 system 消息，
//!    前缀 `Previous note converted to chat:`
//! 4. 空内容：替换为固定的欢迎消息
//!
//! 结构化解析失败只在本地恢复，从不作为错误暴露给用户。
//!
//! ## 往返定律
//! 对任何结构良好的消息列表 `m`，`decode(encode(m)) == m`（JSON 格式）。

use crate::error::ChatError;
use crate::models::backend::HistoryItem;
use crate::models::chat::ChatContent;
use crate::models::message::{Message, MessagePatch, Role};
use crate::models::settings::DocumentFormat;
use crate::services::markdown;

/// 旧版非结构化内容被包装为 system 消息时的前缀
pub const CONVERTED_NOTE_PREFIX: &str = "Previous note converted to chat:\n\n";

/// 空文档显示的欢迎消息
pub const WELCOME_MESSAGE: &str = "## Welcome to ChatMark\n\n\
    An AI experience powered by local data and peer-to-peer computing with opt-in privacy \
    enhancing features. Select an existing chat or create a new one to start chatting!";

/// 未选中任何聊天时显示的提示消息
pub const NO_SELECTION_MESSAGE: &str = "# Select or create a chat\n\n\
    Please select an existing chat or create a new one to start chatting.";

/// 按 JSON 格式解码文档内容
pub fn decode(content: &str) -> Vec<Message> {
    MessageCodec::new(DocumentFormat::Json).decode(content)
}

/// 按 JSON 格式编码消息列表
pub fn encode(messages: &[Message]) -> ChatContent {
    MessageCodec::new(DocumentFormat::Json).encode(messages)
}

/// 按文档格式编解码消息列表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageCodec {
    format: DocumentFormat,
}

impl MessageCodec {
    pub fn new(format: DocumentFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// 将文档内容解码为消息列表，永不失败
    pub fn decode(&self, content: &str) -> Vec<Message> {
        match parse_structured(content) {
            Ok(messages) => return messages,
            Err(e) => log::debug!("聊天内容不是结构化消息，按旧版内容处理: {}", e),
        }

        if self.format == DocumentFormat::Markdown {
            if let Some(messages) = markdown::parse(content) {
                return messages;
            }
        }

        if content.trim().is_empty() {
            vec![Message::system(WELCOME_MESSAGE)]
        } else {
            vec![Message::system(format!("{}{}", CONVERTED_NOTE_PREFIX, content))]
        }
    }

    /// 将消息列表编码为文档内容
    pub fn encode(&self, messages: &[Message]) -> ChatContent {
        match self.format {
            DocumentFormat::Json => {
                serde_json::to_string(messages).unwrap_or_else(|_| "[]".to_string())
            }
            DocumentFormat::Markdown => markdown::render(messages),
        }
    }
}

/// 结构化解析：内容必须是 Message 数组
///
/// 顶层是对象、字符串等非数组 JSON 也视为解析失败。
fn parse_structured(content: &str) -> Result<Vec<Message>, ChatError> {
    Ok(serde_json::from_str::<Vec<Message>>(content)?)
}

/// 内存中的消息日志
///
/// 按追加顺序保存当前聊天的消息，下标即消息标识。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 追加一条消息
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// 批量追加消息
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// 合并更新指定下标的消息
    ///
    /// 补丁中的字段覆盖原值，其余字段保留。
    ///
    /// # 错误
    /// `index` 越界时返回 `IndexOutOfBounds`，日志保持不变
    pub fn update(&mut self, index: usize, patch: MessagePatch) -> Result<&Message, ChatError> {
        let len = self.messages.len();
        let message = self
            .messages
            .get_mut(index)
            .ok_or(ChatError::IndexOutOfBounds { index, len })?;
        message.apply(patch);
        Ok(message)
    }

    /// 发送给后端的对话历史：每条消息只保留角色和文本
    pub fn history(&self) -> Vec<HistoryItem> {
        self.messages
            .iter()
            .map(|m| HistoryItem {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    /// 非 system 消息组成的历史（微调请求使用）
    pub fn dialogue(&self) -> Vec<HistoryItem> {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| HistoryItem {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Feedback;

    fn sample() -> Vec<Message> {
        vec![
            Message {
                role: Role::User,
                content: "hello".into(),
                timestamp: Some(1_700_000_000_000),
                feedback: None,
            },
            Message {
                role: Role::Assistant,
                content: "hi! \"quoted\" and\nnewline".into(),
                timestamp: Some(1_700_000_000_500),
                feedback: Some(Feedback::Positive),
            },
            Message {
                role: Role::System,
                content: String::new(),
                timestamp: None,
                feedback: None,
            },
        ]
    }

    #[test]
    fn test_round_trip_preserves_order_and_fields() {
        let messages = sample();
        assert_eq!(decode(&encode(&messages)), messages);
        assert_eq!(decode(&encode(&[])), Vec::<Message>::new());
    }

    #[test]
    fn test_legacy_text_is_wrapped() {
        let decoded = decode("my old note\n- item");
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].role, Role::System);
        assert_eq!(
            decoded[0].content,
            "Previous note converted to chat:\n\nmy old note\n- item"
        );
        assert!(decoded[0].timestamp.is_some());
    }

    #[test]
    fn test_non_array_json_is_wrapped() {
        let decoded = decode(r#"{"role":"user","content":"x"}"#);
        assert_eq!(decoded.len(), 1);
        assert!(decoded[0].content.starts_with(CONVERTED_NOTE_PREFIX));
    }

    #[test]
    fn test_blank_content_yields_welcome() {
        for content in ["", "   \n"] {
            let decoded = decode(content);
            assert_eq!(decoded.len(), 1);
            assert_eq!(decoded[0].role, Role::System);
            assert_eq!(decoded[0].content, WELCOME_MESSAGE);
        }
    }

    #[test]
    fn test_markdown_codec() {
        let codec = MessageCodec::new(DocumentFormat::Markdown);
        let decoded = codec.decode("**user**: hi\n\n**assistant**: hello");
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1].content, "hello");
        assert_eq!(codec.encode(&decoded), "**user**: hi\n\n**assistant**: hello");

        // JSON 内容在 Markdown 格式下同样可读
        assert_eq!(codec.decode(&encode(&sample())), sample());
        // 纯文本仍按旧版笔记包装
        assert!(codec.decode("plain")[0].content.starts_with(CONVERTED_NOTE_PREFIX));
    }

    #[test]
    fn test_update_out_of_bounds_is_an_error() {
        let mut log = MessageLog::new(sample());
        let err = log
            .update(5, MessagePatch::feedback(Some(Feedback::Positive)))
            .unwrap_err();
        assert!(matches!(err, ChatError::IndexOutOfBounds { index: 5, len: 3 }));
        assert_eq!(log.messages(), sample().as_slice());
    }

    #[test]
    fn test_update_merges() {
        let mut log = MessageLog::new(sample());
        let updated = log
            .update(0, MessagePatch::feedback(Some(Feedback::Negative)))
            .unwrap();
        assert_eq!(updated.content, "hello");
        assert_eq!(updated.feedback, Some(Feedback::Negative));
    }

    #[test]
    fn test_history_and_dialogue() {
        let log = MessageLog::new(sample());
        assert_eq!(log.history().len(), 3);
        let dialogue = log.dialogue();
        assert_eq!(dialogue.len(), 2);
        assert_eq!(dialogue[1].role, Role::Assistant);
    }
}
