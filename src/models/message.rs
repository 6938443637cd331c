//! # 消息数据模型
//!
//! 定义了聊天消息（Message）、角色（Role）、反馈（Feedback）以及
//! 部分更新补丁（MessagePatch），对应前端 TypeScript 中的 `Message` 接口。
//!
//! 消息在文档中按追加顺序排列，下标位置即隐式标识符（反馈更新按下标定位），
//! 序列化往返时顺序必须保持不变。

use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::time::now_millis;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// 角色的小写名称，与 JSON 中的取值一致
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// 从小写名称解析角色
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

/// 用户对助手回复的反馈
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Positive,
    Negative,
}

/// 单条聊天消息
///
/// 对应前端 TypeScript 接口：
/// ```typescript
/// interface Message {
///   role: 'user' | 'assistant' | 'system';
///   content: string;
///   timestamp?: number;
///   feedback?: 'positive' | 'negative' | null;
/// }
/// ```
///
/// `feedback` 为 `null` 和缺省都解析为 `None`，序列化时省略。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    pub content: String,

    /// 消息创建时间（Unix 毫秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl Message {
    /// 创建一条带当前时间戳的消息
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(now_millis()),
            feedback: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// 将补丁合并到当前消息：补丁中出现的字段覆盖原值，其余保留
    pub fn apply(&mut self, patch: MessagePatch) {
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(timestamp) = patch.timestamp {
            self.timestamp = Some(timestamp);
        }
        if let Some(feedback) = patch.feedback {
            self.feedback = feedback;
        }
    }
}

/// 消息的部分更新
///
/// 对应前端的 `Partial<Message>`。`feedback` 使用双层 Option：
/// - `None`：补丁未涉及反馈，保持原值
/// - `Some(None)`：显式传入 `null`，清除反馈
/// - `Some(Some(f))`：设置为新的反馈
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessagePatch {
    #[serde(default)]
    pub role: Option<Role>,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub timestamp: Option<u64>,

    #[serde(default, deserialize_with = "present_or_null")]
    pub feedback: Option<Option<Feedback>>,
}

impl MessagePatch {
    /// 仅设置反馈的补丁（点赞/点踩）
    pub fn feedback(feedback: Option<Feedback>) -> Self {
        Self {
            feedback: Some(feedback),
            ..Self::default()
        }
    }
}

/// 字段出现即为 `Some`，值为 `null` 时得到 `Some(None)`
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<Feedback>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Feedback>::deserialize(deserializer).map(Some)
}
