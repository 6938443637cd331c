//! # Markdown 聊天文本服务
//!
//! 旧版部署把聊天存为 `.md` 文件，每条消息是一个 `**role**: content` 块，
//! 块与块之间以空行分隔。本模块负责：
//! - 将消息列表渲染为该分块文本（Markdown 格式文档的编码、导出）
//! - 从分块文本中解析出消息列表（Markdown 格式文档的解码）
//! - 会话导出：带标题的 Markdown 文档，或美化后的 JSON
//!
//! 分块文本不记录时间戳和反馈，因此 Markdown 格式只保证角色和内容的往返。
//!
//! 内容中位于行首的块标记渲染时加一个反斜杠转义（`\**user**:`），
//! 解析时去掉一个，已转义的行再叠加一层，往返不会把一条消息拆成多条。
//! 空消息列表渲染为空文本，与清空聊天写入的内容相同，重新打开时解码为欢迎消息。

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::models::message::{Message, Role};

/// 会话导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Json,
}

/// 消息块起始标记：行首的 `**user**:` / `**assistant**:` / `**system**:`
static BLOCK_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\*\*(user|assistant|system)\*\*:[ \t]?").unwrap()
});

/// 内容中需要转义的行首标记，包括已经带反斜杠的
static ESCAPABLE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(\\*)(\*\*(?:user|assistant|system)\*\*:)").unwrap()
});

/// 转义后的行首标记
static ESCAPED_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\\(\\*\*\*(?:user|assistant|system)\*\*:)").unwrap()
});

fn escape_markers(content: &str) -> Cow<'_, str> {
    ESCAPABLE_MARKER_RE.replace_all(content, r"\${1}${2}")
}

fn unescape_markers(content: &str) -> Cow<'_, str> {
    ESCAPED_MARKER_RE.replace_all(content, "${1}")
}

/// 将消息列表渲染为 `**role**: content` 分块文本
pub fn render(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|msg| format!("**{}**: {}", msg.role.as_str(), escape_markers(&msg.content)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 解析 `**role**: content` 分块文本
///
/// 文本中没有任何块标记，或第一个标记之前还有非空白内容时，
/// 说明不是分块格式，返回 `None` 交由调用方按普通文本处理。
pub fn parse(text: &str) -> Option<Vec<Message>> {
    let markers: Vec<_> = BLOCK_MARKER_RE.captures_iter(text).collect();
    let first = markers.first()?.get(0)?;
    if !text[..first.start()].trim().is_empty() {
        return None;
    }

    let mut messages = Vec::with_capacity(markers.len());
    for (i, caps) in markers.iter().enumerate() {
        let marker = caps.get(0)?;
        let role = Role::parse(caps.get(1)?.as_str())?;
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());

        messages.push(Message {
            role,
            content: unescape_markers(text[marker.end()..end].trim_end()).into_owned(),
            timestamp: None,
            feedback: None,
        });
    }

    Some(messages)
}

/// 将聊天导出为 Markdown 文档
///
/// 生成以聊天标题为一级标题的文档，正文为分块文本。
pub fn export_markdown(title: &str, messages: &[Message]) -> String {
    let body = render(messages);
    if body.is_empty() {
        format!("# {}\n", title)
    } else {
        format!("# {}\n\n{}\n", title, body)
    }
}

/// 将聊天导出为美化的 JSON（2 空格缩进）
pub fn export_json(messages: &[Message]) -> String {
    serde_json::to_string_pretty(messages).unwrap_or_else(|_| "[]".to_string())
}

/// 按格式导出聊天
pub fn export(format: ExportFormat, title: &str, messages: &[Message]) -> String {
    match format {
        ExportFormat::Markdown => export_markdown(title, messages),
        ExportFormat::Json => export_json(messages),
    }
}
