//! # 对话控制器
//!
//! 聊天界面背后的逻辑：持有选中聊天解码后的消息日志，
//! 所有修改都经由 `ChatStore::save` 写回文档。
//!
//! ## 发送流程
//! 1. 空白消息、未选中聊天或已有请求进行中时直接忽略
//! 2. 追加用户消息并保存
//! 3. 以 `{message, history, settings}` 请求后端，history 为发送前的全部消息
//! 4. 成功：追加助手回复；失败：追加一条固定的 system 错误消息，操作本身不失败
//!
//! 回复总是写入发起请求的聊天。等待期间用户切换到其他聊天时，
//! 回复直接读取、追加并写回原聊天的文档，当前显示的日志不受影响；
//! 原聊天已被删除时丢弃回复。
//!
//! ## Tensorlink 与微调
//! 连接 Tensorlink、提交微调和微调完成都会向聊天追加一条 system 消息并保存，
//! 后端请求失败时追加固定的错误消息。微调任务按 5 秒间隔轮询，
//! 完成消息写入提交该任务的聊天。
//!
//! 未选中聊天时，修改只作用于内存中的日志（`save` 为空操作）。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::error::ChatError;
use crate::models::backend::{FeedbackEntry, FineTuneAck, FineTuneRequest, FineTuneStatus, JobState};
use crate::models::message::{Message, MessagePatch, Role};
use crate::models::settings::ChatSettings;
use crate::services::backend::{BackendClient, ChatBackend};
use crate::services::bridge::ChatBridge;
use crate::services::message_log::{MessageCodec, MessageLog, NO_SELECTION_MESSAGE};
use crate::services::store::ChatStore;

/// 后端请求失败时追加的 system 消息
pub const SEND_FAILED_MESSAGE: &str = "Error: Could not process your message. Please try again later.";

pub const TENSORLINK_CONNECTED_MESSAGE: &str =
    "Connected to Tensorlink. Enhanced model capabilities are now available.";
/// 连接前已处于连接状态时的提示
pub const TENSORLINK_DISCONNECTED_MESSAGE: &str = "Disconnected from Tensorlink.";
pub const TENSORLINK_FAILED_MESSAGE: &str = "Error: Could not connect to Tensorlink.";

/// 后端未返回 `message` 时使用的微调提交提示
pub const FINE_TUNE_STARTED_MESSAGE: &str = "**Fine-tuning initiated.** This process will analyze your chat history to improve future responses.";
pub const FINE_TUNE_FAILED_MESSAGE: &str =
    "Error: Could not initiate fine-tuning. Please try again later.";
pub const FINE_TUNE_COMPLETED_MESSAGE: &str =
    "**Fine-tuning completed.** The model has been updated based on your chat history.";

/// 微调状态轮询间隔
pub const FINE_TUNE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// 发送结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SendOutcome {
    /// 空白消息、未选中聊天或已有请求进行中，未发送
    Skipped,
    /// 收到并追加了助手回复
    Replied,
    /// 后端请求失败，已追加错误消息
    Failed { error: String },
}

impl SendOutcome {
    /// 后端调用是否成功
    pub fn succeeded(&self) -> bool {
        matches!(self, SendOutcome::Replied)
    }
}

/// 请求进行中标记，drop 时复位
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 对话控制器
pub struct Conversation<B> {
    store: Arc<ChatStore<B>>,
    codec: MessageCodec,
    log: Mutex<MessageLog>,
    sending: AtomicBool,
    /// 进行中的微调任务：任务 ID → 提交任务的聊天标题
    fine_tune_jobs: Mutex<HashMap<String, String>>,
}

impl<B: ChatBridge> Conversation<B> {
    pub fn new(store: Arc<ChatStore<B>>, codec: MessageCodec) -> Self {
        Self {
            store,
            codec,
            log: Mutex::new(MessageLog::default()),
            sending: AtomicBool::new(false),
            fine_tune_jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<ChatStore<B>> {
        &self.store
    }

    fn lock_log(&self) -> MutexGuard<'_, MessageLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_jobs(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.fine_tune_jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 当前消息快照
    pub fn messages(&self) -> Vec<Message> {
        self.lock_log().messages().to_vec()
    }

    /// 是否有发送请求进行中
    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    /// 从选中聊天重新解码消息日志
    ///
    /// 未选中聊天时显示固定的提示消息。
    pub async fn reload(&self) -> Result<Vec<Message>, ChatError> {
        let messages = match self.store.selected_chat().await? {
            Some(chat) => self.codec.decode(&chat.content),
            None => vec![Message::system(NO_SELECTION_MESSAGE)],
        };
        *self.lock_log() = MessageLog::new(messages.clone());
        Ok(messages)
    }

    /// 修改日志后保存；返回修改后的快照
    async fn mutate_and_save<R>(
        &self,
        mutate: impl FnOnce(&mut MessageLog) -> Result<R, ChatError>,
    ) -> Result<Vec<Message>, ChatError> {
        let snapshot = {
            let mut log = self.lock_log();
            mutate(&mut log)?;
            log.messages().to_vec()
        };
        self.store.save(&self.codec.encode(&snapshot)).await?;
        Ok(snapshot)
    }

    /// 追加一条消息
    pub async fn append(&self, message: Message) -> Result<Vec<Message>, ChatError> {
        self.mutate_and_save(|log| {
            log.append(message);
            Ok(())
        })
        .await
    }

    /// 批量追加消息，只保存一次
    pub async fn append_many(&self, messages: Vec<Message>) -> Result<Vec<Message>, ChatError> {
        self.mutate_and_save(|log| {
            log.extend(messages);
            Ok(())
        })
        .await
    }

    /// 合并更新指定下标的消息
    ///
    /// # 错误
    /// 下标越界时返回 `IndexOutOfBounds`，日志和文档都不变
    pub async fn update(&self, index: usize, patch: MessagePatch) -> Result<Vec<Message>, ChatError> {
        self.mutate_and_save(|log| log.update(index, patch).map(|_| ()))
            .await
    }

    /// 向指定聊天追加一条消息
    ///
    /// 该聊天仍是选中聊天时等同于 `append`；否则读取它的文档，
    /// 解码、追加后写回，当前日志不变。聊天已不存在时丢弃消息。
    async fn append_to(&self, title: &str, message: Message) -> Result<(), ChatError> {
        if self.store.selected_title().as_deref() == Some(title) {
            self.append(message).await?;
            return Ok(());
        }

        let content = match self.store.bridge().read_chat(title).await {
            Ok(content) => content,
            Err(ChatError::NotFound(_)) => {
                log::warn!("聊天已不存在，丢弃消息: {}", title);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let mut messages = self.codec.decode(&content);
        messages.push(message);

        match self.store.save_to(title, &self.codec.encode(&messages)).await {
            Ok(()) => {
                log::info!("消息已写入未选中的聊天: {}", title);
                Ok(())
            }
            Err(ChatError::NotFound(_)) => {
                log::warn!("聊天已不存在，丢弃消息: {}", title);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// 发送用户消息并追加助手回复
    ///
    /// 回复写入发送时选中的聊天，即使等待期间选中了其他聊天。
    pub async fn send(
        &self,
        text: &str,
        settings: &ChatSettings,
        backend: &impl ChatBackend,
    ) -> Result<SendOutcome, ChatError> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::Skipped);
        }
        let Some(origin) = self.store.selected_title() else {
            log::debug!("未选中聊天，忽略本次发送");
            return Ok(SendOutcome::Skipped);
        };
        if self.sending.swap(true, Ordering::SeqCst) {
            log::debug!("已有消息发送中，忽略本次发送");
            return Ok(SendOutcome::Skipped);
        }
        let _in_flight = InFlight(&self.sending);

        let history = self.lock_log().history();
        self.append(Message::user(text)).await?;

        let (reply, outcome) = match backend.complete(text, &history, settings).await {
            Ok(reply) => (Message::assistant(reply), SendOutcome::Replied),
            Err(e) => {
                log::error!("发送消息失败: {}", e);
                (
                    Message::system(SEND_FAILED_MESSAGE),
                    SendOutcome::Failed {
                        error: e.to_string(),
                    },
                )
            }
        };

        self.append_to(&origin, reply).await?;
        Ok(outcome)
    }

    /// 连接 Tensorlink 网络并追加连接结果消息
    ///
    /// # 参数
    /// - `was_connected`: 请求前界面记录的连接状态，决定成功时的提示文本
    ///
    /// # 返回值
    /// 连接成功时返回 `true`；请求失败时追加错误消息并返回 `false`
    pub async fn connect_tensorlink(
        &self,
        backend: &BackendClient,
        was_connected: bool,
    ) -> Result<bool, ChatError> {
        match backend.connect().await {
            Ok(_) => {
                log::info!("已连接 Tensorlink");
                let text = if was_connected {
                    TENSORLINK_DISCONNECTED_MESSAGE
                } else {
                    TENSORLINK_CONNECTED_MESSAGE
                };
                self.append(Message::system(text)).await?;
                Ok(true)
            }
            Err(e) => {
                log::error!("连接 Tensorlink 失败: {}", e);
                self.append(Message::system(TENSORLINK_FAILED_MESSAGE))
                    .await?;
                Ok(false)
            }
        }
    }

    /// 以选中聊天的对话和反馈提交微调任务
    ///
    /// 提交结果作为 system 消息追加到选中聊天；返回了任务 ID 时记录该任务，
    /// 之后由 `check_fine_tune` / `watch_fine_tune` 跟踪。
    ///
    /// # 返回值
    /// 未选中聊天或提交失败时返回 `None`
    pub async fn start_fine_tune(
        &self,
        model_name: impl Into<String>,
        backend: &BackendClient,
    ) -> Result<Option<FineTuneAck>, ChatError> {
        let Some(origin) = self.store.selected_title() else {
            log::debug!("未选中聊天，忽略微调请求");
            return Ok(None);
        };

        let request = self.fine_tune_request(model_name);
        match backend.start_fine_tune(&request).await {
            Ok(ack) => {
                let text = ack
                    .message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| FINE_TUNE_STARTED_MESSAGE.to_string());
                if let Some(job_id) = &ack.job_id {
                    self.lock_jobs().insert(job_id.clone(), origin.clone());
                }
                self.append_to(&origin, Message::system(text)).await?;
                Ok(Some(ack))
            }
            Err(e) => {
                log::error!("提交微调任务失败: {}", e);
                self.append_to(&origin, Message::system(FINE_TUNE_FAILED_MESSAGE))
                    .await?;
                Ok(None)
            }
        }
    }

    /// 查询一次微调任务状态
    ///
    /// 由本控制器提交的任务首次报告完成时，向提交它的聊天追加完成消息；
    /// 任务结束（完成或失败）后不再跟踪，重复查询不会重复追加。
    pub async fn check_fine_tune(
        &self,
        job_id: &str,
        backend: &BackendClient,
    ) -> Result<FineTuneStatus, ChatError> {
        let status = backend.fine_tune_status(job_id).await?;
        let state = status.job.as_ref().filter(|_| status.success).map(|job| job.status);

        if matches!(state, Some(JobState::Completed | JobState::Failed)) {
            let origin = self.lock_jobs().remove(job_id);
            if let (Some(origin), Some(JobState::Completed)) = (origin, state) {
                log::info!("微调任务完成: {}", job_id);
                self.append_to(&origin, Message::system(FINE_TUNE_COMPLETED_MESSAGE))
                    .await?;
            }
        }
        Ok(status)
    }

    /// 轮询微调任务直到它不再处于处理中
    ///
    /// # 返回值
    /// 最后一次查询到的状态；查询失败时停止轮询并返回 `None`
    pub async fn watch_fine_tune(
        &self,
        job_id: &str,
        backend: &BackendClient,
        interval: Duration,
    ) -> Option<FineTuneStatus> {
        loop {
            match self.check_fine_tune(job_id, backend).await {
                Ok(status) => {
                    let processing = status.success
                        && status
                            .job
                            .as_ref()
                            .is_some_and(|job| job.status == JobState::Processing);
                    if !processing {
                        return Some(status);
                    }
                    tokio::time::sleep(interval).await;
                }
                Err(e) => {
                    log::warn!("查询微调状态失败，停止轮询: {} - {}", job_id, e);
                    self.lock_jobs().remove(job_id);
                    return None;
                }
            }
        }
    }

    /// 构造微调请求体
    ///
    /// `chatHistory` 为全部非 system 消息；`feedbackData` 为带反馈的助手消息，
    /// `messageId` 是该消息在完整日志中的下标。
    pub fn fine_tune_request(&self, model_name: impl Into<String>) -> FineTuneRequest {
        let log = self.lock_log();
        let feedback_data = log
            .messages()
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role == Role::Assistant)
            .filter_map(|(index, m)| {
                m.feedback.map(|feedback| FeedbackEntry {
                    message_id: index,
                    feedback,
                })
            })
            .collect();

        FineTuneRequest {
            model_name: model_name.into(),
            chat_history: log.dialogue(),
            feedback_data,
        }
    }
}
