//! # 聊天文件存储服务
//!
//! 独占管理聊天根目录（默认 `~/ChatMark/`）下的聊天文档，每个聊天一个文件：
//! `<title>.<ext>`，扩展名由文档格式决定（`json` 或 `md`）。
//!
//! ## 提供的操作
//! - `list` - 列出所有聊天元数据；目录为空时写入一份欢迎文档
//! - `read` / `write` - 按标题读写文档内容
//! - `create` - 通过保存对话框新建空文档（路径必须直接位于根目录下）
//! - `delete` - 确认后删除文档
//!
//! ## 路径安全
//! 所有按标题寻址的操作先校验标题，标题无法寻址根目录以外的文件；
//! 新建时对话框返回的路径若不在根目录下，弹出错误提示并拒绝，从不静默重定向。
//!
//! 除一次对话框交互外，副作用仅限磁盘 I/O，不启动任何后台任务。

use std::path::{Path, PathBuf};

use tokio::task::JoinSet;

use crate::error::ChatError;
use crate::models::chat::{ChatContent, ChatInfo};
use crate::models::settings::DocumentFormat;
use crate::services::prompt::{NewChatDialog, Prompter};
use crate::utils::path::{self, is_directly_under, validate_title};
use crate::utils::time::system_time_to_millis;

/// 根目录为空时写入的欢迎文档标题
pub const WELCOME_CHAT_TITLE: &str = "Welcome";

/// 新建聊天对话框的默认文件名（不含扩展名）
const DEFAULT_NEW_CHAT_TITLE: &str = "Untitled";

/// 欢迎文档模板（随程序打包）
const WELCOME_CHAT_JSON: &str = include_str!("../../resources/welcome_chat.json");
const WELCOME_CHAT_MD: &str = include_str!("../../resources/welcome_chat.md");

/// 并行读取候选文件的元数据，只保留普通文件
async fn collect_chat_infos(candidates: Vec<(String, PathBuf)>) -> Vec<ChatInfo> {
    let mut join_set = JoinSet::new();
    for (title, file_path) in candidates {
        join_set.spawn(async move {
            // metadata 会跟随符号链接，目录等非普通文件被排除
            let metadata = tokio::fs::metadata(&file_path).await.ok()?;
            if !metadata.is_file() {
                return None;
            }
            let mtime = metadata.modified().ok()?;
            Some(ChatInfo {
                title,
                last_edit_time: system_time_to_millis(mtime),
            })
        });
    }

    let mut chats = Vec::new();
    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(Some(info)) => chats.push(info),
            Ok(None) => {}
            Err(e) => log::warn!("读取聊天元数据任务失败: {}", e),
        }
    }
    chats
}

/// 聊天文件存储
#[derive(Debug, Clone)]
pub struct FileStore {
    /// 聊天根目录
    root: PathBuf,
    /// 文档格式：决定扩展名、空文档内容和欢迎模板
    format: DocumentFormat,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, format: DocumentFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    /// 使用默认根目录 `~/ChatMark/`
    pub fn open_default(format: DocumentFormat) -> Result<Self, ChatError> {
        Ok(Self::new(path::get_chats_root()?, format))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// 标题对应的文档路径（先校验标题）
    fn chat_path(&self, title: &str) -> Result<PathBuf, ChatError> {
        validate_title(title)?;
        Ok(self
            .root
            .join(format!("{}.{}", title, self.format.extension())))
    }

    /// 确保根目录存在，递归创建所有缺失的父目录
    async fn ensure_root(&self) -> Result<(), ChatError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ChatError::io("创建聊天目录失败", e))
    }

    fn welcome_template(&self) -> &'static str {
        match self.format {
            DocumentFormat::Json => WELCOME_CHAT_JSON,
            DocumentFormat::Markdown => WELCOME_CHAT_MD,
        }
    }

    /// 列出根目录下的所有聊天
    ///
    /// 1. 确保根目录存在
    /// 2. 收集扩展名匹配的条目
    /// 3. 使用 JoinSet 并行读取每个条目的元数据，排除目录等非普通文件，
    ///    以 mtime 作为 `lastEditTime`
    /// 4. 如果没有任何聊天文件，写入欢迎文档（再次调用时已存在，不会重复写入）
    ///
    /// # 返回值
    /// 按最后编辑时间降序排列的 ChatInfo 数组
    ///
    /// # 错误
    /// 目录无法创建或读取、欢迎文档写入失败时返回 `Io`
    pub async fn list(&self) -> Result<Vec<ChatInfo>, ChatError> {
        self.ensure_root().await?;

        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| ChatError::io("读取聊天目录失败", e))?;

        let ext = self.format.extension();
        let mut candidates = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ChatError::io("遍历聊天目录条目失败", e))?
        {
            let entry_path = entry.path();
            if entry_path.extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
            if let Some(title) = entry_path.file_stem().and_then(|s| s.to_str()) {
                candidates.push((title.to_string(), entry_path.clone()));
            }
        }

        let mut chats = collect_chat_infos(candidates).await;

        if chats.is_empty() {
            log::info!("聊天目录中没有聊天文件，写入欢迎聊天");
            let welcome_path = self.chat_path(WELCOME_CHAT_TITLE)?;
            tokio::fs::write(&welcome_path, self.welcome_template())
                .await
                .map_err(|e| ChatError::io("写入欢迎聊天失败", e))?;
            chats = collect_chat_infos(vec![(WELCOME_CHAT_TITLE.to_string(), welcome_path)]).await;
        }

        // 最近编辑的聊天排在前面
        chats.sort_by(|a, b| b.last_edit_time.cmp(&a.last_edit_time));

        Ok(chats)
    }

    /// 读取聊天内容
    ///
    /// # 错误
    /// - 文档不存在时返回 `NotFound`
    /// - 标题不合法时返回 `PathViolation`
    /// - 其他读取失败返回 `Io`
    pub async fn read(&self, title: &str) -> Result<ChatContent, ChatError> {
        let file_path = self.chat_path(title)?;

        tokio::fs::read_to_string(&file_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ChatError::NotFound(title.to_string()),
                _ => ChatError::io("读取聊天文件失败", e),
            })
    }

    /// 写入（覆盖）聊天内容
    ///
    /// 写入会更新文件 mtime，这是 `lastEditTime` 的唯一来源。
    pub async fn write(&self, title: &str, content: &str) -> Result<(), ChatError> {
        let file_path = self.chat_path(title)?;
        log::info!("写入聊天: {}", title);

        tokio::fs::write(&file_path, content)
            .await
            .map_err(|e| ChatError::io("写入聊天文件失败", e))
    }

    /// 通过保存对话框新建聊天
    ///
    /// 执行流程：
    /// 1. 确保根目录存在
    /// 2. 弹出保存对话框，默认路径 `<root>/Untitled.<ext>`
    /// 3. 用户取消时返回 `None`
    /// 4. 所选路径不直接位于根目录下时，弹出错误提示并返回 `None`
    /// 5. 写入空文档并返回标题
    ///
    /// 对话框已经处理了覆盖确认，选择已有文件时该文件会被清空。
    pub async fn create(&self, prompter: &impl Prompter) -> Result<Option<String>, ChatError> {
        self.ensure_root().await?;

        let ext = self.format.extension();
        let dialog = NewChatDialog {
            title: "New chat".to_string(),
            default_path: self.root.join(format!("{}.{}", DEFAULT_NEW_CHAT_TITLE, ext)),
            filter_name: self.format.filter_name().to_string(),
            extension: ext.to_string(),
        };

        let Some(chosen) = prompter.pick_new_chat_path(dialog).await else {
            log::info!("新建聊天已取消");
            return Ok(None);
        };

        let title = chosen
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .filter(|t| validate_title(t).is_ok());

        let inside_root = is_directly_under(&self.root, &chosen).await;
        let Some(title) = title.filter(|_| inside_root) else {
            log::warn!("拒绝在聊天目录之外新建聊天: {}", chosen.display());
            prompter
                .alert(
                    "Creation failed",
                    &format!(
                        "All chats must be saved under {}.\nAvoid using other directories!",
                        self.root.display()
                    ),
                )
                .await;
            return Ok(None);
        };

        let file_path = self.chat_path(&title)?;
        log::info!("新建聊天: {}", file_path.display());
        tokio::fs::write(&file_path, self.format.empty_document())
            .await
            .map_err(|e| ChatError::io("新建聊天文件失败", e))?;

        Ok(Some(title))
    }

    /// 确认后删除聊天
    ///
    /// # 返回值
    /// 用户取消时返回 `false` 且不做任何修改；删除成功返回 `true`
    ///
    /// # 错误
    /// 确认后删除失败返回 `Io`
    pub async fn delete(&self, title: &str, prompter: &impl Prompter) -> Result<bool, ChatError> {
        let file_path = self.chat_path(title)?;

        if !prompter.confirm_delete(title).await {
            log::info!("删除聊天已取消: {}", title);
            return Ok(false);
        }

        log::info!("删除聊天: {}", title);
        tokio::fs::remove_file(&file_path)
            .await
            .map_err(|e| ChatError::io("删除聊天文件失败", e))?;

        Ok(true)
    }
}
