//! # 聊天状态存储
//!
//! 界面侧的单一状态对象，协调聊天目录、选中聊天和保存操作。
//! 启动时构造一次，显式传给所有使用方（桌面端作为 Tauri managed state），
//! 不存在任何模块级全局状态。
//!
//! ## 聊天目录
//! - 首次访问时惰性加载一次；加载完成前 `snapshot()` 返回 `None`（待定状态）
//! - 首次加载失败时保持待定，下一次访问会重试
//! - 新建：前置新条目（去重同名条目）并选中
//! - 删除：移除条目并清除选中
//! - 保存：更新条目的 `lastEditTime` 并重新按时间降序排列；
//!   写入失败时发布 `SaveFailed`，界面据此提示用户
//!
//! ## 选中聊天
//! 按标题选中（稳定标识），目录重新排序后选中项不会漂移；
//! `selected_index()` 仅用于列表高亮，每次从当前目录推导。
//! 选中聊天的内容在每次访问时通过 `readChat` 读取，始终反映最新的目录与选中状态。
//!
//! ## 变更通知
//! 每次状态变化后向订阅者发布 `StoreEvent`。通知在释放状态锁之后发出，
//! 订阅者回调中可以安全地再次读取状态。
//!
//! ## 锁
//! 状态使用 `std::sync::RwLock`，只在同步辅助函数内短暂持有，从不跨越 `.await`。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::sync::OnceCell;

use crate::error::ChatError;
use crate::models::chat::{ChatInfo, SelectedChat};
use crate::services::autosave::SaveTarget;
use crate::services::bridge::ChatBridge;
use crate::utils::time::now_millis;

/// 状态变更事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StoreEvent {
    /// 聊天目录已（重新）加载
    ChatsLoaded { count: usize },
    /// 新建了聊天
    ChatCreated { title: String },
    /// 删除了聊天
    ChatDeleted { title: String },
    /// 聊天内容已保存
    #[serde(rename_all = "camelCase")]
    ChatSaved { title: String, last_edit_time: u64 },
    /// 选中聊天发生变化
    SelectionChanged { title: Option<String> },
    /// 写入磁盘失败，内容未保存
    SaveFailed { title: String, message: String },
}

/// 订阅者回调
pub type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// 订阅句柄，用于取消订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Default)]
struct StoreState {
    /// 聊天目录缓存；`None` 表示尚未加载
    chats: Option<Vec<ChatInfo>>,
    /// 选中聊天的标题
    selected: Option<String>,
}

/// 聊天状态存储
pub struct ChatStore<B> {
    bridge: B,
    /// 首次加载闸门：保证并发的首次访问只触发一次 `getChats`
    loaded: OnceCell<()>,
    state: RwLock<StoreState>,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_listener_id: AtomicU64,
}

/// 按最后编辑时间降序排列
fn sort_by_recency(chats: &mut [ChatInfo]) {
    chats.sort_by(|a, b| b.last_edit_time.cmp(&a.last_edit_time));
}

impl<B: ChatBridge> ChatStore<B> {
    pub fn new(bridge: B) -> Self {
        Self {
            bridge,
            loaded: OnceCell::new(),
            state: RwLock::new(StoreState::default()),
            listeners: RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    // ======== 内部辅助 ========

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: StoreEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener(&event);
        }
    }

    /// 用新的目录替换缓存；选中的聊天已不存在时清除选中
    ///
    /// 返回选中状态是否被清除
    fn replace_chats(&self, mut chats: Vec<ChatInfo>) -> bool {
        sort_by_recency(&mut chats);
        let mut state = self.write_state();
        let dropped = state
            .selected
            .as_ref()
            .is_some_and(|title| !chats.iter().any(|c| &c.title == title));
        if dropped {
            state.selected = None;
        }
        state.chats = Some(chats);
        dropped
    }

    /// 目录已加载且有选中聊天时返回选中的目录条目
    fn selected_entry(&self) -> Option<ChatInfo> {
        let state = self.read_state();
        let title = state.selected.as_ref()?;
        state.chats.as_ref()?.iter().find(|c| &c.title == title).cloned()
    }

    // ======== 订阅 ========

    /// 订阅状态变更
    pub fn subscribe(&self, listener: impl Fn(&StoreEvent) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// 取消订阅；返回该订阅是否存在
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    // ======== 聊天目录 ========

    /// 当前目录快照；尚未加载时返回 `None`
    pub fn snapshot(&self) -> Option<Vec<ChatInfo>> {
        self.read_state().chats.clone()
    }

    /// 确保目录已加载（惰性，只加载一次）
    pub async fn ensure_loaded(&self) -> Result<(), ChatError> {
        self.loaded
            .get_or_try_init(|| async {
                let chats = self.bridge.get_chats().await?;
                let count = chats.len();
                self.replace_chats(chats);
                log::info!("聊天目录已加载: {} 个聊天", count);
                self.notify(StoreEvent::ChatsLoaded { count });
                Ok::<(), ChatError>(())
            })
            .await?;
        Ok(())
    }

    /// 获取聊天目录（必要时先加载）
    pub async fn chats(&self) -> Result<Vec<ChatInfo>, ChatError> {
        self.ensure_loaded().await?;
        Ok(self.snapshot().unwrap_or_default())
    }

    /// 显式从磁盘重新加载目录
    ///
    /// 没有文件系统监听，外部进程对根目录的修改只能通过此操作同步。
    /// 选中的聊天若已不存在，会同时清除选中。
    pub async fn refresh(&self) -> Result<Vec<ChatInfo>, ChatError> {
        if self.loaded.initialized() {
            let chats = self.bridge.get_chats().await?;
            let count = chats.len();
            let dropped = self.replace_chats(chats);
            self.notify(StoreEvent::ChatsLoaded { count });
            if dropped {
                self.notify(StoreEvent::SelectionChanged { title: None });
            }
        } else {
            self.ensure_loaded().await?;
        }
        Ok(self.snapshot().unwrap_or_default())
    }

    // ======== 选中聊天 ========

    pub fn selected_title(&self) -> Option<String> {
        self.read_state().selected.clone()
    }

    /// 选中聊天在当前目录中的位置
    pub fn selected_index(&self) -> Option<usize> {
        let state = self.read_state();
        let title = state.selected.as_ref()?;
        state.chats.as_ref()?.iter().position(|c| &c.title == title)
    }

    /// 按标题选中聊天；`None` 清除选中
    ///
    /// # 错误
    /// 标题不在目录中时返回 `NotFound`
    pub async fn select(&self, title: Option<&str>) -> Result<(), ChatError> {
        self.ensure_loaded().await?;

        let changed = {
            let mut state = self.write_state();
            if let Some(title) = title {
                let known = state
                    .chats
                    .as_ref()
                    .is_some_and(|chats| chats.iter().any(|c| c.title == title));
                if !known {
                    return Err(ChatError::NotFound(title.to_string()));
                }
            }
            let next = title.map(str::to_string);
            let changed = state.selected != next;
            state.selected = next;
            changed
        };

        if changed {
            self.notify(StoreEvent::SelectionChanged {
                title: title.map(str::to_string),
            });
        }
        Ok(())
    }

    /// 按目录中的位置选中聊天，位置立即解析为标题
    ///
    /// # 错误
    /// 位置越界时返回 `IndexOutOfBounds`
    pub async fn select_index(&self, index: Option<usize>) -> Result<(), ChatError> {
        self.ensure_loaded().await?;

        let title = match index {
            None => None,
            Some(index) => {
                let chats = self.snapshot().unwrap_or_default();
                let len = chats.len();
                let info = chats
                    .into_iter()
                    .nth(index)
                    .ok_or(ChatError::IndexOutOfBounds { index, len })?;
                Some(info.title)
            }
        };

        self.select(title.as_deref()).await
    }

    /// 当前打开的聊天：目录条目 + 读取到的内容
    ///
    /// 目录尚未加载或没有选中聊天时返回 `None`
    pub async fn selected_chat(&self) -> Result<Option<SelectedChat>, ChatError> {
        let Some(info) = self.selected_entry() else {
            return Ok(None);
        };
        let content = self.bridge.read_chat(&info.title).await?;
        Ok(Some(SelectedChat::new(info, content)))
    }

    // ======== 变更操作 ========

    /// 保存选中聊天的内容
    ///
    /// 写入磁盘后将目录条目的 `lastEditTime` 更新为当前时间并重新排序。
    /// 没有选中聊天或目录尚未加载时什么也不做。
    pub async fn save(&self, content: &str) -> Result<(), ChatError> {
        let Some(info) = self.selected_entry() else {
            return Ok(());
        };
        self.save_to(&info.title, content).await
    }

    /// 保存指定聊天的内容，不要求它是当前选中的聊天
    ///
    /// # 错误
    /// - 标题不在已加载的目录中时返回 `NotFound`
    /// - 写入失败时返回错误，并发布 `SaveFailed` 事件
    pub async fn save_to(&self, title: &str, content: &str) -> Result<(), ChatError> {
        let known = self
            .read_state()
            .chats
            .as_ref()
            .is_some_and(|chats| chats.iter().any(|c| c.title == title));
        if !known {
            return Err(ChatError::NotFound(title.to_string()));
        }

        if let Err(e) = self.bridge.write_chat(title, content).await {
            log::error!("保存聊天失败: {} - {}", title, e);
            self.notify(StoreEvent::SaveFailed {
                title: title.to_string(),
                message: e.to_string(),
            });
            return Err(e);
        }

        let last_edit_time = now_millis();
        let touched = {
            let mut state = self.write_state();
            match state.chats.as_mut() {
                Some(chats) => {
                    let entry = chats.iter_mut().find(|c| c.title == title);
                    let touched = entry
                        .map(|entry| entry.last_edit_time = last_edit_time)
                        .is_some();
                    sort_by_recency(chats);
                    touched
                }
                None => false,
            }
        };

        if touched {
            self.notify(StoreEvent::ChatSaved {
                title: title.to_string(),
                last_edit_time,
            });
        }
        Ok(())
    }

    /// 清空选中聊天的内容
    ///
    /// # 返回值
    /// 没有选中聊天时返回 `false`
    pub async fn clear_selected(&self) -> Result<bool, ChatError> {
        if self.selected_entry().is_none() {
            return Ok(false);
        }
        self.save("").await?;
        Ok(true)
    }

    /// 新建聊天：前置到目录（去重同名条目）并选中
    ///
    /// # 返回值
    /// 用户取消或路径越界时返回 `None`
    pub async fn create(&self) -> Result<Option<String>, ChatError> {
        self.ensure_loaded().await?;

        let Some(title) = self.bridge.create_chat().await? else {
            return Ok(None);
        };

        {
            let mut state = self.write_state();
            let chats = state.chats.get_or_insert_with(Vec::new);
            chats.retain(|c| c.title != title);
            chats.insert(
                0,
                ChatInfo {
                    title: title.clone(),
                    last_edit_time: now_millis(),
                },
            );
            state.selected = Some(title.clone());
        }

        self.notify(StoreEvent::ChatCreated {
            title: title.clone(),
        });
        self.notify(StoreEvent::SelectionChanged {
            title: Some(title.clone()),
        });
        Ok(Some(title))
    }

    /// 删除选中的聊天并清除选中
    ///
    /// # 返回值
    /// 没有选中聊天或用户取消时返回 `false`
    pub async fn delete(&self) -> Result<bool, ChatError> {
        let Some(info) = self.selected_entry() else {
            return Ok(false);
        };

        if !self.bridge.delete_chat(&info.title).await? {
            return Ok(false);
        }

        {
            let mut state = self.write_state();
            if let Some(chats) = state.chats.as_mut() {
                chats.retain(|c| c.title != info.title);
            }
            state.selected = None;
        }

        self.notify(StoreEvent::ChatDeleted { title: info.title });
        self.notify(StoreEvent::SelectionChanged { title: None });
        Ok(true)
    }
}

impl<B: ChatBridge> SaveTarget for ChatStore<B> {
    fn can_save(&self) -> bool {
        self.selected_entry().is_some()
    }

    async fn save(&self, content: &str) -> Result<(), ChatError> {
        ChatStore::save(self, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingBridge;
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    fn seeded(titles: &[&str]) -> (tempfile::TempDir, ChatStore<RecordingBridge>) {
        let dir = tempfile::tempdir().unwrap();
        for title in titles {
            std::fs::write(dir.path().join(format!("{}.json", title)), "[]").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(15));
        }
        let store = ChatStore::new(RecordingBridge::new(dir.path()));
        (dir, store)
    }

    fn titles(chats: &[ChatInfo]) -> Vec<&str> {
        chats.iter().map(|c| c.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_directory_loads_lazily_once() {
        let (_dir, store) = seeded(&["a", "b"]);
        assert_eq!(store.snapshot(), None);
        assert_eq!(store.bridge().lists.load(Ordering::SeqCst), 0);

        let first = store.chats().await.unwrap();
        let second = store.chats().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(titles(&first), vec!["b", "a"]);
        assert_eq!(store.bridge().lists.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_initial_load_is_retried() {
        let (_dir, store) = seeded(&["a"]);
        store.bridge().fail_next_list();

        assert!(store.chats().await.is_err());
        assert_eq!(store.snapshot(), None);

        assert_eq!(titles(&store.chats().await.unwrap()), vec!["a"]);
        assert_eq!(store.bridge().lists.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_create_prepends_dedupes_and_selects() {
        let (dir, store) = seeded(&["a", "b"]);
        store.chats().await.unwrap();

        store
            .bridge()
            .prompter()
            .set_save_path(Some(dir.path().join("a.json")));
        assert_eq!(store.create().await.unwrap().as_deref(), Some("a"));

        let chats = store.snapshot().unwrap();
        assert_eq!(titles(&chats), vec!["a", "b"]);
        assert_eq!(store.selected_title().as_deref(), Some("a"));
        assert_eq!(store.selected_index(), Some(0));
    }

    #[tokio::test]
    async fn test_create_cancelled_changes_nothing() {
        let (_dir, store) = seeded(&["a"]);
        store.chats().await.unwrap();
        assert_eq!(store.create().await.unwrap(), None);
        assert_eq!(titles(&store.snapshot().unwrap()), vec!["a"]);
        assert_eq!(store.selected_title(), None);
    }

    #[tokio::test]
    async fn test_delete_removes_and_clears_selection() {
        let (dir, store) = seeded(&["a", "b"]);
        store.select(Some("a")).await.unwrap();

        // 用户取消
        assert!(!store.delete().await.unwrap());
        assert_eq!(store.selected_title().as_deref(), Some("a"));

        store.bridge().prompter().set_confirm(true);
        assert!(store.delete().await.unwrap());
        assert_eq!(titles(&store.snapshot().unwrap()), vec!["b"]);
        assert_eq!(store.selected_title(), None);
        assert!(!dir.path().join("a.json").exists());

        // 刷新后仍然不包含已删除的聊天
        assert_eq!(titles(&store.refresh().await.unwrap()), vec!["b"]);
    }

    #[tokio::test]
    async fn test_save_bumps_time_and_resorts_without_losing_selection() {
        let (_dir, store) = seeded(&["old", "new"]);
        store.select(Some("old")).await.unwrap();
        assert_eq!(store.selected_index(), Some(1));

        let content = r#"[{"role":"user","content":"hi"}]"#;
        store.save(content).await.unwrap();

        let chats = store.snapshot().unwrap();
        assert_eq!(titles(&chats), vec!["old", "new"]);
        assert!(chats[0].last_edit_time >= chats[1].last_edit_time);
        assert_eq!(store.selected_title().as_deref(), Some("old"));
        assert_eq!(store.selected_index(), Some(0));

        let selected = store.selected_chat().await.unwrap().unwrap();
        assert_eq!(selected.title, "old");
        assert_eq!(selected.content, content);
    }

    #[tokio::test]
    async fn test_save_without_selection_is_noop() {
        let (_dir, store) = seeded(&["a"]);
        // 目录尚未加载
        store.save("x").await.unwrap();
        store.chats().await.unwrap();
        // 已加载但未选中
        store.save("x").await.unwrap();
        assert!(!store.clear_selected().await.unwrap());
        assert_eq!(store.bridge().write_count(), 0);
        assert_eq!(store.selected_chat().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_selected_writes_empty_content() {
        let (_dir, store) = seeded(&["a"]);
        store.select(Some("a")).await.unwrap();
        assert!(store.clear_selected().await.unwrap());
        assert_eq!(store.selected_chat().await.unwrap().unwrap().content, "");
    }

    #[tokio::test]
    async fn test_select_validation() {
        let (_dir, store) = seeded(&["a", "b"]);
        assert!(matches!(
            store.select(Some("zzz")).await,
            Err(ChatError::NotFound(_))
        ));
        assert!(matches!(
            store.select_index(Some(2)).await,
            Err(ChatError::IndexOutOfBounds { index: 2, len: 2 })
        ));

        store.select_index(Some(1)).await.unwrap();
        assert_eq!(store.selected_title().as_deref(), Some("a"));
        store.select_index(None).await.unwrap();
        assert_eq!(store.selected_title(), None);
    }

    #[tokio::test]
    async fn test_refresh_drops_selection_of_vanished_chat() {
        let (dir, store) = seeded(&["a", "b"]);
        store.select(Some("a")).await.unwrap();

        std::fs::remove_file(dir.path().join("a.json")).unwrap();
        assert_eq!(titles(&store.refresh().await.unwrap()), vec!["b"]);
        assert_eq!(store.selected_title(), None);
    }

    #[tokio::test]
    async fn test_listeners_receive_events() {
        let (_dir, store) = seeded(&["a"]);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let id = store.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        store.select(Some("a")).await.unwrap();
        store.save("[]").await.unwrap();

        {
            let events = events.lock().unwrap();
            assert_eq!(events[0], StoreEvent::ChatsLoaded { count: 1 });
            assert_eq!(
                events[1],
                StoreEvent::SelectionChanged {
                    title: Some("a".into())
                }
            );
            assert!(matches!(&events[2], StoreEvent::ChatSaved { title, .. } if title == "a"));
        }

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.select(None).await.unwrap();
        assert_eq!(events.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_save_to_updates_unselected_chat() {
        let (_dir, store) = seeded(&["a", "b"]);
        store.select(Some("a")).await.unwrap();

        store.save_to("b", "[]").await.unwrap();
        assert_eq!(store.selected_title().as_deref(), Some("a"));
        assert_eq!(titles(&store.snapshot().unwrap()), vec!["b", "a"]);
        assert!(matches!(
            store.save_to("gone", "[]").await,
            Err(ChatError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_publishes_save_failed() {
        let (_dir, store) = seeded(&["a"]);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        store.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        store.select(Some("a")).await.unwrap();

        store.bridge().fail_next_write();
        assert!(store.save("[]").await.is_err());

        let events = events.lock().unwrap();
        assert!(matches!(
            events.last(),
            Some(StoreEvent::SaveFailed { title, .. }) if title == "a"
        ));
        assert!(!events.iter().any(|e| matches!(e, StoreEvent::ChatSaved { .. })));
    }

    #[test]
    fn test_event_serialization() {
        let value = serde_json::to_value(StoreEvent::ChatSaved {
            title: "a".into(),
            last_edit_time: 7,
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "chatSaved", "title": "a", "lastEditTime": 7})
        );
    }
}
