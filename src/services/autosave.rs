//! # 编辑器自动保存
//!
//! 将编辑器的连续输入节流为对存储的少量写入：
//! - 仅尾沿触发：窗口内的多次输入只在窗口结束时保存一次，内容取最新一次输入
//! - 失焦：取消待执行的保存并立即保存最新内容
//! - 卸载（`cancel()` 或 drop）：丢弃待执行的保存
//! - 没有选中聊天时忽略输入
//! - 定时保存失败时不会重试；`ChatStore` 作为写入目标会发布 `SaveFailed` 事件，
//!   界面收到后提示用户，编辑器中的内容仍在，下次输入或失焦会再次保存
//!
//! 窗口期在第一次输入时开始计时，之后的输入只替换待保存内容，不会推迟保存时间，
//! 持续输入时每个窗口至少落盘一次。

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::ChatError;

/// 自动保存的写入目标
pub trait SaveTarget: Send + Sync + 'static {
    /// 当前是否有可保存的对象（例如已选中聊天）
    fn can_save(&self) -> bool;

    /// 保存内容
    fn save(&self, content: &str) -> impl Future<Output = Result<(), ChatError>> + Send;
}

struct PendingSave {
    content: String,
    handle: JoinHandle<()>,
}

type PendingSlot = Arc<Mutex<Option<PendingSave>>>;

fn lock(slot: &Mutex<Option<PendingSave>>) -> MutexGuard<'_, Option<PendingSave>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 尾沿节流的自动保存器
pub struct AutoSaver<T: SaveTarget> {
    target: Arc<T>,
    window: Duration,
    pending: PendingSlot,
}

impl<T: SaveTarget> AutoSaver<T> {
    pub fn new(target: Arc<T>, window: Duration) -> Self {
        Self {
            target,
            window,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 是否有待执行的保存
    pub fn has_pending(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// 编辑器内容变化
    ///
    /// 必须在 tokio runtime 中调用。
    pub fn input(&self, content: impl Into<String>) {
        if !self.target.can_save() {
            return;
        }

        let content = content.into();
        let mut pending = lock(&self.pending);
        if let Some(save) = pending.as_mut() {
            save.content = content;
            return;
        }

        let target = Arc::clone(&self.target);
        let slot = Arc::clone(&self.pending);
        let deadline = tokio::time::Instant::now() + self.window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let content = lock(&slot).take().map(|save| save.content);
            if let Some(content) = content {
                if let Err(e) = target.save(&content).await {
                    log::warn!("自动保存失败，等待下次输入或失焦重试: {}", e);
                }
            }
        });

        *pending = Some(PendingSave { content, handle });
    }

    /// 编辑器失焦：取消待执行的保存并立即保存
    ///
    /// # 参数
    /// - `content`: 编辑器当前内容；为 `None` 时使用待保存的内容
    ///
    /// # 返回值
    /// 实际执行了保存时返回 `true`
    pub async fn blur(&self, content: Option<String>) -> Result<bool, ChatError> {
        let pending = self.take_pending();
        let Some(content) = content.or(pending) else {
            return Ok(false);
        };
        if !self.target.can_save() {
            return Ok(false);
        }

        self.target.save(&content).await?;
        Ok(true)
    }

    /// 丢弃待执行的保存；返回是否有保存被丢弃
    pub fn cancel(&self) -> bool {
        self.take_pending().is_some()
    }

    fn take_pending(&self) -> Option<String> {
        let save = lock(&self.pending).take()?;
        save.handle.abort();
        Some(save.content)
    }
}

impl<T: SaveTarget> Drop for AutoSaver<T> {
    fn drop(&mut self) {
        self.take_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct Recorder {
        inactive: AtomicBool,
        saves: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn saves(&self) -> Vec<String> {
            self.saves.lock().unwrap().clone()
        }
    }

    impl SaveTarget for Recorder {
        fn can_save(&self) -> bool {
            !self.inactive.load(Ordering::SeqCst)
        }

        async fn save(&self, content: &str) -> Result<(), ChatError> {
            self.saves.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }

    const WINDOW: Duration = Duration::from_millis(3000);

    fn saver() -> (Arc<Recorder>, AutoSaver<Recorder>) {
        let target = Arc::new(Recorder::default());
        let saver = AutoSaver::new(Arc::clone(&target), WINDOW);
        (target, saver)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_window_saves_once_with_latest() {
        let (target, saver) = saver();
        for i in 0..5 {
            saver.input(format!("draft {}", i));
            tokio::time::advance(Duration::from_millis(200)).await;
        }
        assert!(target.saves().is_empty());

        tokio::time::sleep(WINDOW).await;
        assert_eq!(target.saves(), vec!["draft 4"]);
        assert!(!saver.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_save_separately() {
        let (target, saver) = saver();
        saver.input("first");
        tokio::time::sleep(WINDOW * 2).await;
        saver.input("second");
        tokio::time::sleep(WINDOW * 2).await;
        assert_eq!(target.saves(), vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blur_saves_immediately_and_cancels_pending() {
        let (target, saver) = saver();
        saver.input("typed");
        assert!(saver.blur(Some("final".into())).await.unwrap());
        assert_eq!(target.saves(), vec!["final"]);

        tokio::time::sleep(WINDOW * 2).await;
        assert_eq!(target.saves(), vec!["final"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blur_falls_back_to_pending_content() {
        let (target, saver) = saver();
        assert!(!saver.blur(None).await.unwrap());

        saver.input("typed");
        assert!(saver.blur(None).await.unwrap());
        assert_eq!(target.saves(), vec!["typed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_ignored_without_target() {
        let (target, saver) = saver();
        target.inactive.store(true, Ordering::SeqCst);
        saver.input("ignored");
        assert!(!saver.has_pending());
        assert!(!saver.blur(Some("ignored".into())).await.unwrap());

        tokio::time::sleep(WINDOW * 2).await;
        assert!(target.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_discard_pending() {
        let (target, saver) = saver();
        saver.input("dropped");
        assert!(saver.cancel());
        assert!(!saver.cancel());

        saver.input("also dropped");
        drop(saver);

        tokio::time::sleep(WINDOW * 2).await;
        assert!(target.saves().is_empty());
    }

    #[tokio::test]
    async fn test_failed_autosave_is_reported_through_store() {
        use crate::services::store::{ChatStore, StoreEvent};
        use crate::test_utils::RecordingBridge;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("note.json"), "[]").unwrap();
        let store = Arc::new(ChatStore::new(RecordingBridge::new(dir.path())));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        store.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        store.select(Some("note")).await.unwrap();

        tokio::time::pause();
        let saver = AutoSaver::new(Arc::clone(&store), WINDOW);
        store.bridge().fail_next_write();
        saver.input("unsaved");
        tokio::time::sleep(WINDOW * 2).await;

        assert_eq!(store.bridge().write_count(), 1);
        assert!(!saver.has_pending());
        assert!(events.lock().unwrap().iter().any(|e| matches!(
            e,
            StoreEvent::SaveFailed { title, .. } if title == "note"
        )));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("note.json")).unwrap(),
            "[]"
        );
    }

    #[tokio::test]
    async fn test_autosave_through_chat_store() {
        use crate::services::store::ChatStore;
        use crate::test_utils::RecordingBridge;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("note.json"), "[]").unwrap();
        let store = Arc::new(ChatStore::new(RecordingBridge::new(dir.path())));
        let saver = AutoSaver::new(Arc::clone(&store), Duration::from_millis(50));

        // 未选中聊天时不保存
        saver.input("nothing");
        assert!(!saver.has_pending());

        store.select(Some("note")).await.unwrap();
        saver.input("a");
        saver.input("ab");
        saver.input("abc");
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(store.bridge().write_count(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("note.json")).unwrap(),
            "abc"
        );
    }
}
