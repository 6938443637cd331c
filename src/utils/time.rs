//! # 时间工具函数
//!
//! 全部时间戳统一为 Unix 毫秒，与前端 `Date.now()` / `stat.mtimeMs` 一致。

use std::time::{SystemTime, UNIX_EPOCH};

/// 当前 Unix 毫秒时间戳
pub fn now_millis() -> u64 {
    system_time_to_millis(SystemTime::now())
}

/// 将 `SystemTime` 转换为 Unix 毫秒时间戳
///
/// 早于 Unix epoch 的时间（不太可能出现）按 0 处理。
pub fn system_time_to_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_system_time_to_millis() {
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(system_time_to_millis(t), 1_700_000_000_123);
        assert_eq!(system_time_to_millis(UNIX_EPOCH - Duration::from_secs(1)), 0);
    }
}
