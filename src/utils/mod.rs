//! # 通用工具函数
//! - `path` - 聊天根目录、配置目录定位与路径安全校验
//! - `time` - Unix 毫秒时间戳

pub mod path;
pub mod time;
