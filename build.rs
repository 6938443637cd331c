//! # ChatMark - Cargo 构建脚本
//!
//! 启用 `desktop` 特性时，调用 Tauri 的构建前处理：
//! - 根据 `tauri.conf.json` 生成运行时所需的上下文资源
//! - 处理应用图标、权限清单（capabilities）等静态资源
//! - 在 Windows 平台上生成应用程序清单和资源文件
//!
//! 未启用 `desktop` 时只编译核心库，无需任何构建前处理。

/// 构建脚本入口函数
fn main() {
    #[cfg(feature = "desktop")]
    tauri_build::build()
}
