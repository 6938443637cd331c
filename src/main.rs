//! # ChatMark - 桌面应用原生入口点
//!
//! `main()` 只负责调用 `app_lib::run()`，插件注册、状态初始化、
//! command 注册等逻辑都在 `lib.rs` 中完成。

// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    app_lib::run();
}
