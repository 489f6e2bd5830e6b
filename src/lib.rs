//! # duckit
//!
//! 批量执行 Jupyter notebook，把约定变量中的可视化导出为图片，并生成静态画廊
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 启动无头浏览器、对 HTML 预览截图
//! - `infrastructure/` - `JsExecutor`，页面脚本执行与视口调整
//!
//! ### ② 业务能力层（Services）
//! - `export_cell` - 生成注入单元格、解析导出结果
//! - `notebook_runner` - 通过 nbconvert 执行临时 notebook
//! - `gallery` - 生成画廊页面
//! - `publisher` - 发布与打包
//! - `WarnWriter` - 写 warn.txt 能力
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/notebook_processor` - 单个 notebook 的完整流程
//! - `orchestrator/batch_processor` - 批量顺序处理与统计
//!
//! ### ④ 入口（Admin / CLI）
//! - `admin/` - axum 管理面板
//! - `main.rs` - clap 命令行
//!
//! ## 模块结构

pub mod admin;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use browser::{Capturer, ChromeCapturer};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{ArtifactPaths, Notebook, VizLibrary};
pub use orchestrator::{process_notebook, App, NotebookReport, ProcessResult, ProcessingStats};
pub use services::{NbConvertExecutor, NotebookExecutor};
