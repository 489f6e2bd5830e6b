//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量处理器
//! - 扫描 notebook 目录（Vec<PathBuf>）
//! - 逐个委托 notebook_processor，输出全局统计
//!
//! ### `notebook_processor` - 单个 notebook 处理器
//! - 跳过已有图片的 notebook
//! - 注入导出单元格并执行
//! - HTML 导出时截图
//! - 写标记文件与警告记录
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Notebook>)
//!     ↓
//! notebook_processor (处理单个 Notebook)
//!     ↓
//! services (能力层：notebook_runner / export_cell / warn_writer)
//!     ↓
//! browser + infrastructure (截图：HeadlessBrowser / JsExecutor)
//! ```

pub mod batch_processor;
pub mod notebook_processor;

// 重新导出主要类型
pub use batch_processor::{App, ProcessingStats};
pub use notebook_processor::{process_notebook, NotebookReport, ProcessResult};
