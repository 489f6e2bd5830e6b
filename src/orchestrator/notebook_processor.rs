//! 单个 notebook 处理器 - 编排层
//!
//! 流程：跳过检查 → 注入并执行 → （必要时）截图 → 写标记文件 → 记录警告
//!
//! 任何一步失败都只影响当前 notebook，已生成的文件留在原处供人工检查

use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::browser::Capturer;
use crate::config::Config;
use crate::error::{AppError, ExecutionError};
use crate::models::artifact::{ArtifactPaths, VizLibrary};
use crate::models::marker::{ExportMarker, MarkerStatus};
use crate::services::export_cell::ExportOutcome;
use crate::services::notebook_runner::{run_with_export, NotebookExecutor};
use crate::services::WarnWriter;
use crate::utils::text::{tail_lines, truncate_text};

/// 单个 notebook 的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// 图片已存在，未重新处理
    Skipped,
    /// 成功导出图片
    Exported(VizLibrary),
    /// 正常执行但没有导出（缺少变量 / 类型不支持）
    Warned(String),
    /// 执行、导出或截图失败
    Failed(String),
}

impl fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessResult::Skipped => write!(f, "已跳过（图片已存在）"),
            ProcessResult::Exported(library) => write!(f, "导出成功 ({})", library),
            ProcessResult::Warned(reason) => write!(f, "警告: {}", reason),
            ProcessResult::Failed(reason) => write!(f, "失败: {}", reason),
        }
    }
}

/// 单个 notebook 的处理报告
#[derive(Debug, Clone)]
pub struct NotebookReport {
    pub notebook: String,
    pub result: ProcessResult,
    /// 图片路径（存在时）
    pub image: Option<PathBuf>,
}

/// 处理单个 notebook
///
/// 只有 notebook 路径本身无效时才返回 Err，其余失败体现在 [`ProcessResult`] 中
pub async fn process_notebook<E, C>(
    notebook: &Path,
    executor: &E,
    capturer: &C,
    config: &Config,
) -> Result<NotebookReport>
where
    E: NotebookExecutor,
    C: Capturer,
{
    let paths = ArtifactPaths::for_notebook(notebook, &config.scratch_folder)?;
    let notebook_name = notebook
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    if paths.image_exists() {
        info!("图片 {} 已存在，跳过处理", paths.image.display());
        return Ok(NotebookReport {
            notebook: notebook_name,
            result: ProcessResult::Skipped,
            image: Some(paths.image),
        });
    }

    info!("{}", "-".repeat(50));
    info!("📓 处理 notebook: {}", notebook.display());

    let mut marker = ExportMarker::new(&notebook_name, MarkerStatus::Exported);
    let result = export_notebook(&paths, executor, capturer, config, &mut marker).await;

    if paths.image_exists() {
        marker.image = Some(paths.image.clone());
    }
    if paths.html.exists() {
        marker.html = Some(paths.html.clone());
    }
    if let Err(e) = marker.write_to(&paths.marker) {
        warn!("⚠️ 写入标记文件失败: {}", e);
    }

    match &result {
        ProcessResult::Exported(library) => {
            info!("✅ {} 导出完成 ({})", notebook_name, library);
        }
        ProcessResult::Warned(reason) | ProcessResult::Failed(reason) => {
            let writer = WarnWriter::with_path(&config.warn_file);
            if let Err(e) = writer.write(&notebook_name, reason).await {
                warn!("⚠️ 写入警告文件失败: {}", e);
            }
        }
        ProcessResult::Skipped => {}
    }

    Ok(NotebookReport {
        notebook: notebook_name,
        image: paths.image_exists().then(|| paths.image.clone()),
        result,
    })
}

async fn export_notebook<E, C>(
    paths: &ArtifactPaths,
    executor: &E,
    capturer: &C,
    config: &Config,
    marker: &mut ExportMarker,
) -> ProcessResult
where
    E: NotebookExecutor,
    C: Capturer,
{
    let run = match run_with_export(executor, paths, &config.variable_name).await {
        Ok(run) => run,
        Err(e) => {
            error!("❌ 执行 {} 失败: {}", paths.notebook.display(), e);
            marker.status = MarkerStatus::ExecutionFailed;
            if let AppError::Execution(ExecutionError::Failed { stderr, .. }) = &e {
                let tail = tail_lines(stderr, 20);
                if !tail.is_empty() {
                    error!("{}", tail);
                    marker.messages.push(tail);
                }
            }
            return ProcessResult::Failed(e.to_string());
        }
    };

    match run.export {
        ExportOutcome::Exported { library, target } => {
            marker.library = Some(library);
            info!("✓ 检测到 {}，导出目标: {:?}", library, target);
        }
        ExportOutcome::MissingVariable => {
            let reason = format!("没有找到变量 '{}'", config.variable_name);
            warn!("⚠️ {}", reason);
            marker.status = MarkerStatus::MissingVariable;
            marker.messages.push(reason.clone());
            return ProcessResult::Warned(reason);
        }
        ExportOutcome::Unsupported(type_name) => {
            let reason = format!("不支持的类型: {}", type_name);
            warn!("⚠️ {}", reason);
            marker.status = MarkerStatus::UnsupportedType;
            marker.messages.push(reason.clone());
            return ProcessResult::Warned(reason);
        }
        ExportOutcome::ExportError(message) => {
            let reason = format!("导出时出错: {}", truncate_text(&message, 300));
            error!("❌ {}", reason);
            marker.status = MarkerStatus::ExportError;
            marker.messages.push(message);
            return ProcessResult::Failed(reason);
        }
        ExportOutcome::NoReport => {
            let reason = "导出单元格没有产生任何结果".to_string();
            error!("❌ {}", reason);
            marker.status = MarkerStatus::ExportError;
            marker.messages.push(reason.clone());
            return ProcessResult::Failed(reason);
        }
    }

    let library = marker.library;

    // HTML 导出需要截图
    if paths.html.exists() && !paths.image_exists() {
        match capturer.capture(&paths.html, &paths.image).await {
            Ok(report) => {
                if let Some(sniffed) = report.library {
                    info!("✓ 截图完成 (页面识别为 {})", sniffed);
                }
                if report.selector.is_some() && !report.selector_found {
                    marker
                        .messages
                        .push("等待可视化元素超时，截图可能不完整".to_string());
                }
            }
            Err(e) => {
                error!("❌ 截图失败: {:#}", e);
                marker.status = MarkerStatus::ExportError;
                marker.messages.push(format!("截图失败: {:#}", e));
                return ProcessResult::Failed(format!("截图失败: {}", e));
            }
        }
        if !config.keep_html {
            if let Err(e) = tokio::fs::remove_file(&paths.html).await {
                warn!("⚠️ 删除 HTML 失败 {}: {}", paths.html.display(), e);
            }
        }
    }

    match library {
        Some(library) if paths.image_exists() => ProcessResult::Exported(library),
        _ => {
            let reason = "导出完成但没有找到图片".to_string();
            marker.status = MarkerStatus::ExportError;
            marker.messages.push(reason.clone());
            ProcessResult::Failed(reason)
        }
    }
}
