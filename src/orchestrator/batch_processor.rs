//! 批量 notebook 处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：写入运行日志头、准备执行器与截图器
//! 2. **批量加载**：扫描 notebook 目录
//! 3. **顺序处理**：一次只处理一个 notebook，单个失败不影响后续
//! 4. **全局统计**：汇总导出 / 跳过 / 警告 / 失败数量

use crate::browser::{Capturer, ChromeCapturer};
use crate::config::Config;
use crate::models::loaders::discover_notebooks;
use crate::orchestrator::notebook_processor::{self, NotebookReport, ProcessResult};
use crate::services::notebook_runner::{NbConvertExecutor, NotebookExecutor};
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// 应用主结构
///
/// 默认使用 nbconvert 执行、chromiumoxide 截图；测试中可替换为其他实现
pub struct App<E = NbConvertExecutor, C = ChromeCapturer> {
    config: Config,
    executor: E,
    capturer: C,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.run_log_file)?;

        log_startup(&config);

        let executor = NbConvertExecutor::new(&config);
        let capturer = ChromeCapturer::new(&config);
        Ok(Self::with_components(config, executor, capturer))
    }
}

impl<E, C> App<E, C>
where
    E: NotebookExecutor,
    C: Capturer,
{
    /// 使用指定的执行器与截图器创建应用
    pub fn with_components(config: Config, executor: E, capturer: C) -> Self {
        Self {
            config,
            executor,
            capturer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 处理 notebook 目录中的所有 notebook
    pub async fn run(&self) -> Result<ProcessingStats> {
        info!("\n📁 正在扫描 {} ...", self.config.notebook_folder.display());
        let notebooks = discover_notebooks(&self.config.notebook_folder).await?;

        if notebooks.is_empty() {
            warn!("⚠️ 没有找到待处理的 .ipynb 文件");
            return Ok(ProcessingStats::default());
        }
        info!("✓ 找到 {} 个 notebook", notebooks.len());

        let stats = self.process_all(&notebooks).await;
        print_final_stats(&stats, &self.config);

        Ok(stats)
    }

    /// 只处理指定的 notebook
    pub async fn run_single(&self, notebook: &Path) -> Result<NotebookReport> {
        notebook_processor::process_notebook(notebook, &self.executor, &self.capturer, &self.config)
            .await
    }

    async fn process_all(&self, notebooks: &[PathBuf]) -> ProcessingStats {
        let mut stats = ProcessingStats {
            total: notebooks.len(),
            ..Default::default()
        };

        for (idx, notebook) in notebooks.iter().enumerate() {
            info!("[{}/{}] {}", idx + 1, notebooks.len(), notebook.display());
            match self.run_single(notebook).await {
                Ok(report) => stats.record(&report.result),
                Err(e) => {
                    error!("❌ 处理 {} 时发生错误: {:#}", notebook.display(), e);
                    stats.failed += 1;
                }
            }
        }

        stats
    }
}

/// 处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub exported: usize,
    pub skipped: usize,
    pub warned: usize,
    pub failed: usize,
    pub total: usize,
}

impl ProcessingStats {
    pub fn record(&mut self, result: &ProcessResult) {
        match result {
            ProcessResult::Exported(_) => self.exported += 1,
            ProcessResult::Skipped => self.skipped += 1,
            ProcessResult::Warned(_) => self.warned += 1,
            ProcessResult::Failed(_) => self.failed += 1,
        }
    }
}

// ========== 日志辅助函数 ==========

fn init_log_file(log_file_path: &Path) -> Result<()> {
    let log_header = format!(
        "{}\nnotebook 批处理日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - notebook 批量导出");
    info!("📂 notebook 目录: {}", config.notebook_folder.display());
    info!("🔑 可视化变量名: {}", config.variable_name);
    info!("{}", "=".repeat(60));
}

fn print_final_stats(stats: &ProcessingStats, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 导出: {}/{}", stats.exported, stats.total);
    info!("⏭️ 跳过: {}", stats.skipped);
    info!("⚠️ 警告: {}", stats.warned);
    info!("❌ 失败: {}", stats.failed);
    info!("{}", "=".repeat(60));
    if stats.warned + stats.failed > 0 {
        info!("\n警告记录见: {}", config.warn_file.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_record() {
        let mut stats = ProcessingStats::default();
        stats.record(&ProcessResult::Skipped);
        stats.record(&ProcessResult::Exported(crate::models::VizLibrary::Plotly));
        stats.record(&ProcessResult::Warned("missing".to_string()));
        stats.record(&ProcessResult::Failed("boom".to_string()));
        stats.record(&ProcessResult::Failed("boom".to_string()));
        assert_eq!(
            stats,
            ProcessingStats {
                exported: 1,
                skipped: 1,
                warned: 1,
                failed: 2,
                total: 0,
            }
        );
    }
}
