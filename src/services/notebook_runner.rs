//! notebook 执行服务 - 业务能力层
//!
//! 追加注入单元格、调用 nbconvert 执行临时 notebook、读回注入单元格的输出

use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ExecutionError};
use crate::models::artifact::ArtifactPaths;
use crate::models::notebook::Notebook;
use crate::services::export_cell::{self, ExportOutcome};

/// 子进程执行结果
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl ExecutionOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// notebook 执行能力
///
/// 约定：执行结果写回 `notebook` 文件本身（in-place）
pub trait NotebookExecutor {
    fn execute(&self, notebook: &Path) -> impl Future<Output = AppResult<ExecutionOutput>> + Send;
}

/// 通过 `jupyter nbconvert --execute` 执行 notebook
#[derive(Debug, Clone)]
pub struct NbConvertExecutor {
    python: String,
    timeout: Option<Duration>,
}

impl NbConvertExecutor {
    pub fn new(config: &Config) -> Self {
        Self {
            python: config.python_executable.clone(),
            timeout: config.execution_timeout_secs.map(Duration::from_secs),
        }
    }

    fn command(&self, notebook: &Path) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.args(["-m", "jupyter", "nbconvert", "--execute", "--to", "notebook", "--inplace"])
            .arg(notebook)
            .arg("--allow-errors")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl NotebookExecutor for NbConvertExecutor {
    async fn execute(&self, notebook: &Path) -> AppResult<ExecutionOutput> {
        debug!("执行命令: {} -m jupyter nbconvert {}", self.python, notebook.display());
        let start = Instant::now();

        let child = self
            .command(notebook)
            .spawn()
            .map_err(|source| ExecutionError::SpawnFailed {
                program: self.python.clone(),
                source,
            })?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                // 超时后 child 被 drop，kill_on_drop 会结束子进程
                Err(_) => {
                    return Err(ExecutionError::Timeout {
                        secs: limit.as_secs(),
                    }
                    .into())
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|source| ExecutionError::SpawnFailed {
            program: self.python.clone(),
            source,
        })?;

        Ok(ExecutionOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// 执行并导出的结果
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub export: ExportOutcome,
    pub execution: ExecutionOutput,
}

/// 追加注入单元格、执行临时 notebook、解析导出结果
///
/// 临时 notebook 无论成功与否都会被删除
pub async fn run_with_export<E: NotebookExecutor>(
    executor: &E,
    paths: &ArtifactPaths,
    variable_name: &str,
) -> AppResult<RunOutcome> {
    // 内核的工作目录是临时 notebook 所在目录，导出路径必须是绝对路径
    let image = std::path::absolute(&paths.image)
        .map_err(|e| AppError::file_write_failed(paths.image.display().to_string(), e))?;
    let html = std::path::absolute(&paths.html)
        .map_err(|e| AppError::file_write_failed(paths.html.display().to_string(), e))?;

    let mut notebook = Notebook::from_path(&paths.notebook)?;
    notebook.push_cell(export_cell::build_export_cell(variable_name, &image, &html));
    notebook.write_to(&paths.temp_notebook)?;

    info!("▶️ 开始执行 {}...", paths.temp_notebook.display());
    let result = execute_and_collect(executor, paths).await;

    match tokio::fs::remove_file(&paths.temp_notebook).await {
        Ok(()) => debug!("已清理临时文件: {}", paths.temp_notebook.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("清理临时文件失败 {}: {}", paths.temp_notebook.display(), e),
    }

    result
}

async fn execute_and_collect<E: NotebookExecutor>(
    executor: &E,
    paths: &ArtifactPaths,
) -> AppResult<RunOutcome> {
    let execution = executor.execute(&paths.temp_notebook).await?;

    if !execution.success() {
        return Err(ExecutionError::Failed {
            exit_code: execution.exit_code,
            stderr: execution.stderr,
        }
        .into());
    }
    info!("✓ 执行完成 ({} ms)", execution.duration_ms);

    let executed = Notebook::from_path(&paths.temp_notebook)?;
    let export = executed
        .cells
        .iter()
        .rev()
        .find(|cell| export_cell::is_export_cell(cell))
        .map(|cell| {
            export_cell::parse_export_report(&cell.stream_text("stdout"), &cell.stream_text("stderr"))
        })
        .unwrap_or(ExportOutcome::NoReport);

    Ok(RunOutcome { export, execution })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notebook::Cell;
    use serde_json::json;

    /// 模拟 nbconvert：给注入单元格写入固定输出
    struct ScriptedExecutor {
        stdout: &'static str,
        stderr: &'static str,
        exit_code: i32,
    }

    impl NotebookExecutor for ScriptedExecutor {
        async fn execute(&self, notebook: &Path) -> AppResult<ExecutionOutput> {
            let mut nb = Notebook::from_path(notebook)?;
            if let Some(cell) = nb.cells.last_mut() {
                cell.outputs = Some(vec![
                    json!({"output_type": "stream", "name": "stdout", "text": self.stdout}),
                    json!({"output_type": "stream", "name": "stderr", "text": self.stderr}),
                ]);
            }
            nb.write_to(notebook)?;
            Ok(ExecutionOutput {
                exit_code: Some(self.exit_code),
                stderr: "kernel log".to_string(),
                ..Default::default()
            })
        }
    }

    fn setup() -> (tempfile::TempDir, ArtifactPaths) {
        let dir = tempfile::tempdir().unwrap();
        let nb_path = dir.path().join("chart.ipynb");
        let mut nb = Notebook::parse(r#"{"cells": [], "metadata": {}, "nbformat": 4, "nbformat_minor": 5}"#).unwrap();
        nb.push_cell(Cell::code("dataviz = 1\n"));
        nb.write_to(&nb_path).unwrap();
        let paths = ArtifactPaths::for_notebook(&nb_path, dir.path()).unwrap();
        (dir, paths)
    }

    #[tokio::test]
    async fn test_run_reads_injected_cell_output() {
        let (_dir, paths) = setup();
        let executor = ScriptedExecutor {
            stdout: "DUCKIT:EXPORTED matplotlib image\n",
            stderr: "",
            exit_code: 0,
        };

        let outcome = run_with_export(&executor, &paths, "dataviz").await.unwrap();
        assert!(matches!(outcome.export, ExportOutcome::Exported { .. }));
        assert!(!paths.temp_notebook.exists());
        // 原 notebook 不被修改
        assert_eq!(Notebook::from_path(&paths.notebook).unwrap().cells.len(), 1);
    }

    /// 记录被执行 notebook 的最后一个单元格
    #[derive(Default)]
    struct RecordingExecutor {
        last_cell: std::sync::Mutex<String>,
    }

    impl NotebookExecutor for RecordingExecutor {
        async fn execute(&self, notebook: &Path) -> AppResult<ExecutionOutput> {
            let nb = Notebook::from_path(notebook)?;
            if let (Some(cell), Ok(mut last)) = (nb.cells.last(), self.last_cell.lock()) {
                *last = cell.text();
            }
            Ok(ExecutionOutput {
                exit_code: Some(0),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_export_paths_are_absolute() {
        let (_dir, mut paths) = setup();
        paths.image = std::path::PathBuf::from("notebooks/chart.png");
        paths.html = std::path::PathBuf::from("notebooks/chart.html");
        let executor = RecordingExecutor::default();

        run_with_export(&executor, &paths, "dataviz").await.unwrap();

        let cell = executor.last_cell.lock().unwrap().clone();
        let image = std::path::absolute("notebooks/chart.png").unwrap();
        let html = std::path::absolute("notebooks/chart.html").unwrap();
        assert!(image.is_absolute());
        assert!(cell.contains(&format!(
            "DUCKIT_IMAGE_PATH = {}\n",
            export_cell::py_string_literal(&image.to_string_lossy())
        )));
        assert!(cell.contains(&format!(
            "DUCKIT_HTML_PATH = {}\n",
            export_cell::py_string_literal(&html.to_string_lossy())
        )));
    }

    #[tokio::test]
    async fn test_missing_variable_is_reported() {
        let (_dir, paths) = setup();
        let executor = ScriptedExecutor {
            stdout: "",
            stderr: "DUCKIT:MISSING dataviz\n",
            exit_code: 0,
        };

        let outcome = run_with_export(&executor, &paths, "dataviz").await.unwrap();
        assert_eq!(outcome.export, ExportOutcome::MissingVariable);
    }

    #[tokio::test]
    async fn test_failed_execution_removes_temp_notebook() {
        let (_dir, paths) = setup();
        let executor = ScriptedExecutor {
            stdout: "",
            stderr: "",
            exit_code: 1,
        };

        let err = run_with_export(&executor, &paths, "dataviz").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Execution(ExecutionError::Failed { exit_code: Some(1), .. })
        ));
        assert!(!paths.temp_notebook.exists());
    }

    #[tokio::test]
    #[ignore] // 需要本机安装 jupyter：cargo test -- --ignored
    async fn test_nbconvert_executes_notebook() {
        let (_dir, paths) = setup();
        let executor = NbConvertExecutor::new(&Config::default());
        let outcome = run_with_export(&executor, &paths, "dataviz").await.unwrap();
        assert!(matches!(outcome.export, ExportOutcome::Unsupported(_)));
    }
}
