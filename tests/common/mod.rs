//! 集成测试共用的假执行器、假截图器与 notebook 构造工具
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use duckit::browser::{CaptureReport, Capturer};
use duckit::error::AppResult;
use duckit::services::{ExecutionOutput, NotebookExecutor};
use duckit::{Config, Notebook};
use serde_json::json;

/// 模拟 nbconvert：给注入单元格写入固定输出，并按需生成产物文件
pub struct FakeExecutor {
    pub stdout: String,
    pub exit_code: i32,
    pub creates: Vec<PathBuf>,
    pub calls: AtomicUsize,
}

impl FakeExecutor {
    pub fn reporting(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            exit_code: 0,
            creates: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn creating(mut self, path: impl Into<PathBuf>) -> Self {
        self.creates.push(path.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NotebookExecutor for FakeExecutor {
    async fn execute(&self, notebook: &Path) -> AppResult<ExecutionOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut nb = Notebook::from_path(notebook)?;
        if let Some(cell) = nb.cells.last_mut() {
            cell.outputs = Some(vec![
                json!({"output_type": "stream", "name": "stdout", "text": self.stdout}),
            ]);
        }
        nb.write_to(notebook)?;

        for path in &self.creates {
            std::fs::write(path, b"artifact")?;
        }

        Ok(ExecutionOutput {
            exit_code: Some(self.exit_code),
            ..Default::default()
        })
    }
}

/// 截图时直接写入一个假的 PNG；`fail` 为 true 时模拟浏览器出错
#[derive(Default)]
pub struct FakeCapturer {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl FakeCapturer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Capturer for FakeCapturer {
    async fn capture(&self, _html_path: &Path, png_path: &Path) -> Result<CaptureReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("浏览器意外退出");
        }
        std::fs::write(png_path, b"\x89PNG")?;
        Ok(CaptureReport::default())
    }
}

/// 写一个最小 notebook，`title` 为 None 时没有标题单元格
pub fn write_notebook(dir: &Path, name: &str, title: Option<&str>) -> PathBuf {
    let mut cells = Vec::new();
    if let Some(title) = title {
        cells.push(json!({
            "cell_type": "markdown",
            "metadata": {},
            "source": [format!("# {}\n", title), "Some context.\n"]
        }));
    }
    cells.push(json!({
        "cell_type": "code",
        "execution_count": null,
        "metadata": {},
        "outputs": [],
        "source": ["dataviz = make_chart()\n"]
    }));

    let notebook = json!({
        "cells": cells,
        "metadata": {"kernelspec": {"name": "python3", "display_name": "Python 3"}},
        "nbformat": 4,
        "nbformat_minor": 5
    });

    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(&notebook).unwrap()).unwrap();
    path
}

/// 所有路径都指向临时目录的配置
pub fn test_config(root: &Path) -> Config {
    let notebook_folder = root.join("notebooks");
    let published_folder = root.join("published");
    std::fs::create_dir_all(&notebook_folder).unwrap();

    Config {
        notebook_folder,
        published_folder,
        scratch_folder: root.to_path_buf(),
        warn_file: root.join("warn.txt"),
        run_log_file: root.join("duckit_run.log"),
        github_repo: Some("someone/gallery".to_string()),
        ..Config::default()
    }
}
