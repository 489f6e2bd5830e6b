//! 每个 notebook 一个的处理标记文件

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::models::artifact::VizLibrary;

/// 处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStatus {
    Exported,
    MissingVariable,
    UnsupportedType,
    ExportError,
    ExecutionFailed,
}

/// 标记文件内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMarker {
    pub notebook: String,
    pub status: MarkerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<VizLibrary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<PathBuf>,
    pub processed_at: DateTime<Local>,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl ExportMarker {
    pub fn new(notebook: impl Into<String>, status: MarkerStatus) -> Self {
        Self {
            notebook: notebook.into(),
            status,
            library: None,
            image: None,
            html: None,
            processed_at: Local::now(),
            messages: Vec::new(),
        }
    }

    pub fn write_to(&self, path: &Path) -> AppResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        std::fs::write(path, content)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
    }

    pub fn read_from(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))
    }
}
