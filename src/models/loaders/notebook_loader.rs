use crate::models::artifact::TEMP_PREFIXES;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 扫描目录下所有待处理的 notebook（跳过临时文件），按文件名排序
pub async fn discover_notebooks(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.exists() {
        tracing::warn!("文件夹不存在: {}", folder.display());
        return Ok(Vec::new());
    }

    let mut notebooks = Vec::new();
    let mut entries = fs::read_dir(folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) != Some("ipynb") {
            continue;
        }
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        if TEMP_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
            tracing::debug!("跳过临时文件: {}", name);
            continue;
        }
        notebooks.push(path);
    }

    notebooks.sort();
    Ok(notebooks)
}

/// 目录中 notebook 的文件名列表（管理面板下拉框使用）
pub async fn notebook_names(folder: &Path) -> Result<Vec<String>> {
    let notebooks = discover_notebooks(folder).await?;
    Ok(notebooks
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_discover_skips_temp_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "b_report.ipynb",
            "a_map.ipynb",
            "temp_a_map.ipynb",
            "_temp_b_report.ipynb",
            "a_map.png",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.ipynb")).unwrap();

        let names = notebook_names(dir.path()).await.unwrap();
        assert_eq!(names, vec!["a_map.ipynb", "b_report.ipynb"]);
    }

    #[tokio::test]
    async fn test_missing_folder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let found = discover_notebooks(&dir.path().join("absent")).await.unwrap();
        assert!(found.is_empty());
    }
}
