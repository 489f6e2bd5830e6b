//! 发布服务 - 业务能力层
//!
//! 把处理好的 notebook 及其产物复制到发布目录，并可打包成 zip

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::Config;
use crate::error::{AppError, AppResult, FileError, NotebookError};

/// 发布结果
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub notebook: String,
    pub copied: Vec<PathBuf>,
}

/// 发布单个 notebook（notebook + PNG + 可选的 HTML 预览）
///
/// 图片不存在时拒绝发布
pub async fn publish_notebook(config: &Config, notebook_name: &str) -> AppResult<PublishReport> {
    let name = sanitize_notebook_name(notebook_name)?;
    let source = config.notebook_folder.join(&name);
    let image = source.with_extension("png");
    let html = source.with_extension("html");

    for required in [&source, &image] {
        if !required.exists() {
            return Err(FileError::NotFound {
                path: required.display().to_string(),
            }
            .into());
        }
    }

    let target_dir = config.published_notebooks();
    tokio::fs::create_dir_all(&target_dir)
        .await
        .map_err(|e| AppError::file_write_failed(target_dir.display().to_string(), e))?;

    let mut copied = Vec::new();
    for file in [Some(source), Some(image), html.exists().then_some(html)]
        .into_iter()
        .flatten()
    {
        let Some(file_name) = file.file_name() else {
            continue;
        };
        let target = target_dir.join(file_name);
        tokio::fs::copy(&file, &target)
            .await
            .map_err(|e| AppError::file_write_failed(target.display().to_string(), e))?;
        debug!("已复制 {} -> {}", file.display(), target.display());
        copied.push(target);
    }

    info!("📤 已发布 {} ({} 个文件)", name, copied.len());
    Ok(PublishReport {
        notebook: name,
        copied,
    })
}

/// 把发布目录打包为 zip，返回压缩包路径
pub async fn archive_published(config: &Config) -> AppResult<PathBuf> {
    let source = config.published_folder.clone();
    let archive = config.archive_path();
    if !source.is_dir() {
        return Err(FileError::NotFound {
            path: source.display().to_string(),
        }
        .into());
    }

    let target = archive.clone();
    let count = tokio::task::spawn_blocking(move || write_zip(&source, &target))
        .await
        .map_err(|e| AppError::Other(format!("压缩任务失败: {}", e)))??;

    info!("🗜️ 已打包 {} 个文件到 {}", count, archive.display());
    Ok(archive)
}

/// 递归写入 zip，条目名使用相对 `root` 的路径
fn write_zip(root: &Path, archive: &Path) -> AppResult<usize> {
    let file = File::create(archive)
        .map_err(|e| AppError::file_write_failed(archive.display().to_string(), e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    let mut buffer = Vec::new();
    for path in &files {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let entry_name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        zip.start_file(entry_name, options)?;
        buffer.clear();
        File::open(path)
            .and_then(|mut f| f.read_to_end(&mut buffer))
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        zip.write_all(&buffer)
            .map_err(|e| AppError::file_write_failed(archive.display().to_string(), e))?;
    }

    zip.finish()?;
    Ok(files.len())
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> AppResult<()> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::file_read_failed(dir.display().to_string(), e))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// 校验上传/发布使用的 notebook 文件名，只保留文件名部分
pub fn sanitize_notebook_name(raw: &str) -> AppResult<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let valid = name.ends_with(".ipynb")
        && name.len() > ".ipynb".len()
        && !name.starts_with('.')
        && !name.starts_with("temp_")
        && !name.starts_with("_temp_");
    if valid {
        Ok(name.to_string())
    } else {
        Err(NotebookError::InvalidName {
            name: raw.to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_notebook_name() {
        assert_eq!(sanitize_notebook_name("report.ipynb").unwrap(), "report.ipynb");
        assert_eq!(
            sanitize_notebook_name("../../etc/evil.ipynb").unwrap(),
            "evil.ipynb"
        );
        assert_eq!(
            sanitize_notebook_name(r"C:\Users\me\map.ipynb").unwrap(),
            "map.ipynb"
        );
        assert!(sanitize_notebook_name("notes.txt").is_err());
        assert!(sanitize_notebook_name(".ipynb").is_err());
        assert!(sanitize_notebook_name("temp_report.ipynb").is_err());
        assert!(sanitize_notebook_name("dir/").is_err());
    }
}
