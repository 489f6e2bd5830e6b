//! 画廊生成服务 - 业务能力层
//!
//! 扫描已发布的 notebook，把有缩略图的条目拼接成一个静态 HTML 页面

use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::loaders::discover_notebooks;
use crate::models::notebook::title_of;
use crate::utils::text::{html_escape, js_single_quoted};

const GALLERY_TEMPLATE: &str = include_str!("templates/gallery.html");
const ITEMS_PLACEHOLDER: &str = "__GALLERY_ITEMS__";
const COLAB_BADGE: &str = "https://colab.research.google.com/assets/colab-badge.svg";

/// 无法确定仓库时使用的占位值
pub const PLACEHOLDER_REPO: &str = "YOUR_USER/YOUR_REPO";

/// 画廊条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryItem {
    pub notebook: String,
    pub title: String,
    /// 相对画廊页面的缩略图路径
    pub image: String,
    /// 相对画廊页面的交互式预览路径
    pub html: Option<String>,
    pub colab_url: String,
}

/// 画廊生成结果
#[derive(Debug, Clone)]
pub struct GalleryReport {
    pub output: PathBuf,
    pub items: Vec<GalleryItem>,
    /// 缺少缩略图而被跳过的 notebook
    pub skipped: Vec<String>,
}

/// 确定 GitHub 仓库：配置优先，其次 `repo_root` 下的 git remote，都没有时使用占位值
pub async fn resolve_github_repo(config: &Config, repo_root: &Path) -> String {
    if let Some(repo) = &config.github_repo {
        return repo.clone();
    }

    let remote = match Command::new("git")
        .args(["config", "--get", "remote.origin.url"])
        .current_dir(repo_root)
        .output()
        .await
    {
        Ok(output) => String::from_utf8_lossy(&output.stdout).trim().to_string(),
        Err(e) => {
            debug!("无法执行 git: {}", e);
            String::new()
        }
    };

    parse_github_repo(&remote).unwrap_or_else(|| {
        warn!(
            "⚠️ 无法从 git remote 推断 GitHub 仓库，使用占位值 {}",
            PLACEHOLDER_REPO
        );
        PLACEHOLDER_REPO.to_string()
    })
}

/// 从 remote URL 中提取 `user/repo`
///
/// 支持 `https://github.com/user/repo.git` 与 `git@github.com:user/repo.git`
pub fn parse_github_repo(remote_url: &str) -> Option<String> {
    let re = Regex::new(r"github\.com[/:]([\w.-]+/[\w.-]+)").ok()?;
    let caps = re.captures(remote_url)?;
    let repo = caps.get(1)?.as_str();
    Some(repo.strip_suffix(".git").unwrap_or(repo).to_string())
}

/// 收集同时拥有 notebook 与 PNG 的条目
///
/// Colab 链接使用 notebook 相对 `repo_root` 的路径
pub async fn collect_items(
    notebooks_dir: &Path,
    gallery_dir: &Path,
    repo: &str,
    repo_root: &Path,
) -> Result<(Vec<GalleryItem>, Vec<String>)> {
    let mut items = Vec::new();
    let mut skipped = Vec::new();

    for notebook in discover_notebooks(notebooks_dir).await? {
        let name = notebook
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let thumbnail = notebook.with_extension("png");
        if !thumbnail.exists() {
            info!("跳过 {}: 没有对应的 PNG", name);
            skipped.push(name);
            continue;
        }

        let html = notebook.with_extension("html");
        items.push(GalleryItem {
            title: title_of(&notebook),
            image: relative_url(&thumbnail, gallery_dir),
            html: html.exists().then(|| relative_url(&html, gallery_dir)),
            colab_url: colab_url(repo, &repo_path(&notebook, repo_root)),
            notebook: name,
        });
    }

    Ok((items, skipped))
}

/// 拼接画廊页面
pub fn render_gallery(items: &[GalleryItem]) -> String {
    let fragments: String = items.iter().map(render_item).collect();
    GALLERY_TEMPLATE.replace(ITEMS_PLACEHOLDER, &fragments)
}

fn render_item(item: &GalleryItem) -> String {
    let click_action = match &item.html {
        Some(html) => format!("openHtmlModal({})", js_single_quoted(html)),
        None => format!("openImageModal({})", js_single_quoted(&item.image)),
    };
    let title = html_escape(&item.title);

    format!(
        r#"
        <div class="gallery-item" onclick="{click}" title="{title}">
            <img class="thumbnail" src="{image}" alt="{title}" loading="lazy">
            <div class="title-overlay">
                <div class="overlay-content">
                    <h3>{title}</h3>
                    <div class="item-actions">
                        <a href="{colab}" target="_blank" class="colab-link" onclick="event.stopPropagation();">
                            <img src="{badge}" alt="Open In Colab"/>
                        </a>
                    </div>
                </div>
            </div>
        </div>"#,
        click = html_escape(&click_action),
        title = title,
        image = html_escape(&item.image),
        colab = html_escape(&item.colab_url),
        badge = COLAB_BADGE,
    )
}

/// 生成画廊页面
pub async fn generate_gallery(config: &Config) -> Result<GalleryReport> {
    let repo_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let repo = resolve_github_repo(config, &repo_root).await;
    let output = config.gallery_path();
    let gallery_dir = output
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    info!("🖼️ 正在生成画廊 (仓库: {})...", repo);
    let (items, skipped) = collect_items(
        &config.published_notebooks(),
        &gallery_dir,
        &repo,
        &repo_root,
    )
    .await?;
    if items.is_empty() {
        warn!("⚠️ 没有可展示的 notebook");
    }

    tokio::fs::create_dir_all(&gallery_dir)
        .await
        .with_context(|| format!("无法创建目录: {}", gallery_dir.display()))?;
    tokio::fs::write(&output, render_gallery(&items))
        .await
        .with_context(|| format!("无法写入画廊: {}", output.display()))?;

    info!("✅ 画廊已生成: {} ({} 个条目)", output.display(), items.len());
    Ok(GalleryReport {
        output,
        items,
        skipped,
    })
}

fn relative_url(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    to_url_path(relative)
}

fn colab_url(repo: &str, repo_path: &str) -> String {
    format!(
        "https://colab.research.google.com/github/{}/blob/main/{}",
        repo, repo_path
    )
}

/// notebook 在仓库中的路径
///
/// 绝对路径去掉 `repo_root` 前缀；不在仓库目录下时只保留最后三级（发布目录/notebooks/文件名）
fn repo_path(notebook: &Path, repo_root: &Path) -> String {
    if notebook.is_relative() {
        return to_url_path(notebook);
    }
    match notebook.strip_prefix(repo_root) {
        Ok(relative) => to_url_path(relative),
        Err(_) => {
            let mut tail: Vec<_> = notebook.components().rev().take(3).collect();
            tail.reverse();
            to_url_path(&tail.into_iter().collect::<PathBuf>())
        }
    }
}

fn to_url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().replace(' ', "%20")),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
