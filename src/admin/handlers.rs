//! 管理面板请求处理
//!
//! POST 请求执行操作后把结果写入面板状态，再重定向回首页

use std::path::Path;

use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::admin::page::{render_panel, PanelView};
use crate::admin::state::AdminState;
use crate::browser::Capturer;
use crate::config::Config;
use crate::error::{AppError, FileError, NotebookError};
use crate::models::loaders::notebook_names;
use crate::services::notebook_runner::NotebookExecutor;
use crate::services::publisher::{archive_published, publish_notebook, sanitize_notebook_name};
use crate::services::gallery::generate_gallery;

/// 管理面板 HTTP 错误
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error("请求无效: {0}")]
    BadRequest(String),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AdminError::App(AppError::Notebook(NotebookError::InvalidName { .. })) => {
                StatusCode::BAD_REQUEST
            }
            AdminError::App(AppError::File(FileError::NotFound { .. })) => StatusCode::NOT_FOUND,
            AdminError::App(e) => {
                error!("❌ 管理面板内部错误: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

type AdminResult<T> = Result<T, AdminError>;

#[derive(Debug, Deserialize)]
pub struct ProcessForm {
    pub notebook: String,
}

/// GET /
pub async fn index<E, C>(State(state): State<AdminState<E, C>>) -> AdminResult<Html<String>>
where
    E: NotebookExecutor + Send + Sync + 'static,
    C: Capturer + Send + Sync + 'static,
{
    let config = state.config();
    let notebooks = notebook_names(&config.notebook_folder)
        .await
        .map_err(|e| AppError::Other(format!("{:#}", e)))?;
    let status = state.panel.lock().await.clone();

    let (image_url, html_url) = match status.last_notebook.as_deref() {
        Some(name) => (
            preview_url(config, name, "png"),
            preview_url(config, name, "html"),
        ),
        None => (None, None),
    };

    let view = PanelView {
        notebooks,
        status,
        image_url,
        html_url,
        gallery_url: format!("/published/{}", config.gallery_file_name),
    };
    Ok(Html(render_panel(&view)))
}

/// POST /upload
pub async fn upload<E, C>(
    State(state): State<AdminState<E, C>>,
    mut multipart: Multipart,
) -> AdminResult<Redirect>
where
    E: NotebookExecutor + Send + Sync + 'static,
    C: Capturer + Send + Sync + 'static,
{
    let folder = state.config().notebook_folder.clone();
    let mut saved = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AdminError::BadRequest(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let name = sanitize_notebook_name(&file_name)?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AdminError::BadRequest(e.to_string()))?;

        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| AppError::file_write_failed(folder.display().to_string(), e))?;
        let target = folder.join(&name);
        tokio::fs::write(&target, &data)
            .await
            .map_err(|e| AppError::file_write_failed(target.display().to_string(), e))?;

        info!("📥 已上传 {} ({} 字节)", name, data.len());
        saved.push(name);
    }

    if saved.is_empty() {
        return Err(AdminError::BadRequest("没有收到文件".to_string()));
    }

    state.panel.lock().await.status = format!("已上传: {}", saved.join(", "));
    Ok(Redirect::to("/"))
}

/// POST /process
pub async fn process<E, C>(
    State(state): State<AdminState<E, C>>,
    Form(form): Form<ProcessForm>,
) -> AdminResult<Redirect>
where
    E: NotebookExecutor + Send + Sync + 'static,
    C: Capturer + Send + Sync + 'static,
{
    let name = sanitize_notebook_name(&form.notebook)?;
    let notebook = state.config().notebook_folder.join(&name);
    if !notebook.exists() {
        return Err(AppError::from(FileError::NotFound {
            path: notebook.display().to_string(),
        })
        .into());
    }

    // 持有锁直到处理结束
    let mut panel = state.panel.lock().await;
    let mark = state.logs.mark();

    let status = match state.app.run_single(&notebook).await {
        Ok(report) => report.result.to_string(),
        Err(e) => {
            error!("❌ 处理 {} 时发生错误: {:#}", name, e);
            format!("失败: {:#}", e)
        }
    };

    panel.output = state
        .logs
        .since(mark)
        .iter()
        .map(ToString::to_string)
        .collect();
    panel.status = status;
    panel.last_notebook = Some(name);
    Ok(Redirect::to("/"))
}

/// POST /gallery
pub async fn gallery<E, C>(State(state): State<AdminState<E, C>>) -> Redirect
where
    E: NotebookExecutor + Send + Sync + 'static,
    C: Capturer + Send + Sync + 'static,
{
    let mut panel = state.panel.lock().await;
    panel.status = match generate_gallery(state.config()).await {
        Ok(report) => format!(
            "画廊已生成: {} ({} 个条目)",
            report.output.display(),
            report.items.len()
        ),
        Err(e) => {
            warn!("⚠️ 生成画廊失败: {:#}", e);
            format!("生成画廊失败: {:#}", e)
        }
    };
    Redirect::to("/")
}

/// POST /publish
pub async fn publish<E, C>(State(state): State<AdminState<E, C>>) -> Redirect
where
    E: NotebookExecutor + Send + Sync + 'static,
    C: Capturer + Send + Sync + 'static,
{
    let mut panel = state.panel.lock().await;
    panel.status = match panel.last_notebook.clone() {
        None => "请先处理一个 notebook".to_string(),
        Some(name) => match publish_notebook(state.config(), &name).await {
            Ok(report) => format!("已发布 {} ({} 个文件)", report.notebook, report.copied.len()),
            Err(e) => {
                warn!("⚠️ 发布 {} 失败: {}", name, e);
                format!("发布失败: {}", e)
            }
        },
    };
    Redirect::to("/")
}

/// GET /archive
pub async fn archive<E, C>(State(state): State<AdminState<E, C>>) -> AdminResult<Response>
where
    E: NotebookExecutor + Send + Sync + 'static,
    C: Capturer + Send + Sync + 'static,
{
    let _panel = state.panel.lock().await;
    let path = archive_published(state.config()).await?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "published.zip".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// 预览产物的 URL：先找 notebook 目录，再找已发布目录
fn preview_url(config: &Config, notebook: &str, extension: &str) -> Option<String> {
    artifact_url(&config.notebook_folder, "/files/notebooks", notebook, extension).or_else(|| {
        artifact_url(
            &config.published_notebooks(),
            "/published/notebooks",
            notebook,
            extension,
        )
    })
}

/// 与 notebook 同名的产物在 `url_prefix` 下的 URL，文件不存在时返回 None
fn artifact_url(
    folder: &Path,
    url_prefix: &str,
    notebook: &str,
    extension: &str,
) -> Option<String> {
    let file = folder.join(notebook).with_extension(extension);
    let file_name = file.file_name()?.to_string_lossy().to_string();
    file.exists()
        .then(|| format!("{}/{}", url_prefix, file_name.replace(' ', "%20")))
}
