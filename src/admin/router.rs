use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::admin::handlers;
use crate::admin::state::AdminState;
use crate::browser::Capturer;
use crate::services::notebook_runner::NotebookExecutor;

/// 上传 notebook 的大小上限
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// 构建管理面板路由
pub fn build_admin_router<E, C>(state: AdminState<E, C>) -> Router
where
    E: NotebookExecutor + Send + Sync + 'static,
    C: Capturer + Send + Sync + 'static,
{
    let config = state.config();
    let notebook_files = ServeDir::new(&config.notebook_folder);
    let published_files = ServeDir::new(&config.published_folder);

    Router::new()
        .route("/", get(handlers::index::<E, C>))
        .route("/upload", post(handlers::upload::<E, C>))
        .route("/process", post(handlers::process::<E, C>))
        .route("/gallery", post(handlers::gallery::<E, C>))
        .route("/publish", post(handlers::publish::<E, C>))
        .route("/archive", get(handlers::archive::<E, C>))
        .nest_service("/files/notebooks", notebook_files)
        .nest_service("/published", published_files)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .with_state(state)
}
