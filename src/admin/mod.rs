//! 管理面板（axum）
//!
//! 单进程 HTTP 服务：上传 notebook、处理单个 notebook、生成画廊、发布与打包。
//! 处理类请求共用一把异步互斥锁，同一时间只运行一个操作。

pub mod handlers;
pub mod page;
pub mod router;
pub mod state;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::orchestrator::App;
use crate::utils::logging::LogBuffer;

pub use router::build_admin_router;
pub use state::{AdminState, PanelStatus};

/// 启动管理面板并一直运行，直到收到 Ctrl+C
///
/// `logs` 需要已经注册到全局日志订阅器，面板才能显示处理过程中的日志
pub async fn serve(config: Config, logs: LogBuffer, bind_addr: &str) -> Result<()> {
    let app = App::initialize(config).await?;
    let router = build_admin_router(AdminState::new(app, logs));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("无法监听地址: {}", bind_addr))?;
    info!("🦆 管理面板已启动: http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("管理面板运行出错")?;

    info!("👋 管理面板已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("⚠️ 无法监听 Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
