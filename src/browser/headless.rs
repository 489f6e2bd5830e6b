use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{AppError, BrowserError};

/// 已启动的无头浏览器及其事件处理任务
pub struct HeadlessBrowser {
    pub browser: Browser,
    handler_task: JoinHandle<()>,
}

impl HeadlessBrowser {
    /// 关闭浏览器并等待事件处理任务结束
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("关闭浏览器失败: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("等待浏览器进程退出失败: {}", e);
        }
        self.handler_task.abort();
    }
}

/// 启动无头浏览器
pub async fn launch_headless_browser(config: &Config) -> Result<HeadlessBrowser> {
    info!("🚀 启动无头浏览器...");

    // 配置无头浏览器
    let mut builder = BrowserConfig::builder()
        .new_headless_mode()
        .window_size(config.window_width, config.window_height)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--hide-scrollbars",
            // 允许 file:// 页面加载本地资源
            "--allow-file-access-from-files",
        ]);
    if let Some(executable) = &config.chrome_executable {
        debug!("使用指定的浏览器: {}", executable.display());
        builder = builder.chrome_executable(executable);
    }
    let browser_config = builder.build().map_err(|message| {
        error!("配置无头浏览器失败: {}", message);
        AppError::Browser(BrowserError::ConfigurationFailed { message })
    })?;

    // 启动浏览器
    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动无头浏览器失败: {}", e);
        AppError::browser_launch_failed(e)
    })?;
    debug!("无头浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    Ok(HeadlessBrowser {
        browser,
        handler_task,
    })
}
