//! HTML 截图
//!
//! 打开本地 HTML 文件，等待可视化渲染完成后保存 PNG 截图

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use tokio::io::AsyncReadExt;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::browser::headless::launch_headless_browser;
use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::js_executor::{ContentSize, JsExecutor};
use crate::models::artifact::VizLibrary;

/// 用于识别可视化库的 HTML 开头字节数
const SNIFF_BYTES: u64 = 8 * 1024;

/// 选择器出现后额外等待的渲染时间
const SETTLE_DELAY: Duration = Duration::from_millis(500);

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 视口尺寸范围
const MIN_VIEWPORT: i64 = 200;
const MAX_VIEWPORT: i64 = 8000;

/// 截图结果
#[derive(Debug, Clone, Default)]
pub struct CaptureReport {
    pub library: Option<VizLibrary>,
    pub selector: Option<&'static str>,
    pub selector_found: bool,
    pub viewport: Option<ContentSize>,
}

/// 截图能力
pub trait Capturer {
    fn capture(
        &self,
        html_path: &Path,
        png_path: &Path,
    ) -> impl Future<Output = Result<CaptureReport>> + Send;
}

/// 基于 chromiumoxide 的截图实现，每次截图启动一个新的浏览器
#[derive(Debug, Clone)]
pub struct ChromeCapturer {
    config: Config,
}

impl ChromeCapturer {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Capturer for ChromeCapturer {
    async fn capture(&self, html_path: &Path, png_path: &Path) -> Result<CaptureReport> {
        capture_html(&self.config, html_path, png_path).await
    }
}

/// 对本地 HTML 文件截图
pub async fn capture_html(config: &Config, html_path: &Path, png_path: &Path) -> Result<CaptureReport> {
    info!("📸 初始化无头浏览器，准备截图 {}", html_path.display());

    let head = read_head(html_path).await?;
    let library = VizLibrary::sniff_html(&head);
    let url = file_url(html_path)?;

    let headless = launch_headless_browser(config).await?;
    let result = capture_page(config, &headless.browser, &url, library, png_path).await;
    headless.shutdown().await;

    let report = result?;
    info!("✓ 截图已保存: {}", png_path.display());
    Ok(report)
}

async fn capture_page(
    config: &Config,
    browser: &chromiumoxide::Browser,
    url: &str,
    library: Option<VizLibrary>,
    png_path: &Path,
) -> Result<CaptureReport> {
    let page = browser.new_page("about:blank").await.map_err(|e| {
        AppError::navigation_failed("about:blank", e)
    })?;
    let executor = JsExecutor::new(page);

    executor
        .set_viewport(ContentSize {
            width: i64::from(config.window_width),
            height: i64::from(config.window_height),
        })
        .await?;

    executor
        .page()
        .goto(url)
        .await
        .map_err(|e| AppError::navigation_failed(url, e))?;
    debug!("页面已加载: {}", url);

    let mut report = CaptureReport {
        library,
        selector: library.and_then(VizLibrary::ready_selector),
        ..Default::default()
    };

    match report.selector {
        Some(selector) => {
            info!("⏳ 等待元素 '{}' 出现...", selector);
            let timeout = Duration::from_secs(config.selector_timeout_secs);
            report.selector_found = wait_for_selector(executor.page(), selector, timeout).await;
            if report.selector_found {
                sleep(SETTLE_DELAY).await;
            } else {
                warn!("⚠️ 等待 '{}' 超时，改为固定等待", selector);
                sleep(Duration::from_millis(config.fallback_sleep_ms)).await;
            }
        }
        None => {
            debug!("未识别可视化库，固定等待 {} ms", config.fallback_sleep_ms);
            sleep(Duration::from_millis(config.fallback_sleep_ms)).await;
        }
    }

    if config.resize_to_content {
        match executor.content_size().await {
            Ok(size) => {
                let size = size.clamp(MIN_VIEWPORT, MAX_VIEWPORT);
                debug!("调整视口为 {}x{}", size.width, size.height);
                executor.set_viewport(size).await?;
                report.viewport = Some(size);
                sleep(SETTLE_DELAY).await;
            }
            Err(e) => warn!("⚠️ 无法测量页面尺寸，保留窗口尺寸: {}", e),
        }
    }

    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .build();
    executor
        .page()
        .save_screenshot(params, png_path)
        .await
        .with_context(|| format!("截图保存失败: {}", png_path.display()))?;

    Ok(report)
}

/// 轮询等待选择器出现
async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if page.find_element(selector).await.is_ok() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(SELECTOR_POLL_INTERVAL).await;
    }
}

/// 读取 HTML 文件开头用于识别
async fn read_head(path: &Path) -> Result<String> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("无法打开 HTML 文件: {}", path.display()))?;
    let mut buf = Vec::new();
    file.take(SNIFF_BYTES).read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// 本地文件路径转为 file:// URL
pub fn file_url(path: &Path) -> Result<String> {
    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("无法解析路径: {}", path.display()))?;
    Ok(path_to_file_url(&absolute))
}

fn path_to_file_url(absolute: &Path) -> String {
    let raw = absolute.to_string_lossy().replace('\\', "/");
    let mut url = String::from("file://");
    if !raw.starts_with('/') {
        url.push('/');
    }
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' | b':' => {
                url.push(byte as char)
            }
            other => url.push_str(&format!("%{:02X}", other)),
        }
    }
    url
}
