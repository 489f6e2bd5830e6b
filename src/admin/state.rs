use std::sync::Arc;

use tokio::sync::Mutex;

use crate::browser::ChromeCapturer;
use crate::config::Config;
use crate::orchestrator::App;
use crate::services::notebook_runner::NbConvertExecutor;
use crate::utils::logging::LogBuffer;

/// 面板上展示的最近一次操作
#[derive(Debug, Clone, Default)]
pub struct PanelStatus {
    /// 最近处理的 notebook 文件名
    pub last_notebook: Option<String>,
    /// 最近一次操作的状态文本
    pub status: String,
    /// 最近一次处理过程中的日志
    pub output: Vec<String>,
}

/// 管理面板共享状态
///
/// `panel` 互斥锁同时用于串行化处理请求，同一时间只处理一个 notebook
pub struct AdminState<E = NbConvertExecutor, C = ChromeCapturer> {
    pub app: Arc<App<E, C>>,
    pub logs: LogBuffer,
    pub panel: Arc<Mutex<PanelStatus>>,
}

impl<E, C> AdminState<E, C> {
    pub fn new(app: App<E, C>, logs: LogBuffer) -> Self {
        Self {
            app: Arc::new(app),
            logs,
            panel: Arc::new(Mutex::new(PanelStatus::default())),
        }
    }
}

// 手动实现，避免要求 E / C 本身实现 Clone
impl<E, C> Clone for AdminState<E, C> {
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
            logs: self.logs.clone(),
            panel: Arc::clone(&self.panel),
        }
    }
}

impl<E, C> AdminState<E, C>
where
    E: crate::services::NotebookExecutor,
    C: crate::browser::Capturer,
{
    pub fn config(&self) -> &Config {
        self.app.config()
    }
}
