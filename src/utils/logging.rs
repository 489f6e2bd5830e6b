/// 日志工具模块
///
/// 初始化 tracing 订阅器；管理面板需要时附加一个把事件写入内存缓冲区的 Layer
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// 缓冲区最多保留的日志条数
const MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub seq: u64,
    pub level: Level,
    pub timestamp: String,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:>5} {}", self.timestamp, self.level, self.message)
    }
}

#[derive(Debug, Default)]
struct BufferInner {
    next_seq: u64,
    entries: VecDeque<LogEntry>,
}

/// 内存日志缓冲区（可克隆，共享同一份数据）
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<BufferInner>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前位置，之后写入的日志序号都不小于它
    pub fn mark(&self) -> u64 {
        self.inner.lock().map(|inner| inner.next_seq).unwrap_or(0)
    }

    /// 取出序号不小于 `mark` 的日志
    pub fn since(&self, mark: u64) -> Vec<LogEntry> {
        match self.inner.lock() {
            Ok(inner) => inner
                .entries
                .iter()
                .filter(|entry| entry.seq >= mark)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn push(&self, level: Level, message: String) {
        if let Ok(mut inner) = self.inner.lock() {
            let entry = LogEntry {
                seq: inner.next_seq,
                level,
                timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
                message,
            };
            inner.next_seq += 1;
            inner.entries.push_back(entry);
            if inner.entries.len() > MAX_ENTRIES {
                inner.entries.pop_front();
            }
        }
    }
}

/// 把事件写入 [`LogBuffer`] 的 Layer
pub struct PanelLogLayer {
    buffer: LogBuffer,
}

impl PanelLogLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}

impl<S> Layer<S> for PanelLogLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let message = if visitor.message.is_empty() {
            metadata.target().to_string()
        } else {
            visitor.message
        };
        self.buffer.push(*metadata.level(), message);
    }
}

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 info，`verbose` 时为 debug
pub fn init(verbose: bool, buffer: Option<LogBuffer>) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},chromiumoxide=warn", default_level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(buffer.map(PanelLogLayer::new))
        .try_init();
}
