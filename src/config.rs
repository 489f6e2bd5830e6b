use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult, ConfigError};

/// 默认配置文件名
pub const CONFIG_FILE_NAME: &str = "duckit.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 待处理的 notebook 目录
    pub notebook_folder: PathBuf,
    /// 发布目录（画廊页面所在目录）
    pub published_folder: PathBuf,
    /// 画廊页面文件名（相对于发布目录）
    pub gallery_file_name: String,
    /// 临时 notebook 存放目录
    pub scratch_folder: PathBuf,
    /// notebook 中约定的可视化对象变量名
    pub variable_name: String,
    /// 用于启动 jupyter 的 Python 解释器
    pub python_executable: String,
    /// notebook 执行超时（秒），为空时一直等待
    pub execution_timeout_secs: Option<u64>,
    /// 浏览器可执行文件路径，为空时自动查找
    pub chrome_executable: Option<PathBuf>,
    /// 截图窗口宽度
    pub window_width: u32,
    /// 截图窗口高度
    pub window_height: u32,
    /// 等待可视化元素出现的超时（秒）
    pub selector_timeout_secs: u64,
    /// 无法识别页面时的固定等待（毫秒）
    pub fallback_sleep_ms: u64,
    /// 截图前是否把视口调整为内容尺寸
    pub resize_to_content: bool,
    /// 截图后是否保留 HTML 预览
    pub keep_html: bool,
    /// GitHub 仓库（user/repo），为空时从 git remote 推断
    pub github_repo: Option<String>,
    /// 管理面板监听地址
    pub admin_bind_addr: String,
    /// 警告记录文件
    pub warn_file: PathBuf,
    /// 批处理日志文件
    pub run_log_file: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notebook_folder: PathBuf::from("notebooks"),
            published_folder: PathBuf::from("published"),
            gallery_file_name: "index.html".to_string(),
            scratch_folder: PathBuf::from("."),
            variable_name: "dataviz".to_string(),
            python_executable: "python3".to_string(),
            execution_timeout_secs: None,
            chrome_executable: None,
            window_width: 1600,
            window_height: 1200,
            selector_timeout_secs: 15,
            fallback_sleep_ms: 3000,
            resize_to_content: true,
            keep_html: true,
            github_repo: None,
            admin_bind_addr: "127.0.0.1:7860".to_string(),
            warn_file: PathBuf::from("warn.txt"),
            run_log_file: PathBuf::from("duckit_run.log"),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → duckit.toml（如果存在）→ 环境变量
    pub fn load() -> AppResult<Self> {
        let base = if Path::new(CONFIG_FILE_NAME).exists() {
            Self::from_file(Path::new(CONFIG_FILE_NAME))?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            AppError::Config(ConfigError::InvalidFile { source, .. }) => {
                AppError::Config(ConfigError::InvalidFile {
                    path: path.display().to_string(),
                    source,
                })
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| {
            AppError::Config(ConfigError::InvalidFile {
                path: String::new(),
                source: Box::new(e),
            })
        })
    }

    /// 用 DUCKIT_* 环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> Self {
        let base = self;
        Self {
            notebook_folder: env_var("DUCKIT_NOTEBOOK_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(base.notebook_folder),
            published_folder: env_var("DUCKIT_PUBLISHED_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(base.published_folder),
            gallery_file_name: env_var("DUCKIT_GALLERY_FILE")
                .unwrap_or(base.gallery_file_name),
            scratch_folder: env_var("DUCKIT_SCRATCH_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(base.scratch_folder),
            variable_name: env_var("DUCKIT_VARIABLE_NAME")
                .unwrap_or(base.variable_name),
            python_executable: env_var("DUCKIT_PYTHON").unwrap_or(base.python_executable),
            execution_timeout_secs: env_parse("DUCKIT_EXECUTION_TIMEOUT_SECS")
                .or(base.execution_timeout_secs),
            chrome_executable: env_var("DUCKIT_CHROME_EXECUTABLE")
                .map(PathBuf::from)
                .or(base.chrome_executable),
            window_width: env_parse("DUCKIT_WINDOW_WIDTH")
                .unwrap_or(base.window_width),
            window_height: env_parse("DUCKIT_WINDOW_HEIGHT")
                .unwrap_or(base.window_height),
            selector_timeout_secs: env_parse("DUCKIT_SELECTOR_TIMEOUT_SECS")
                .unwrap_or(base.selector_timeout_secs),
            fallback_sleep_ms: env_parse("DUCKIT_FALLBACK_SLEEP_MS")
                .unwrap_or(base.fallback_sleep_ms),
            resize_to_content: env_parse("DUCKIT_RESIZE_TO_CONTENT")
                .unwrap_or(base.resize_to_content),
            keep_html: env_parse("DUCKIT_KEEP_HTML").unwrap_or(base.keep_html),
            github_repo: env_var("DUCKIT_GITHUB_REPO").or(base.github_repo),
            admin_bind_addr: env_var("DUCKIT_ADMIN_BIND").unwrap_or(base.admin_bind_addr),
            warn_file: env_var("DUCKIT_WARN_FILE")
                .map(PathBuf::from)
                .unwrap_or(base.warn_file),
            run_log_file: env_var("DUCKIT_RUN_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(base.run_log_file),
            verbose_logging: env_parse("DUCKIT_VERBOSE").unwrap_or(base.verbose_logging),
        }
    }

    /// 已发布 notebook 所在目录
    pub fn published_notebooks(&self) -> PathBuf {
        self.published_folder.join("notebooks")
    }

    /// 画廊页面完整路径
    pub fn gallery_path(&self) -> PathBuf {
        self.published_folder.join(&self.gallery_file_name)
    }

    /// 发布目录压缩包路径（与发布目录同级）
    pub fn archive_path(&self) -> PathBuf {
        let mut path = self.published_folder.clone().into_os_string();
        path.push(".zip");
        PathBuf::from(path)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_var(name).and_then(|v| v.parse().ok())
}
