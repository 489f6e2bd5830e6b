use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// notebook 文档错误
    #[error("notebook错误: {0}")]
    Notebook(#[from] NotebookError),
    /// notebook 执行错误
    #[error("执行错误: {0}")]
    Execution(#[from] ExecutionError),
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// notebook 文档错误
#[derive(Debug, Error)]
pub enum NotebookError {
    /// JSON 解析失败
    #[error("无法解析notebook ({path}): {source}")]
    ParseFailed { path: String, source: serde_json::Error },
    /// 序列化失败
    #[error("无法序列化notebook ({path}): {source}")]
    SerializeFailed { path: String, source: serde_json::Error },
    /// 文件名不是合法的 notebook 名
    #[error("不是有效的notebook文件名: {name}")]
    InvalidName { name: String },
}

/// notebook 执行错误
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// 无法启动子进程
    #[error("无法启动 {program}: {source}")]
    SpawnFailed { program: String, source: std::io::Error },
    /// 子进程返回非零退出码
    #[error("nbconvert 执行失败 (退出码: {exit_code:?})")]
    Failed { exit_code: Option<i32>, stderr: String },
    /// 执行超时
    #[error("nbconvert 执行超时 ({secs} 秒)")]
    Timeout { secs: u64 },
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 浏览器配置失败
    #[error("浏览器配置失败: {message}")]
    ConfigurationFailed { message: String },
    /// 启动浏览器失败
    #[error("启动无头浏览器失败: {source}")]
    LaunchFailed { source: BoxedSource },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed { url: String, source: BoxedSource },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed { source: BoxedSource },
    /// 截图失败
    #[error("截图失败 ({path}): {source}")]
    ScreenshotFailed { path: String, source: BoxedSource },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed { path: String, source: BoxedSource },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed { path: String, source: BoxedSource },
    /// 压缩失败
    #[error("压缩失败 ({path}): {source}")]
    ArchiveFailed { path: String, source: BoxedSource },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件格式错误
    #[error("配置文件 {path} 解析失败: {source}")]
    InvalidFile { path: String, source: BoxedSource },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::File(FileError::ArchiveFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建浏览器启动错误
    pub fn browser_launch_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Browser(BrowserError::LaunchFailed {
            source: Box::new(source),
        })
    }

    /// 创建导航错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
