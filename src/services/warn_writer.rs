//! 警告写入服务 - 业务能力层
//!
//! 只负责"写 warn.txt"能力，不关心流程

use anyhow::Result;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// 警告写入服务
///
/// 把产生警告的 notebook 追加到警告文件，方便事后手动检查
pub struct WarnWriter {
    warn_file_path: PathBuf,
}

impl WarnWriter {
    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    /// 写入警告信息
    ///
    /// # 参数
    /// - `notebook`: notebook 文件名
    /// - `reason`: 警告原因
    pub async fn write(&self, notebook: &str, reason: &str) -> Result<()> {
        debug!("写入警告: {} | {}", notebook, reason);

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)
            .await?;

        let warn_msg = format!(
            "{} | {} | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            notebook,
            reason.replace('\n', " ")
        );

        file.write_all(warn_msg.as_bytes()).await?;

        Ok(())
    }
}
