use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use duckit::services::{archive_published, generate_gallery, publish_notebook};
use duckit::utils::logging::{self, LogBuffer};
use duckit::{admin, App, Config};

#[derive(Parser)]
#[command(name = "duckit", version, about = "批量导出 notebook 可视化并生成画廊")]
struct Cli {
    /// 显示详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// 处理 notebook 目录（或指定的单个 notebook）
    Process {
        /// 只处理这个 notebook
        notebook: Option<PathBuf>,
    },
    /// 根据发布目录生成画廊页面
    Gallery,
    /// 发布 notebook 目录中的一个 notebook
    Publish {
        /// notebook 文件名，例如 report.ipynb
        name: String,
    },
    /// 把发布目录打包为 zip
    Archive,
    /// 启动管理面板
    Admin {
        /// 监听地址，默认取配置中的 admin_bind_addr
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load()?;
    let verbose = cli.verbose || config.verbose_logging;

    match cli.command.unwrap_or(Command::Process { notebook: None }) {
        Command::Process { notebook } => {
            logging::init(verbose, None);
            let app = App::initialize(config).await?;
            match notebook {
                Some(path) => {
                    let report = app.run_single(&path).await?;
                    info!("{}: {}", report.notebook, report.result);
                }
                None => {
                    app.run().await?;
                }
            }
        }
        Command::Gallery => {
            logging::init(verbose, None);
            generate_gallery(&config).await?;
        }
        Command::Publish { name } => {
            logging::init(verbose, None);
            publish_notebook(&config, &name).await?;
        }
        Command::Archive => {
            logging::init(verbose, None);
            let path = archive_published(&config).await?;
            info!("📦 {}", path.display());
        }
        Command::Admin { bind } => {
            let logs = LogBuffer::new();
            logging::init(verbose, Some(logs.clone()));
            let bind = bind.unwrap_or_else(|| config.admin_bind_addr.clone());
            admin::serve(config, logs, &bind).await?;
        }
    }

    Ok(())
}
