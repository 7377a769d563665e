use std::env;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod console;
pub mod controller;
pub mod error;
pub mod model;
pub mod notify;
pub mod render;
pub mod service;
pub mod validate;

use console::Console;
use controller::page::DEFAULT_PAGE_SIZE;
use error::Result;
use model::{Order, OrderDraft, Product, ProductDraft, User, UserDraft};
use notify::{ConsoleNotifier, Notifier};
use service::{ApiClient, ApiConfig, HttpCollection};

const HISTORY_FILE: &str = ".records_admin_history";

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "records-admin", version, about = "用户与采购订单管理终端")]
pub struct Cli {
    /// REST 服务地址，例如 http://localhost:8080/api
    #[arg(long, env = "RECORDS_ADMIN_API_BASE_URL")]
    pub base_url: String,

    /// 每页显示条数
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// 单次请求超时（秒）
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// 日志级别，设置 RUST_LOG 时以其为准
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// 命令脚本，省略时进入交互模式
    pub script: Option<PathBuf>,
}

pub struct ConsoleConfig {
    pub api: ApiConfig,
    pub page_size: usize,
    pub script: Option<PathBuf>,
    pub history_file: Option<PathBuf>,
}

impl ConsoleConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig::new(base_url),
            page_size: DEFAULT_PAGE_SIZE,
            script: None,
            history_file: None,
        }
    }
}

impl From<Cli> for ConsoleConfig {
    fn from(cli: Cli) -> Self {
        Self {
            api: ApiConfig {
                base_url: cli.base_url,
                timeout: Duration::from_secs(cli.timeout_secs),
            },
            page_size: cli.page_size,
            script: cli.script,
            history_file: env::var_os("HOME").map(|home| PathBuf::from(home).join(HISTORY_FILE)),
        }
    }
}

/// 日志写到 stderr，避免和表格输出混在一起
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // 重复初始化（例如测试中）时忽略
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub type HttpConsole = Console<
    HttpCollection<User, UserDraft>,
    HttpCollection<Order, OrderDraft>,
    HttpCollection<Product, ProductDraft>,
>;

pub struct RecordsAdmin {
    console: HttpConsole,
    config: ConsoleConfig,
}

impl RecordsAdmin {
    pub fn with_config(config: ConsoleConfig) -> Result<Self> {
        let client = ApiClient::new(&config.api);
        let notifier: Rc<dyn Notifier> = Rc::new(ConsoleNotifier);
        tracing::info!(
            target: "records_admin",
            base_url = client.base_url(),
            page_size = config.page_size,
            "starting console"
        );

        Ok(Self {
            console: Console::new(
                client.users(),
                client.orders(),
                client.products(),
                notifier,
                config.page_size,
            )?,
            config,
        })
    }

    pub fn from_args() -> Result<Self> {
        let cli = Cli::parse();
        init_logging(&cli.log_level);
        Self::with_config(ConsoleConfig::from(cli))
    }

    pub fn console(&mut self) -> &mut HttpConsole {
        &mut self.console
    }

    pub fn run(&mut self) -> Result<()> {
        match self.config.script.as_deref() {
            Some(script) => self.console.run_script(script),
            None => self
                .console
                .run_interactive(self.config.history_file.as_deref()),
        }
    }
}
