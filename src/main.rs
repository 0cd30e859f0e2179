use clap::Parser;
use tracing_subscriber::EnvFilter;

use bookshelf_mcp::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // stdoutはMCPプロトコル用。ログはstderrへ。
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    bookshelf_mcp::interface::mcp::run(config).await
}
