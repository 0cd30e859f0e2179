use std::path::PathBuf;

use clap::Parser;

use crate::infra::json_store::DEFAULT_STORAGE_KEY;

/// Bookshelf MCP server - keeps a reading list in a local key-value slot
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Directory holding the storage slots
    #[arg(env = "BOOKSHELF_STORE_DIR", default_value = ".bookshelf")]
    pub store_dir: PathBuf,

    /// Storage key of the bookshelf slot
    #[arg(short, long, env = "BOOKSHELF_KEY", default_value = DEFAULT_STORAGE_KEY)]
    pub key: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// `RUST_LOG` が無いときの既定フィルタ
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "bookshelf_mcp=debug,rmcp=info"
        } else {
            "bookshelf_mcp=info,rmcp=warn"
        }
    }
}
