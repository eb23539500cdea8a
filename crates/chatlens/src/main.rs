use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chatlens_sessions::{
    default_cache_path, resolve_storage_root, ExportFormat, SearchMode, SessionIndex,
};

mod commands;
mod config;

use config::ChatlensConfig;

#[derive(Parser, Debug)]
#[command(
    name = "chatlens",
    about = "Index and browse the chat sessions your editor leaves behind",
    version
)]
struct Cli {
    /// Storage root override (wins over chatlens.toml and the platform default)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the storage root and refresh the index
    Scan {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List indexed sessions, most recently updated first
    List {
        /// Substring match over previews and container labels
        #[arg(long)]
        search: Option<String>,

        /// Filter by container id or label
        #[arg(long)]
        container: Option<String>,

        /// Show sessions updated after this date (YYYY-MM-DD)
        #[arg(long)]
        after: Option<String>,

        /// Show sessions updated before this date (YYYY-MM-DD)
        #[arg(long)]
        before: Option<String>,

        /// Maximum entries (default from chatlens.toml)
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one session with its full message list
    Show {
        /// Session id
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Full-text search across session files
    Search {
        /// Search terms
        #[arg(required = true)]
        terms: Vec<String>,

        /// How terms combine
        #[arg(long, value_enum, default_value = "any")]
        mode: ModeChoice,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Frequency-ranked topics across session files
    Topics {
        /// Restrict to these session ids (default: all)
        ids: Vec<String>,

        /// Number of topics to show
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export sessions to a file or stdout
    Export {
        /// Session ids (default: every indexed session)
        ids: Vec<String>,

        /// Payload format
        #[arg(long, value_enum, default_value = "json")]
        format: FormatChoice,

        /// Destination file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Byte-copy the single session's original file instead of re-serializing
        #[arg(long)]
        original: bool,
    },

    /// Import sessions from an exported payload or a native session file
    Import {
        /// File to import
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan statistics and per-container aggregates
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeChoice {
    Any,
    All,
    Exact,
}

impl From<ModeChoice> for SearchMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Any => SearchMode::Any,
            ModeChoice::All => SearchMode::All,
            ModeChoice::Exact => SearchMode::Exact,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatChoice {
    Json,
    Markdown,
    Html,
}

impl From<FormatChoice> for ExportFormat {
    fn from(choice: FormatChoice) -> Self {
        match choice {
            FormatChoice::Json => ExportFormat::Json,
            FormatChoice::Markdown => ExportFormat::Markdown,
            FormatChoice::Html => ExportFormat::Html,
        }
    }
}

/// Initialize tracing for the application
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let working_dir = std::env::current_dir()?;
    let config = ChatlensConfig::load(&working_dir)?.unwrap_or_default();

    let override_path = cli.root.clone().or_else(|| config.root.clone());
    let root = resolve_storage_root(override_path.as_deref());
    let mut index = SessionIndex::open(root, default_cache_path());

    commands::run(&mut index, &config, cli.command).await
}
