use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use spacemirror::api::http::HttpAccountApi;
use spacemirror::commands::{inventory, migrate, migrate::RunStatus};
use spacemirror::config::{MirrorConfig, MirrorTarget, OperationKind};
use spacemirror::logging::{self, LogConfig, LogLevel};
use spacemirror::orchestrator::{ImportOrder, Operation};
use spacemirror::output::Format;
use spacemirror::store::cache::InventoryCache;

#[derive(Parser)]
#[command(
    name = "spacemirror",
    version,
    about = "Mirror content spaces to a git repository and move them between accounts"
)]
struct Cli {
    /// Output format for the run report
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Shorthand for --format pretty
    #[arg(long, global = true, hide = true)]
    pretty: bool,
    /// Directory holding the cached space inventory
    #[arg(long, global = true, default_value = "out")]
    cache_dir: PathBuf,
    /// Ignore the cached inventory and enumerate the account again
    #[arg(long, global = true)]
    refresh: bool,
    /// Minimum log level (RUST_LOG takes precedence)
    #[arg(long, global = true, value_enum, default_value = "info")]
    log_level: LogLevel,
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
    /// Exit with status 2 when any space fails or the run cannot start
    #[arg(long, global = true)]
    strict: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every space to the git mirror, one directory per space title
    Export,
    /// Re-create every space in the destination account and import its content from the mirror
    Import {
        /// Creation order for spaces
        #[arg(long, value_enum, default_value = "parents-first")]
        order: ImportOrder,
    },
    /// Delete every space in the inventory
    Delete,
    /// Show the space inventory
    Inventory,
}

fn exit_code(status: RunStatus, strict: bool) -> i32 {
    match status {
        RunStatus::Clean => 0,
        RunStatus::Partial | RunStatus::Aborted if strict => 2,
        RunStatus::Partial | RunStatus::Aborted => 0,
    }
}

/// Maps an operation kind onto its `Operation`, parking the mirror target in
/// `slot` so the operation can borrow it. Only `Delete` runs without a mirror.
fn build_operation<'a>(
    kind: OperationKind,
    config: &MirrorConfig,
    slot: &'a mut Option<MirrorTarget>,
) -> spacemirror::error::Result<Operation<'a>> {
    Ok(match kind {
        OperationKind::Export => Operation::Export(slot.insert(config.mirror()?)),
        OperationKind::Import => Operation::Import(slot.insert(config.mirror()?)),
        OperationKind::Delete => Operation::Delete,
    })
}

fn run(cli: Cli, format: Format) -> spacemirror::error::Result<i32> {
    let cwd = std::env::current_dir()?;
    MirrorConfig::load_dotenv(&cwd)?;
    let config = MirrorConfig::from_env();
    let cache = InventoryCache::new(&cli.cache_dir);

    let (kind, order) = match cli.command {
        Commands::Inventory => {
            if let Some(snapshot) = inventory::cached(&cache, cli.refresh) {
                inventory::show(&snapshot, format)?;
                return Ok(0);
            }
            let api = HttpAccountApi::new(&config.api_url, config.inventory_token()?)?;
            inventory::run(&api, &cache, true, format)?;
            return Ok(0);
        }
        Commands::Export => (OperationKind::Export, ImportOrder::default()),
        Commands::Import { order } => (OperationKind::Import, order),
        Commands::Delete => (OperationKind::Delete, ImportOrder::default()),
    };

    config.validate(kind)?;
    let mut mirror = None;
    let operation = build_operation(kind, &config, &mut mirror)?;

    let api = HttpAccountApi::new(&config.api_url, config.api_token(kind)?)?;
    let status = migrate::run(&api, &cache, operation, cli.refresh, order, format)?;
    Ok(exit_code(status, cli.strict))
}


fn main() {
    let cli = Cli::parse();
    let format = if cli.pretty {
        Format::Pretty
    } else {
        cli.format
    };

    let log_config = LogConfig {
        level: cli.log_level,
        json: cli.log_json,
    };
    if let Err(e) = logging::init(&log_config) {
        eprintln!("warning: {e}");
    }
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        git_sha = spacemirror::build_info::git_sha().unwrap_or("unknown"),
        "spacemirror starting"
    );

    match run(cli, format) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            match format {
                Format::Json => {
                    eprintln!(
                        "{}",
                        serde_json::json!({
                            "error": e.code(),
                            "message": e.to_string()
                        })
                    );
                }
                _ => eprintln!("error: {e}"),
            }
            std::process::exit(1);
        }
    }
}
