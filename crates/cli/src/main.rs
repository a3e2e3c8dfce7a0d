mod config_commands;
mod monitor_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "streamwatch",
    version,
    about = "streamwatch: Twitch live notifications for Discord"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ./streamwatch.{toml,yaml,yml,json}, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Data directory holding the live cache (overrides the default data dir).
    #[arg(long, global = true, env = "STREAMWATCH_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Watch channels and post notifications until Ctrl-C (default).
    Run,
    /// Run a single reconciliation tick and print the report.
    Once,
    /// Ask Twitch whether the given logins are live.
    Probe {
        #[arg(required = true)]
        logins: Vec<String>,
    },
    /// Validate the configuration and report errors/warnings.
    CheckConfig,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "streamwatch starting");

    let loaded = config_commands::load(cli.config.as_deref(), cli.data_dir.as_deref())?;
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => monitor_commands::run(loaded).await,
        Commands::Once => monitor_commands::once(loaded).await,
        Commands::Probe { logins } => monitor_commands::probe(loaded, logins).await,
        Commands::CheckConfig => config_commands::check(&loaded),
    }
}
