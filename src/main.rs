use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

mod check;
mod config;
mod llm;
mod notion;
mod sync;
mod telemetry;

#[derive(Parser)]
#[command(name = "feednote", about = "RSS → hosted collection ingestion CLI")]
struct Cli {
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Sync(sync::SyncCmd),
    Check(check::CheckCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // initialize logging/tracing (stderr). Respect RUST_LOG and FEEDNOTE_LOG_FORMAT
    telemetry::config::init_tracing();

    let cfg = config::AppConfig::from_env()?;

    match cli.command {
        Commands::Sync(args) => sync::run(&cfg, args).await?,
        Commands::Check(args) => check::run(&cfg, args).await?,
    }

    Ok(())
}
