mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, LogFormat};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Version => commands::version::run(),
        Commands::Check => commands::check::run().await?,
        Commands::Inventory => commands::inventory::run().await?,
        Commands::PvCheck(args) => commands::pv_check::run(args).await?,
    }

    Ok(())
}
