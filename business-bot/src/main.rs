//! business-bot: serve tenant webhooks and the control plane. Config from env and optional CLI args.

use anyhow::Result;
use business_bot::{run, AppConfig, Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { listen } => {
            let config = AppConfig::load(listen)?;
            run(config).await
        }
    }
}
