//! CLI parser.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "business-bot")]
#[command(
    about = "Watches business chats of many bots and reports edited and deleted messages",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve webhooks and the control plane (config from env; --listen overrides LISTEN_ADDR).
    Run {
        #[arg(short, long)]
        listen: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_listen() {
        let cli =
            Cli::try_parse_from(["business-bot", "run", "--listen", "127.0.0.1:9000"]).unwrap();
        let Commands::Run { listen } = cli.command;
        assert_eq!(listen.as_deref(), Some("127.0.0.1:9000"));
    }

    #[test]
    fn test_run_requires_subcommand() {
        assert!(Cli::try_parse_from(["business-bot"]).is_err());
    }
}
