use anyhow::Result;
use clap::{Parser, Subcommand};

use flowgate::logging::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "flowgate")]
#[command(version, about = "GitHub App gateway for the workflow dashboard")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format: pretty or json
    #[arg(long, global = true, env = "LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Port to serve on
        #[arg(short, long, env = "FLOWGATE_PORT", default_value = "3141")]
        port: u16,

        /// Address to bind
        #[arg(long, env = "FLOWGATE_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Enable dev mode (CORS permissive for a local frontend dev server)
        #[arg(long)]
        dev: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the resolved configuration with secrets redacted
    Show,
    /// Report every missing variable and exit non-zero if any
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.log_format, cli.verbose);

    match &cli.command {
        Commands::Serve { port, host, dev } => {
            cmd::cmd_serve(host.clone(), *port, *dev).await?;
        }
        Commands::Config { command } => cmd::cmd_config(command.clone())?,
    }

    Ok(())
}
