use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "chatflow")]
#[command(about = "Chatflow - streaming assistant chat client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Disable incremental streaming and use the JSON endpoint
        #[arg(long)]
        no_stream: bool,
        /// Treat this launch as a page reload (rotates the session)
        #[arg(long)]
        reload: bool,
        /// Page URL to attach to the synced transcript
        #[arg(long)]
        page_url: Option<String>,
    },
    /// Print the storage locations in use
    Paths,
    /// Delete local state for sessions already delivered to the backend
    Prune,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            no_stream,
            reload,
            page_url,
        } => commands::chat::run(no_stream, reload, page_url).await?,
        Commands::Paths => commands::paths::run()?,
        Commands::Prune => commands::prune::run()?,
    }

    Ok(())
}
