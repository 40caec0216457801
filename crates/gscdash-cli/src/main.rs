mod cannibalisation;
mod db;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gscdash-cli")]
#[command(about = "Search Console dashboard maintenance and reports")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run pending database migrations
    Migrate {
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: String,
    },
    /// Delete share links that expired or were revoked over a week ago
    PruneShareLinks {
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: String,
        /// Report how many links would be deleted without deleting them
        #[arg(long)]
        dry_run: bool,
    },
    /// Detect keyword cannibalisation for a property and print it as JSON
    Cannibalisation {
        /// Search Console property, e.g. `sc-domain:example.com`
        #[arg(long)]
        site: String,
        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,
        /// Last day of the range (YYYY-MM-DD)
        #[arg(long)]
        end_date: String,
        #[arg(long, env = "GSC_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
        #[arg(long, default_value = "30")]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // stdout carries JSON output; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Migrate { database_url }) => db::run_migrate(&database_url).await?,
        Some(Commands::PruneShareLinks {
            database_url,
            dry_run,
        }) => db::run_prune_share_links(&database_url, dry_run).await?,
        Some(Commands::Cannibalisation {
            site,
            start_date,
            end_date,
            access_token,
            timeout_secs,
        }) => {
            cannibalisation::run(
                &site,
                &start_date,
                &end_date,
                &access_token,
                timeout_secs,
            )
            .await?;
        }
        None => println!("gscdash-cli: pass --help to list commands"),
    }

    Ok(())
}
