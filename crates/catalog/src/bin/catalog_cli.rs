use std::{path::PathBuf, sync::Arc};

use catalog_client::{
    CatalogClient, CatalogConfig, EnvTokenSupplier, StaticTokenSupplier, TokenSupplier,
};
use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-cli")]
#[command(about = "Browse the VM image catalog", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bearer token; read from CATALOG_TOKEN when not given
    #[arg(long, global = true, env = "CATALOG_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Subscription to query
    #[arg(long, global = true)]
    subscription: String,

    /// Location, e.g. westeurope (config default when omitted)
    #[arg(long, global = true)]
    location: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List image publishers
    Publishers,

    /// List offers of a publisher
    Offers {
        #[arg(long)]
        publisher: String,
    },

    /// List SKUs of an offer, with their versions
    Skus {
        #[arg(long)]
        publisher: String,

        #[arg(long)]
        offer: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CatalogConfig::from_file(path)?,
        None => CatalogConfig::default(),
    };

    let tokens: Arc<dyn TokenSupplier> = match cli.token.clone() {
        Some(token) => Arc::new(StaticTokenSupplier::new(token)),
        None => Arc::new(EnvTokenSupplier::new("CATALOG_TOKEN")),
    };

    let client = CatalogClient::new(config, tokens)?;
    let location = cli.location.as_deref();

    let output = match &cli.command {
        Commands::Publishers => {
            let publishers = client.list_publishers(&cli.subscription, location).await?;
            info!(count = publishers.len(), "Fetched publishers");
            serde_json::to_string_pretty(&publishers)
        }
        Commands::Offers { publisher } => {
            let offers = client.list_offers(&cli.subscription, publisher, location).await?;
            info!(count = offers.len(), "Fetched offers");
            serde_json::to_string_pretty(&offers)
        }
        Commands::Skus { publisher, offer } => {
            let skus = client.list_skus(&cli.subscription, publisher, offer, location).await?;
            info!(count = skus.len(), "Fetched SKUs");
            serde_json::to_string_pretty(&skus)
        }
    }
    .wrap_err("Failed to serialize output")?;

    println!("{output}");
    Ok(())
}
