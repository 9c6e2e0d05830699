use std::path::PathBuf;

use anyhow::Context;
use catalog_search::{
    CatalogConfig,
    import::{describe_collection, drop_collection},
    load_catalog,
    typesense::TypesenseClient,
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "catalog-admin")]
#[command(about = "Maintain the product catalog collection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recreate the collection and import a JSONL catalog export
    Import {
        /// One product per line: {"id", "barcode", "name", "unit"}
        path: PathBuf,
        /// Documents per import request (overrides IMPORT_BATCH_SIZE)
        #[arg(short, long)]
        batch_size: Option<usize>,
    },
    /// Print the collection schema as stored by the search engine
    Schema,
    /// Delete the collection
    Drop,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err.into());
        }
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,catalog_search=info"))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Import { path, batch_size } => {
            let stats = load_catalog(&path, batch_size)
                .await
                .with_context(|| format!("importing {}", path.display()))?;
            info!(
                read = stats.read,
                imported = stats.imported,
                skipped = stats.skipped,
                failed = stats.failed,
                "import complete"
            );
        }
        Commands::Schema => {
            let client = connect()?;
            let schema = describe_collection(&client)
                .await
                .context("retrieving collection schema")?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Commands::Drop => {
            let client = connect()?;
            drop_collection(&client)
                .await
                .with_context(|| format!("deleting collection '{}'", client.collection()))?;
        }
    }

    Ok(())
}

fn connect() -> anyhow::Result<TypesenseClient> {
    let cfg = CatalogConfig::from_env().context("loading catalog configuration")?;
    Ok(TypesenseClient::new(&cfg.typesense)?)
}
