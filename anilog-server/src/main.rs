use anilog_core::{DatabaseManager, DatabaseStorage, Storage};
use anilog_server::app::ports::MediaCatalogPort;
use anilog_server::infra::AniListClient;
use anilog_server::observability::{logging, metrics};
use anilog_server::{start_server, AppState, Config};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "anilog-server")]
#[command(about = "AniLog anime/manga tracking API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Apply database migrations and exit
    Migrate {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

async fn connect_database(config: &Config) -> anyhow::Result<DatabaseManager> {
    DatabaseManager::connect(&config.database.url, config.database.auth_token.clone())
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.url))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, config } => {
            let mut config = Config::load(config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            logging::init_logging(&config.logging);
            if let Err(e) = metrics::init() {
                warn!("Metrics disabled: {}", e);
            }

            println!("🚀 Starting AniLog API on port {}...", config.server.port);

            info!("Initializing database storage...");
            let db = connect_database(&config).await?;
            let storage: Arc<dyn Storage> = Arc::new(DatabaseStorage::with_manager(db).await?);
            info!("Database storage initialized successfully");

            let catalog: Arc<dyn MediaCatalogPort> = Arc::new(
                AniListClient::new(
                    &config.anilist.api_url,
                    Duration::from_secs(config.anilist.timeout_seconds),
                )
                .map_err(anyhow::Error::msg)?,
            );

            let state = AppState::new(storage, catalog, &config);
            start_server(state, &config.server.host, config.server.port)
                .await
                .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
        }
        Commands::Migrate { config } => {
            let config = Config::load(config.as_deref())?;
            logging::init_logging(&config.logging);

            println!("🗄️  Running migrations against {}", config.database.url);
            let db = connect_database(&config).await?;
            db.run_migrations().await?;
            println!("✅ Migrations complete");
        }
    }

    Ok(())
}
