use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gemini::api::{self, AppState, SecurityConfig};
use gemini::compare::IntSetComparison;
use gemini::config::GeminiConfig;
use gemini::db::Database;
use gemini::features::{self, FeatureManager};
use gemini::relation::{RelationRegistry, RelationStore};

#[derive(Parser)]
#[command(name = "gemini")]
#[command(about = "Entity relations and hierarchical feature flags")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the admin API server
    Serve {
        /// Port for HTTP API (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the feature tree with effective states
    Features,
    /// Compare two comma-separated id lists
    Compare {
        /// First list, e.g. 5,1,3
        a: String,
        /// Second list, e.g. 3,8
        b: String,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "gemini=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<GeminiConfig> {
    match path {
        Some(path) => GeminiConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(GeminiConfig::load()),
    }
}

fn open_database(config: &GeminiConfig) -> anyhow::Result<Database> {
    let db = match &config.database_path {
        Some(path) => Database::open(path.clone()),
        None => Database::open_default(),
    }
    .context("Failed to open database")?;
    db.migrate().context("Failed to migrate database")?;
    Ok(db)
}

/// Declared features, then `Feature.*` settings from the configuration.
fn load_features(config: &GeminiConfig) -> anyhow::Result<FeatureManager> {
    let features = match &config.features_file {
        Some(path) => FeatureManager::load_definitions(path)
            .with_context(|| format!("Failed to load features from {}", path.display()))?,
        None => FeatureManager::new(),
    };
    features.configure(&config.properties);
    Ok(features)
}

fn parse_ids(list: &str) -> anyhow::Result<Vec<i64>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().with_context(|| format!("Invalid id: {}", s)))
        .collect()
}

async fn serve(config: GeminiConfig, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.port);
    tracing::info!("Starting Gemini server on port {}", port);

    let db = open_database(&config)?;
    let features = load_features(&config)?;
    let restored = db.restore_feature_states(&features)?;
    tracing::info!(
        "Feature tree ready: {} features, {} persisted states restored",
        features.len(),
        restored
    );

    let store: Arc<dyn RelationStore> = Arc::new(db.clone());
    let relations = RelationRegistry::open_all(&config.relations, store)?;

    let state = AppState::new(db, Arc::new(features), Arc::new(relations))
        .with_security(SecurityConfig::from_env());
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Gemini server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port }) => {
            let config = load_config(cli.config.as_ref())?;
            serve(config, port).await?;
        }
        Some(Commands::Features) => {
            let config = load_config(cli.config.as_ref())?;
            let features = load_features(&config)?;
            print!("{}", features::render_tree(&features.tree()));
        }
        Some(Commands::Compare { a, b }) => {
            let cmp = IntSetComparison::new(parse_ids(&a)?, parse_ids(&b)?);
            println!("{}", serde_json::to_string_pretty(cmp.compute())?);
        }
        None => {
            let config = load_config(cli.config.as_ref())?;
            serve(config, None).await?;
        }
    }

    Ok(())
}
