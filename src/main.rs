use anyhow::Context;
use decksmith::{
    api::routes,
    cli::{
        init::{self, InitConfig, InitResult},
        Cli, Commands,
    },
    research::{http_client, ResearchService},
    utils::toml_config::DecksmithConfig,
    AppState, DecksmithConfigManager, LlmOutlineGenerator, TursoClient,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();

    match cli.command {
        Some(Commands::Init {
            ref path,
            force,
            ref provider,
        }) => run_init(InitConfig {
            path: path.clone(),
            force,
            provider: provider.clone(),
        }),
        Some(Commands::Check) => {
            DecksmithConfig::load(&cli.config)
                .with_context(|| format!("Invalid configuration in {}", cli.config.display()))?;
            println!("{} is valid", cli.config.display());
            Ok(())
        }
        None => serve(&cli).await,
    }
}

fn run_init(config: InitConfig) -> anyhow::Result<()> {
    match init::run(&config) {
        InitResult::Success(written) => {
            for path in written {
                println!("created {}", path.display());
            }
            println!("\nNext: copy .env.example to .env, then run `decksmith-server`.");
            Ok(())
        }
        InitResult::AlreadyExists => {
            println!("decksmith.toml already exists; use --force to overwrite");
            Ok(())
        }
        InitResult::Error(e) => anyhow::bail!(e),
    }
}

fn init_tracing(config: &DecksmithConfig, verbose: bool) {
    let default_level = if verbose {
        "debug".to_string()
    } else {
        config.server.log_level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "decksmith={0},decksmith_server={0},tower_http={0}",
            default_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.server.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(cli: &Cli) -> anyhow::Result<()> {
    let mut config_manager = DecksmithConfigManager::new(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let config = config_manager.config();

    init_tracing(&config, cli.verbose);

    if let Err(e) = config_manager.start_watching() {
        tracing::warn!("Config hot reload disabled: {}", e);
    }
    let config_manager = Arc::new(config_manager);

    if let Err(e) = tokio::fs::create_dir_all(&config.documents.upload_root).await {
        tracing::warn!(
            "Upload directory {} is unavailable, attachments will fail: {}",
            config.documents.upload_root.display(),
            e
        );
    }

    let store = TursoClient::from_config(&config.database)
        .await
        .context("Failed to open presentation database")?;

    let state = AppState {
        config_manager: Arc::clone(&config_manager),
        store: Arc::new(store),
        researcher: Arc::new(ResearchService::new(
            Arc::clone(&config_manager),
            http_client()?,
        )),
        generator: Arc::new(LlmOutlineGenerator::new(Arc::clone(&config_manager))),
    };

    let app = routes::app(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Decksmith listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
