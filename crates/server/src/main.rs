use bookfinder_core::config;
use bookfinder_core::search::enhancer::SeededPicker;
use bookfinder_server::api::{create_router, request_timeout};
use bookfinder_server::api::handlers::AppState;
use bookfinder_server::auth::{RemoteTokenValidator, StaticTokenValidator, TokenValidator};
use bookfinder_server::backend::{CatalogBackend, MemoryBackend, RestBackend};
use bookfinder_server::embedding::HttpEmbedder;
use bookfinder_server::service::SearchService;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bookfinder", about = "Hybrid book search for the school library")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// JSON catalog file served from memory (exclusive with --database-url)
    #[arg(long)]
    catalog_file: Option<PathBuf>,

    /// Base URL of the hosted catalog database (PostgREST)
    #[arg(long)]
    database_url: Option<String>,

    /// OpenAI-compatible embeddings endpoint
    #[arg(long, default_value = "https://api.openai.com/v1/embeddings")]
    embedding_url: String,

    /// Embedding model identifier
    #[arg(long, default_value = config::DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Base URL of the identity service; when omitted, tokens come from BOOKFINDER_API_TOKENS
    #[arg(long)]
    auth_url: Option<String>,

    /// Per-branch timeout in seconds for embedding and catalog queries
    #[arg(long, default_value_t = config::DEFAULT_BRANCH_TIMEOUT_SECS)]
    branch_timeout: u64,

    /// Seed for the query enhancer's template choice (random when omitted)
    #[arg(long)]
    template_seed: Option<u64>,

    /// Graceful shutdown timeout in seconds
    #[arg(long, default_value_t = config::DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    shutdown_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("bookfinder_server=info".parse()?)
                .add_directive("bookfinder_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    if args.port == 0 {
        eprintln!("Error: port must be > 0");
        std::process::exit(1);
    }
    if args.branch_timeout == 0 {
        eprintln!("Error: branch timeout must be > 0");
        std::process::exit(1);
    }

    let backend: Arc<dyn CatalogBackend> = match (&args.catalog_file, &args.database_url) {
        (Some(path), None) => match MemoryBackend::load(path) {
            Ok(backend) => Arc::new(backend),
            Err(e) => {
                eprintln!("Error: failed to load catalog: {}", e);
                std::process::exit(1);
            }
        },
        (None, Some(url)) => {
            let service_key = std::env::var("BOOKFINDER_DB_SERVICE_KEY").ok();
            if service_key.is_none() {
                tracing::warn!("BOOKFINDER_DB_SERVICE_KEY not set, querying database anonymously");
            }
            Arc::new(RestBackend::new(url.clone(), service_key))
        }
        _ => {
            eprintln!("Error: exactly one of --catalog-file or --database-url is required");
            std::process::exit(1);
        }
    };

    let embedding_key = std::env::var("BOOKFINDER_EMBEDDING_API_KEY").ok();
    if embedding_key.is_none() {
        tracing::warn!("BOOKFINDER_EMBEDDING_API_KEY not set, searches will serve fallback results if the provider requires a key");
    }
    let embedder = Arc::new(HttpEmbedder::new(
        args.embedding_url.clone(),
        args.embedding_model.clone(),
        embedding_key,
    ));

    let validator = build_validator(args.auth_url.as_deref());

    let mut service = SearchService::new(embedder, backend.clone())
        .with_branch_timeout(Duration::from_secs(args.branch_timeout));
    if let Some(seed) = args.template_seed {
        service = service.with_picker(Box::new(SeededPicker::new(seed)));
    }

    let prometheus_handle =
        metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    let state = AppState {
        service: Arc::new(service),
        validator,
        prometheus_handle,
        start_time: Instant::now(),
    };
    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", args.port);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = args.port,
        catalog_backend = backend.name(),
        catalog_entries = ?backend.entry_count(),
        embedding_model = %args.embedding_model,
        branch_timeout_secs = args.branch_timeout,
        request_timeout_secs = request_timeout(Duration::from_secs(args.branch_timeout)).as_secs(),
        remote_auth = args.auth_url.is_some(),
        "bookfinder ready"
    );

    let (signal_tx, signal_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = signal_tx.send(true);
    });

    let shutdown_timeout = args.shutdown_timeout;
    let mut watchdog_rx = signal_rx.clone();
    tokio::spawn(async move {
        if watchdog_rx.wait_for(|stop| *stop).await.is_ok() {
            tokio::time::sleep(Duration::from_secs(shutdown_timeout)).await;
            tracing::error!(
                "Shutdown timeout ({}s) exceeded, dropping in-flight requests",
                shutdown_timeout
            );
            std::process::exit(1);
        }
    });

    let mut shutdown_rx = signal_rx;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
        })
        .await?;

    tracing::info!("All requests drained, bye");
    Ok(())
}

fn build_validator(auth_url: Option<&str>) -> Arc<dyn TokenValidator> {
    if let Some(url) = auth_url {
        tracing::info!(url = %url, "Remote token validation enabled");
        let api_key = std::env::var("BOOKFINDER_AUTH_API_KEY").ok();
        return Arc::new(RemoteTokenValidator::new(url, api_key));
    }

    let Ok(json) = std::env::var("BOOKFINDER_API_TOKENS") else {
        eprintln!("Error: set --auth-url or BOOKFINDER_API_TOKENS; search requires authentication");
        std::process::exit(1);
    };
    match StaticTokenValidator::from_json(&json) {
        Ok(validator) if !validator.is_empty() => {
            tracing::info!(tokens = validator.len(), "Static token validation enabled");
            Arc::new(validator)
        }
        Ok(_) => {
            eprintln!("Error: BOOKFINDER_API_TOKENS contains no tokens");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: BOOKFINDER_API_TOKENS contains invalid JSON: {}", e);
            std::process::exit(1);
        }
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    tracing::info!("Shutting down gracefully, draining in-flight requests...");
}
