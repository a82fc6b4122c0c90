//! Context Engine service binary
//!
//! Wires the GraphRAG and case store clients, the tiered cache, the
//! context builder and the dependency health watcher, then serves the
//! HTTP API with a Prometheus exposition endpoint on a separate port.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use context_engine::api::{run_api_server, AppState};
use context_engine::builder::ContextBuilder;
use context_engine::cache::{CacheConfig, CacheManager};
use context_engine::clients::{CaseStoreClient, CaseStoreConfig, GraphRagClient, GraphRagConfig};
use context_engine::error::{Error, Result};
use context_engine::health::HealthWatcher;
use context_engine::metrics;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Context Engine - case-centric context retrieval service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// API server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8015")]
    bind_addr: String,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8016")]
    metrics_addr: String,

    /// GraphRAG service URL
    #[arg(long, env = "GRAPHRAG_URL", default_value = "http://localhost:8010")]
    graphrag_url: String,

    /// GraphRAG request timeout in seconds
    #[arg(long, env = "GRAPHRAG_TIMEOUT_SECONDS", default_value = "30")]
    graphrag_timeout_seconds: u64,

    /// Maximum retries for transient GraphRAG failures
    #[arg(long, env = "GRAPHRAG_MAX_RETRIES", default_value = "3")]
    graphrag_max_retries: u32,

    /// Case store URL
    #[arg(long, env = "CASE_STORE_URL", default_value = "http://localhost:3000")]
    case_store_url: String,

    /// Case store API key
    #[arg(long, env = "CASE_STORE_API_KEY")]
    case_store_api_key: Option<String>,

    /// Case store request timeout in seconds
    #[arg(long, env = "CASE_STORE_TIMEOUT_SECONDS", default_value = "10")]
    case_store_timeout_seconds: u64,

    /// Disable the in-process memory cache tier
    #[arg(long, env = "DISABLE_MEMORY_CACHE")]
    disable_memory_cache: bool,

    /// Memory cache capacity in entries
    #[arg(long, env = "MEMORY_CACHE_MAX_ENTRIES", default_value = "1000")]
    memory_cache_max_entries: usize,

    /// Memory cache TTL in seconds
    #[arg(long, env = "MEMORY_CACHE_TTL_SECONDS", default_value = "600")]
    memory_cache_ttl_seconds: u64,

    /// Dependency health check interval in seconds
    #[arg(long, env = "HEALTH_CHECK_INTERVAL_SECONDS", default_value = "30")]
    health_check_interval_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    info!("Starting Context Engine");
    info!("  Bind address: {}", args.bind_addr);
    info!("  GraphRAG URL: {}", args.graphrag_url);
    info!("  Case store URL: {}", args.case_store_url);
    info!("  Memory cache: {}", !args.disable_memory_cache);

    let bind_addr: SocketAddr = args
        .bind_addr
        .parse()
        .map_err(|e| Error::Internal(format!("invalid bind address: {e}")))?;

    // Outbound clients
    let graphrag = Arc::new(GraphRagClient::new(GraphRagConfig {
        base_url: args.graphrag_url.clone(),
        timeout: Duration::from_secs(args.graphrag_timeout_seconds),
        max_retries: args.graphrag_max_retries,
        retry_delay: Duration::from_secs(1),
    })?);

    let store = Arc::new(CaseStoreClient::new(CaseStoreConfig {
        base_url: args.case_store_url.clone(),
        api_key: args.case_store_api_key.clone(),
        timeout: Duration::from_secs(args.case_store_timeout_seconds),
    })?);

    // Tiered cache
    let cache_config = CacheConfig {
        memory_enabled: !args.disable_memory_cache,
        memory_max_entries: args.memory_cache_max_entries,
        memory_ttl_seconds: args.memory_cache_ttl_seconds,
        ..Default::default()
    };
    let cache = Arc::new(CacheManager::with_config(cache_config, None));

    // Context builder with the five dimension analyzers
    let builder = Arc::new(ContextBuilder::new(
        graphrag.clone(),
        store.clone(),
        cache,
    ));

    // Dependency health watcher
    let health = HealthWatcher::new(
        graphrag,
        store,
        Duration::from_secs(args.health_check_interval_seconds),
    );
    health.check_once().await;
    tokio::spawn(health.clone().run());

    // Metrics server on its own port
    let metrics_addr = args.metrics_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(&metrics_addr).await {
            error!("Metrics server error: {}", e);
        }
    });

    // Run the API server
    let state = AppState { builder, health };
    run_api_server(bind_addr, state).await?;

    info!("Context Engine shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str) -> Result<()> {
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response, StatusCode};
    use hyper_util::rt::TokioIo;
    use tokio::net::TcpListener;

    async fn metrics_handler(
        req: Request<hyper::body::Incoming>,
    ) -> std::result::Result<Response<Full<Bytes>>, std::convert::Infallible> {
        let response = match req.uri().path() {
            "/metrics" => {
                let buffer = metrics::gather();
                Response::builder()
                    .status(StatusCode::OK)
                    .header("Content-Type", "text/plain; version=0.0.4")
                    .body(Full::new(Bytes::from(buffer)))
                    .unwrap_or_default()
            }
            _ => {
                let mut response = Response::new(Full::new(Bytes::from("not found")));
                *response.status_mut() = StatusCode::NOT_FOUND;
                response
            }
        };
        Ok(response)
    }

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Internal(format!("invalid metrics server address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("failed to bind metrics server: {e}")))?;

    info!("Metrics server listening on {}", addr);

    loop {
        let (stream, _) = listener
            .accept()
            .await
            .map_err(|e| Error::Internal(format!("metrics server accept error: {e}")))?;

        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(metrics_handler))
                .await
            {
                tracing::debug!("Metrics server connection error: {}", e);
            }
        });
    }
}
