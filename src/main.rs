//! FeedShard Daemon
//!
//! Runs the sharded feed access layer over in-memory infrastructure with a
//! small demo workload, exposing health and Prometheus metrics endpoints.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        FeedShard Daemon                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │ Feed Ranker  │───▶│ Data Access  │───▶│    Shard     │       │
//! │  │              │    │  (LRU cache) │    │   Manager    │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! │          health server │ metrics server │ health checker        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedshard::adapters::{
    AlertChannel, InMemorySocialGraph, InMemoryStorageBackend, LoggingEventPublisher,
    ShardedContentStore,
};
use feedshard::domain::{EngagementCounts, PostCandidate, UserId};
use feedshard::error::{Error, Result};
use feedshard::monitor::{HealthThresholds, SystemHealthChecker};
use feedshard::ranker::{RankerConfig, ScoringWeights};
use feedshard::service::{FeedService, ServiceConfig};
use feedshard::shard::{ShardConfig, ShardManager};
use feedshard::store::DataAccessLayer;
use feedshard::AccessMetrics;

// =============================================================================
// CLI Arguments
// =============================================================================

/// FeedShard - sharded feed access layer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Partitions to register, as comma-separated id:region pairs
    #[arg(
        long,
        env = "PARTITIONS",
        default_value = "alpha:us-east-1,beta:eu-west-1,gamma:ap-south-1"
    )]
    partitions: String,

    /// Value-cache capacity (entries)
    #[arg(long, env = "CACHE_CAPACITY", default_value = "4096")]
    cache_capacity: usize,

    /// Feed-cache capacity (entries)
    #[arg(long, env = "FEED_CACHE_CAPACITY", default_value = "1024")]
    feed_cache_capacity: usize,

    /// Virtual nodes per partition on the hash ring
    #[arg(long, env = "VIRTUAL_NODES", default_value = "128")]
    virtual_nodes: usize,

    /// Connection handles per partition pool
    #[arg(long, env = "POOL_CAPACITY", default_value = "8")]
    pool_capacity: usize,

    /// Recent posts considered per followed author
    #[arg(long, env = "CANDIDATE_WINDOW", default_value = "20")]
    candidate_window: usize,

    /// Default feed page size
    #[arg(long, env = "PAGE_SIZE", default_value = "25")]
    page_size: usize,

    /// Scoring weight for likes
    #[arg(long, env = "WEIGHT_LIKES", default_value = "1.0")]
    weight_likes: f64,

    /// Scoring weight for shares
    #[arg(long, env = "WEIGHT_SHARES", default_value = "2.0")]
    weight_shares: f64,

    /// Scoring weight for comments
    #[arg(long, env = "WEIGHT_COMMENTS", default_value = "1.5")]
    weight_comments: f64,

    /// Health check interval in seconds
    #[arg(long, env = "HEALTH_INTERVAL_SECONDS", default_value = "30")]
    health_interval_seconds: u64,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: String,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// Parse the `id:region` pairs from `--partitions`.
    fn shard_configs(&self) -> Result<Vec<ShardConfig>> {
        self.partitions
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|pair| {
                let (id, region) = pair.split_once(':').ok_or_else(|| {
                    Error::Config(format!(
                        "partition '{}' must be of the form id:region",
                        pair
                    ))
                })?;
                Ok(ShardConfig::new(id, region, self.pool_capacity))
            })
            .collect()
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting FeedShard");
    info!("  Partitions: {}", args.partitions);
    info!("  Cache capacity: {}", args.cache_capacity);
    info!("  Virtual nodes: {}", args.virtual_nodes);
    info!("  Pool capacity: {}", args.pool_capacity);
    info!("  Page size: {}", args.page_size);

    let shard_configs = args.shard_configs()?;
    if shard_configs.is_empty() {
        return Err(Error::Config(
            "at least one partition must be configured".to_string(),
        ));
    }

    let config = ServiceConfig {
        cache_capacity: args.cache_capacity,
        feed_cache_capacity: args.feed_cache_capacity,
        virtual_nodes: args.virtual_nodes,
        default_page_size: args.page_size,
        ranker: RankerConfig {
            candidate_window: args.candidate_window,
            weights: ScoringWeights {
                likes: args.weight_likes,
                shares: args.weight_shares,
                comments: args.weight_comments,
            },
            ..RankerConfig::default()
        },
    };

    // Wire the access layer: the content store rides on the same data access
    // layer the service exposes, so feed assembly exercises the full
    // cache/ring/pool path.
    let metrics = Arc::new(AccessMetrics::new());
    let shards = Arc::new(ShardManager::new(config.virtual_nodes)?);
    let backend = Arc::new(InMemoryStorageBackend::new());
    let store = Arc::new(DataAccessLayer::new(
        shards.clone(),
        backend,
        config.cache_capacity,
        metrics.clone(),
    )?);
    let content = Arc::new(ShardedContentStore::new(store.clone()));
    let graph = Arc::new(InMemorySocialGraph::new());
    let events = Arc::new(LoggingEventPublisher::info_level());

    let service = Arc::new(FeedService::from_parts(
        config,
        shards.clone(),
        store,
        metrics.clone(),
        graph.clone(),
        content.clone(),
        events,
    )?);

    for shard in shard_configs {
        service.add_shard(shard).await?;
    }
    info!("Registered {} partitions", shards.partition_count());

    seed_demo_data(&graph, &content).await?;

    let cancel = CancellationToken::new();

    // Health checker with log-based alerting
    let checker = Arc::new(SystemHealthChecker::new(
        shards,
        metrics.clone(),
        HealthThresholds::default(),
        vec![AlertChannel::Log],
    ));
    {
        let checker = checker.clone();
        let cancel = cancel.clone();
        let interval = Duration::from_secs(args.health_interval_seconds);
        tokio::spawn(async move {
            checker.run(interval, cancel).await;
        });
    }

    // Health server
    {
        let checker = checker.clone();
        let health_addr = args.health_addr.clone();
        tokio::spawn(async move {
            if let Err(e) = run_health_server(&health_addr, checker).await {
                error!("Health server error: {}", e);
            }
        });
    }

    // Metrics server
    {
        let metrics = metrics.clone();
        let metrics_addr = args.metrics_addr.clone();
        tokio::spawn(async move {
            if let Err(e) = run_metrics_server(&metrics_addr, metrics).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    // Demo workload: request a feed periodically so the endpoints show a
    // live system
    {
        let service = service.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            demo_workload(service, cancel).await;
        });
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::Internal(format!("Failed to listen for shutdown signal: {}", e)))?;
    info!("Shutdown signal received");
    cancel.cancel();

    info!("FeedShard shutdown complete");
    Ok(())
}

// =============================================================================
// Demo Workload
// =============================================================================

async fn seed_demo_data(
    graph: &Arc<InMemorySocialGraph>,
    content: &Arc<ShardedContentStore>,
) -> Result<()> {
    let reader = UserId::new("demo-reader");
    let now = Utc::now();

    for (author, posts) in [("alice", 4usize), ("bob", 3), ("carol", 5)] {
        graph.follow(&reader, &UserId::new(author));
        for i in 0..posts {
            content
                .publish_post(PostCandidate::new(
                    format!("{}-post-{}", author, i),
                    author,
                    now - ChronoDuration::hours(i as i64 * 6),
                    EngagementCounts::new((i as u64 + 1) * 3, i as u64, i as u64 * 2),
                ))
                .await?;
        }
    }

    info!("Seeded demo social graph and posts");
    Ok(())
}

async fn demo_workload(service: Arc<FeedService>, cancel: CancellationToken) {
    let reader = UserId::new("demo-reader");
    let mut ticker = tokio::time::interval(Duration::from_secs(10));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match service.default_feed(&reader).await {
                    Ok(feed) => info!(
                        posts = feed.posts.len(),
                        partial = feed.partial,
                        from_cache = feed.from_cache,
                        "Demo feed assembled"
                    ),
                    Err(e) => error!("Demo feed failed: {}", e),
                }
            }
            _ = cancel.cancelled() => return,
        }
    }
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
        .add_directive("hyper=warn".parse().expect("static directive"));

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
// Health Server
// =============================================================================

async fn run_health_server(addr: &str, checker: Arc<SystemHealthChecker>) -> Result<()> {
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response, StatusCode};
    use hyper_util::rt::TokioIo;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn health_handler(
        req: Request<hyper::body::Incoming>,
        checker: Arc<SystemHealthChecker>,
    ) -> std::result::Result<Response<Full<Bytes>>, std::convert::Infallible> {
        let response = match req.uri().path() {
            "/livez" => Response::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::from("ok")))
                .unwrap(),
            "/healthz" | "/readyz" => {
                let report = checker.on_tick();
                let status = if report.status.is_healthy() {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                let body = serde_json::to_vec(&report)
                    .unwrap_or_else(|_| b"{\"status\":\"unknown\"}".to_vec());
                Response::builder()
                    .status(status)
                    .header("Content-Type", "application/json")
                    .body(Full::new(Bytes::from(body)))
                    .unwrap()
            }
            _ => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Full::new(Bytes::from("not found")))
                .unwrap(),
        };
        Ok(response)
    }

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid health server address: {}", e)))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind health server: {}", e)))?;

    info!("Health server listening on {}", addr);

    loop {
        let (stream, _) = listener
            .accept()
            .await
            .map_err(|e| Error::Internal(format!("Health server accept error: {}", e)))?;

        let io = TokioIo::new(stream);
        let checker = checker.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| health_handler(req, checker.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                tracing::error!("Health server connection error: {}", e);
            }
        });
    }
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str, metrics: Arc<AccessMetrics>) -> Result<()> {
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response, StatusCode};
    use hyper_util::rt::TokioIo;
    use prometheus::{Encoder, TextEncoder};
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    let register = |name: &str, help: &str| {
        prometheus::register_int_gauge!(name, help)
            .map_err(|e| Error::Internal(format!("Failed to register {}: {}", name, e)))
    };

    let cache_hits = register("feedshard_cache_hits_total", "Value-cache hits")?;
    let cache_misses = register("feedshard_cache_misses_total", "Value-cache misses")?;
    let feed_cache_hits = register("feedshard_feed_cache_hits_total", "Feed-cache hits")?;
    let backend_reads = register("feedshard_backend_reads_total", "Backend reads attempted")?;
    let backend_writes = register("feedshard_backend_writes_total", "Backend writes attempted")?;
    let backend_failures = register("feedshard_backend_failures_total", "Backend failures")?;
    let feeds_assembled = register("feedshard_feeds_assembled_total", "Feeds assembled")?;
    let partial_feeds = register("feedshard_partial_feeds_total", "Partial feeds served")?;

    // Copy the access counters into the registry on a fixed cadence
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        loop {
            ticker.tick().await;
            let snapshot = metrics.snapshot();
            cache_hits.set(snapshot.cache_hits as i64);
            cache_misses.set(snapshot.cache_misses as i64);
            feed_cache_hits.set(snapshot.feed_cache_hits as i64);
            backend_reads.set(snapshot.backend_reads as i64);
            backend_writes.set(snapshot.backend_writes as i64);
            backend_failures.set(snapshot.backend_failures as i64);
            feeds_assembled.set(snapshot.feeds_assembled as i64);
            partial_feeds.set(snapshot.partial_feeds as i64);
        }
    });

    async fn metrics_handler(
        req: Request<hyper::body::Incoming>,
    ) -> std::result::Result<Response<Full<Bytes>>, std::convert::Infallible> {
        let response = match req.uri().path() {
            "/metrics" => {
                let encoder = TextEncoder::new();
                let metric_families = prometheus::gather();
                let mut buffer = Vec::new();
                if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
                    tracing::error!("Metrics encoding error: {}", e);
                }

                Response::builder()
                    .status(StatusCode::OK)
                    .header("Content-Type", encoder.format_type())
                    .body(Full::new(Bytes::from(buffer)))
                    .unwrap()
            }
            _ => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Full::new(Bytes::from("not found")))
                .unwrap(),
        };
        Ok(response)
    }

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid metrics server address: {}", e)))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind metrics server: {}", e)))?;

    info!("Metrics server listening on {}", addr);

    loop {
        let (stream, _) = listener
            .accept()
            .await
            .map_err(|e| Error::Internal(format!("Metrics server accept error: {}", e)))?;

        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(metrics_handler))
                .await
            {
                tracing::error!("Metrics server connection error: {}", e);
            }
        });
    }
}
