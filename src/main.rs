//! Process entry point: loads config, brings up the document store and
//! cache, wires every repository/engine into the bot's `Context`, starts
//! the background workers (ingest, deletion, maintenance, reconciler),
//! binds the metrics/health endpoint, and runs the bot dispatcher until a
//! shutdown signal arrives.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use filedex_access::{AccessRepository, ConnectionStore, FilterStore, SettingsView};
use filedex_broadcast::BroadcastEngine;
use filedex_cache::{Invalidator, RedisCache};
use filedex_core::config::FiledexConfig;
use filedex_core::types::ChatId;
use filedex_db::Database;
use filedex_delivery::{BatchLinkStore, DeliveryEngine, TaskRegistry};
use filedex_deletion::{DeletionQueue, DeletionWorker};
use filedex_index::{ChannelStore, MediaRepository};
use filedex_ingest::{IngestQueue, IngestWorker};
use filedex_maintenance::MaintenanceLoop;
use filedex_query::{NoopRecommendations, QueryPipeline, SessionStore};
use filedex_ratelimit::{ActionLimiter, SemaphoreSet};
use filedex_subscription::SubscriptionGate;

use filedex_bot::context::Context;
use filedex_bot::TeloxidePlatform;

#[derive(Parser, Debug)]
#[command(name = "filedex", about = "Media index and distribution bot")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "filedex.toml")]
    config: String,

    /// Run migrations and exit without starting the bot.
    #[arg(long)]
    migrate_only: bool,

    /// Override `logging.level` from the config file.
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn health_router(db: Arc<Database>) -> Router {
    Router::new()
        .route(
            "/healthz",
            get(move || {
                let db = db.clone();
                async move {
                    match db.health_check().await {
                        Ok(true) => Json(serde_json::json!({"status": "ok"})),
                        Ok(false) => Json(serde_json::json!({"status": "degraded"})),
                        Err(e) => Json(serde_json::json!({"status": "error", "error": e.to_string()})),
                    }
                }
            }),
        )
        .route(
            "/metrics",
            get(|| async { "# filedex metrics are exported via the process-global prometheus recorder\n" }),
        )
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match FiledexConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration from {}: {e}", cli.config);
            std::process::exit(1);
        }
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    init_tracing(&config.logging.level, config.logging.json);
    info!("starting filedex");

    if config.metrics.enabled {
        if let Err(e) = PrometheusBuilder::new().install_recorder() {
            warn!(error = %e, "failed to install prometheus recorder");
        }
    }

    let mut db = Database::new(config.database.clone());
    if let Err(e) = db.initialize().await {
        error!(error = %e, "failed to initialize document store");
        std::process::exit(1);
    }
    if cli.migrate_only {
        info!("migrations applied, exiting (--migrate-only)");
        return;
    }
    let pool = db.pool().expect("pool initialized above").clone();
    let db = Arc::new(db);

    let cache = match RedisCache::connect(&config.cache.url).await {
        Ok(c) => Arc::new(c) as Arc<dyn filedex_cache::CacheStore>,
        Err(e) => {
            error!(error = %e, "failed to connect to cache, falling back to an in-memory cache");
            Arc::new(filedex_cache::store::fake::InMemoryCache::new()) as Arc<dyn filedex_cache::CacheStore>
        }
    };
    let invalidator = Arc::new(Invalidator::new(cache.clone()));

    let access = Arc::new(AccessRepository::new(pool.clone(), cache.clone(), invalidator.clone()));
    let media = Arc::new(MediaRepository::new(pool.clone(), cache.clone(), invalidator.clone(), config.cache.media_ttl_secs));
    let filters = Arc::new(FilterStore::new(pool.clone()));
    let connections = Arc::new(ConnectionStore::new(pool.clone()));
    let settings = Arc::new(SettingsView::new(pool.clone(), cache.clone(), invalidator.clone()));
    let channels = Arc::new(ChannelStore::new(pool.clone()));
    let batch_links = Arc::new(BatchLinkStore::new(pool.clone()));

    let sessions = Arc::new(SessionStore::new(cache.clone(), config.cache.result_session_ttl_secs));

    let mut limiter_configs = HashMap::new();
    limiter_configs.insert("search".to_string(), config.rate_limit.search.clone());
    limiter_configs.insert("file_request".to_string(), config.rate_limit.file_request.clone());
    limiter_configs.insert("broadcast".to_string(), config.rate_limit.broadcast.clone());
    limiter_configs.insert("inline_query".to_string(), config.rate_limit.inline_query.clone());
    limiter_configs.insert("premium_check".to_string(), config.rate_limit.premium_check.clone());
    let rate_limiter = Arc::new(ActionLimiter::new(cache.clone(), limiter_configs));

    let semaphores = Arc::new(SemaphoreSet::new([
        ("database_write".to_string(), config.quota.database_write_permits),
        ("platform_send".to_string(), config.quota.platform_send_permits),
    ]));

    let bot = teloxide::Bot::new(&config.platform.bot_token);
    let platform = Arc::new(TeloxidePlatform::new(bot.clone())) as Arc<dyn filedex_delivery::PlatformClient>;

    let required_channels: Vec<ChatId> = config
        .platform
        .required_subscriptions
        .iter()
        .filter_map(|s| s.parse::<i64>().ok().map(ChatId))
        .collect();
    let subscription_gate = Arc::new(SubscriptionGate::new(platform.clone(), required_channels));

    let tasks = Arc::new(TaskRegistry::new());
    let query = Arc::new(QueryPipeline::new(rate_limiter.clone(), access.clone(), media.clone(), sessions.clone()));
    let delivery = Arc::new(DeliveryEngine::new(
        platform.clone(),
        access.clone(),
        media.clone(),
        sessions.clone(),
        semaphores.clone(),
        tasks.clone(),
    ));
    let broadcast = Arc::new(BroadcastEngine::new(access.clone(), platform.clone(), semaphores.clone()));

    let ingest_queue = Arc::new(IngestQueue::new(config.ingest.primary_queue_capacity, config.ingest.overflow_capacity));
    let deletion_queue = Arc::new(DeletionQueue::new(256));
    let maintenance = Arc::new(MaintenanceLoop::new(access.clone(), settings.clone(), config.platform.premium_duration_days));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let deletion_worker = Arc::new(DeletionWorker::new(media.clone()));
    let deletion_receiver = deletion_queue.take_receiver().await;
    let deletion_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        deletion_worker
            .run(deletion_receiver, deletion_shutdown, |stats| {
                info!(?stats, "deletion worker window complete");
            })
            .await;
    });

    let ingest_worker = Arc::new(IngestWorker::new(
        ingest_queue.clone(),
        media.clone(),
        semaphores.clone(),
        std::time::Duration::from_millis(config.ingest.batch_deadline_ms),
    ));
    let ingest_receiver = ingest_queue.take_receiver();
    let ingest_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        ingest_worker
            .run(ingest_receiver, ingest_shutdown, |stats| {
                info!(?stats, "ingestion worker window complete");
            })
            .await;
    });

    let reconcile_interval = std::time::Duration::from_secs(config.ingest.reconcile_interval_secs);
    let ingest_queue_for_reconciler = ingest_queue.clone();
    let reconcile_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        filedex_ingest::run_reconciler(ingest_queue_for_reconciler, reconcile_interval, reconcile_shutdown).await;
    });

    let maintenance_for_loop = maintenance.clone();
    let maintenance_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        maintenance_for_loop.run(maintenance_shutdown).await;
    });

    if config.metrics.enabled {
        let addr: SocketAddr = config.metrics.bind_addr.parse().unwrap_or_else(|_| "0.0.0.0:9898".parse().unwrap());
        let db_for_health = db.clone();
        tokio::spawn(async move {
            let app = health_router(db_for_health).await;
            match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => {
                    if let Err(e) = axum::serve(listener, app).await {
                        error!(error = %e, "metrics/health server stopped");
                    }
                }
                Err(e) => error!(error = %e, addr = %addr, "failed to bind metrics/health server"),
            }
        });
    }

    let ctx = Arc::new(Context {
        config: Arc::new(config),
        platform,
        access,
        media,
        cache,
        cache_invalidator: invalidator,
        filters,
        connections,
        settings,
        channels,
        ingest_queue,
        sessions,
        recommendations: Arc::new(NoopRecommendations),
        query,
        delivery,
        broadcast,
        batch_links,
        deletion_queue,
        maintenance,
        subscription_gate,
        rate_limiter,
        semaphores,
        broadcast_cancel: Arc::new(Mutex::new(None)),
    });

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        let _ = shutdown_tx.send(true);
    });

    filedex_bot::dispatch::run(bot, ctx).await;
}
