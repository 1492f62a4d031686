use axum::{
    routing::{get, post},
    Router,
};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter, prelude::*};
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::{trace::{SdkTracerProvider, Sampler}, Resource};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use tracing_opentelemetry::OpenTelemetryLayer;

use crate::api::handlers::{
    admin_export_handler, admin_stats_handler, apply_referral_handler, claim_handler,
    complete_task_handler, connect_wallet_handler, leaderboard_handler, list_tasks_handler,
    live_updates_handler, user_me_handler, user_tasks_handler, AppState,
};
use crate::config::{AppConfig, StorageBackend};
use crate::db::{create_pool, EntityStore, MemoryStore, PgStore, SeedData};
use crate::domain::FarmingService;
use crate::notify::Notifier;

const SERVICE_NAME: &str = "gxr-farming";

pub fn init_tracing() {
    let enable_otel = env::var("OTEL_ENABLED").map(|v| v == "true").unwrap_or(false);

    let otel_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4318/v1/traces".to_string());

    let subscriber = tracing_subscriber::registry()
        .with(
            if !enable_otel {
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_span_events(fmt::format::FmtSpan::CLOSE) // Log span close with duration
            } else {
                fmt::layer()
                    .json()
                    .with_target(false)
            }
        )
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn,tower=warn,h2=error"))
        );

    if enable_otel {
        match init_opentelemetry(&otel_endpoint) {
            Ok(provider) => {
                opentelemetry::global::set_tracer_provider(provider.clone());

                // global::tracer returns BoxedTracer which doesn't implement PreSampledTracer
                let tracer = provider.tracer(SERVICE_NAME);

                subscriber
                    .with(OpenTelemetryLayer::new(tracer))
                    .init();

                info!("OpenTelemetry enabled: {}", otel_endpoint);
            }
            Err(e) => {
                subscriber.init();
                tracing::error!("Failed to initialize OpenTelemetry: {}. Continuing with logs only.", e);
            }
        }
    } else {
        subscriber.init();
    }
}

fn init_opentelemetry(endpoint: &str) -> Result<SdkTracerProvider, Box<dyn std::error::Error>> {
    let environment = env::var("ENVIRONMENT")
        .unwrap_or_else(|_| "development".to_string());

    let service_name = env::var("OTEL_SERVICE_NAME")
        .unwrap_or_else(|_| SERVICE_NAME.to_string());

    // Default 0.01 = 1%
    let sampling_rate = env::var("OTEL_TRACE_SAMPLING_RATE")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.01)
        .clamp(0.0, 1.0);

    let resource = Resource::builder()
        .with_attribute(KeyValue::new("service.name", service_name))
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .with_attribute(KeyValue::new("deployment.environment", environment))
        .build();

    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::TraceIdRatioBased(sampling_rate))
        .with_batch_exporter(exporter)
        .build();

    info!("OpenTelemetry sampling rate: {}%", sampling_rate * 100.0);

    Ok(provider)
}

/// Open the configured store, migrate it if needed and apply the seed
pub async fn create_store(config: &AppConfig) -> anyhow::Result<Arc<dyn EntityStore>> {
    let seed = match &config.seed_file {
        Some(path) => SeedData::from_file(path)?,
        None => SeedData::default(),
    };

    let store: Arc<dyn EntityStore> = match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for the postgres backend"))?;
            let store = PgStore::new(create_pool(database_url).await?);
            store.migrate().await?;
            Arc::new(store)
        }
    };

    store.seed(&seed).await?;
    Ok(store)
}

/// Routes over an already-built service
pub fn build_router(service: AppState) -> Router {
    Router::new()
        .route("/api/users/me/{telegram_id}", get(user_me_handler))
        .route("/api/users/{id}/claim", post(claim_handler))
        .route("/api/users/{id}/tasks", get(user_tasks_handler))
        .route(
            "/api/users/{user_id}/tasks/{task_id}/complete",
            post(complete_task_handler),
        )
        .route("/api/users/{user_id}/referral", post(apply_referral_handler))
        .route("/api/users/{user_id}/wallet", post(connect_wallet_handler))
        .route("/api/tasks", get(list_tasks_handler))
        .route("/api/leaderboard", get(leaderboard_handler))
        .route("/api/admin/stats", get(admin_stats_handler))
        .route("/api/admin/export", get(admin_export_handler))
        .route("/ws", get(live_updates_handler))
        .route("/health", get(health_check))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

pub async fn create_app(config: &AppConfig) -> anyhow::Result<Router> {
    let store = create_store(config).await?;
    let service = Arc::new(FarmingService::new(
        store,
        Notifier::new(),
        config.rewards.clone(),
    ));

    Ok(build_router(service))
}

async fn health_check() -> &'static str {
    "OK"
}

pub async fn run_server() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting GXR farming server");

    let config = AppConfig::from_env().map_err(anyhow::Error::msg)?;
    info!(
        storage = ?config.storage,
        claim_amount = config.rewards.claim_amount,
        cooldown_secs = config.rewards.claim_cooldown.num_seconds(),
        "Configuration loaded"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down gracefully...");
    };

    let app = create_app(&config).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
