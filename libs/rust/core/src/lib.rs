//! Core shared utilities for brewcast services.

use anyhow::Result;
use axum::{http::{header, StatusCode}, response::{IntoResponse, Response}, routing::get, Json, Router};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter, Layer};

mod metrics_ext;
pub use metrics_ext::{init_metrics, metrics_initialized, prediction_metrics, record_prediction, PredictionMetrics, PredictionOutcome};

static TRACING_INIT: OnceCell<()> = OnceCell::new();
static NODE_LIVENESS: AtomicBool = AtomicBool::new(true);
static NODE_READINESS: AtomicBool = AtomicBool::new(false);
static STATUS_DETAIL: Lazy<RwLock<Option<String>>> = Lazy::new(|| RwLock::new(None));

pub const ENV_PREFIX: &str = "BREWCAST";

pub fn mark_ready() { NODE_READINESS.store(true, Ordering::SeqCst); }
pub fn clear_ready() { NODE_READINESS.store(false, Ordering::SeqCst); }
pub fn mark_not_live() { NODE_LIVENESS.store(false, Ordering::SeqCst); }
pub fn is_ready() -> bool { NODE_READINESS.load(Ordering::SeqCst) }

/// Attach a human-readable note to `/status` (e.g. why the service is not ready).
pub fn set_status_detail(detail: Option<String>) { *STATUS_DETAIL.write() = detail; }

/// `RUST_LOG` wins when set; otherwise `default_level` (the configured `log_level`) applies.
pub fn init_tracing(service: &str, default_level: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let json = std::env::var("BREWCAST_JSON_LOG").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let fmt_layer: Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> = if json {
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .boxed()
        };
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry().with(fmt_layer).with(env_filter).try_init()?;
        Ok(())
    })?;
    info!(target: "brewcast", service, "tracing initialized");
    Ok(())
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub log_level: String,
}

/// Defaults, then the file named by `BREWCAST_CONFIG_FILE`, then `BREWCAST__*` env vars.
pub fn load_config(service: &str) -> Result<ServiceConfig> {
    let file = std::env::var("BREWCAST_CONFIG_FILE").ok().map(PathBuf::from);
    load_config_from(service, file.as_deref())
}

pub fn load_config_from(service: &str, file: Option<&Path>) -> Result<ServiceConfig> {
    let mut builder = config::Config::builder()
        .set_default("service_name", service)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 5000_i64)?
        .set_default("model_path", "models/coffee.pkl")?
        .set_default("log_level", "info")?;
    if let Some(f) = file {
        builder = builder.add_source(config::File::from(f).required(false));
    }
    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__"));
    let cfg: ServiceConfig = builder.build()?.try_deserialize()?;
    Ok(cfg)
}

/// `/live`, `/ready`, `/status` and `/metrics`; merge into a service router.
pub fn health_router(service: &str) -> Router {
    let service = service.to_string();
    Router::new()
        .route("/live", get(|| async { Json(serde_json::json!({"live": NODE_LIVENESS.load(Ordering::SeqCst)})) }))
        .route("/ready", get(|| async { Json(serde_json::json!({"ready": is_ready()})) }))
        .route("/status", get(move || {
            let service = service.clone();
            async move {
                Json(serde_json::json!({
                    "live": NODE_LIVENESS.load(Ordering::SeqCst),
                    "ready": is_ready(),
                    "service": service,
                    "version": env!("CARGO_PKG_VERSION"),
                    "detail": STATUS_DETAIL.read().clone(),
                }))
            }
        }))
        .route("/metrics", get(metrics_handler))
}

async fn metrics_handler() -> Response {
    if !metrics_initialized() {
        return (StatusCode::SERVICE_UNAVAILABLE, "metrics not initialized").into_response();
    }
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&metric_families, &mut buf) {
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("encode error: {e}")).into_response();
    }
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], buf).into_response()
}

/// Resolves on Ctrl+C; flips liveness off so health checks see the drain.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error=?e, "ctrl_c listener failed");
    }
    clear_ready();
    mark_not_live();
    info!(target: "brewcast", "shutdown signal received");
}
