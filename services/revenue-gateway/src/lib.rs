//! Coffee shop revenue prediction gateway.
//!
//! Loads one regression model at startup and serves a form page plus `POST /predict`.

use anyhow::Result;
use brewcast_core::{init_metrics, init_tracing, is_ready, load_config, mark_ready, set_status_detail, shutdown_signal};
use std::sync::Arc;
use tracing::{info, warn};

pub mod handler;
pub mod input;
pub mod loader;
pub mod model;
pub mod page;
pub mod routes;
pub mod schema;

pub use handler::{predict, ModelHandle, PredictError, PredictionContext, PredictionResponse};
pub use input::{build_input_record, ValidationError};
pub use loader::{first_success, load_model, LoadError, Strategy};
pub use model::{ModelArtifact, RevenueModel};
pub use routes::router;
pub use schema::{FeatureSchema, InputRecord};

pub const SERVICE: &str = "revenue-gateway";

pub async fn run() -> Result<()> {
    let cfg = load_config(SERVICE)?;
    init_tracing(SERVICE, &cfg.log_level)?;
    init_metrics()?;
    info!(?cfg, "config loaded");

    let ctx = Arc::new(PredictionContext::load(&cfg.model_path));
    match ctx.load_error() {
        None => mark_ready(),
        Some(err) => {
            warn!(target: "revenue-gateway", "starting without a model; /predict will answer 500");
            set_status_detail(Some(err.to_string()));
        }
    }

    let listener = tokio::net::TcpListener::bind((cfg.host.as_str(), cfg.port)).await?;
    info!(target: "revenue-gateway", addr = ?listener.local_addr()?, ready = is_ready(), "listening");
    axum::serve(listener, router(ctx, &cfg.service_name))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!(target: "revenue-gateway", "shutdown");
    Ok(())
}
