//! Prediction metrics registered into the prometheus default registry.
//!
//! Registration happens once via [`init_metrics`]; recording before that is a no-op so
//! library code and tests never need a metrics backend.

use anyhow::Result;
use once_cell::sync::OnceCell;
use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionOutcome { Ok, InvalidInput, ModelUnavailable, PredictionFailed }

impl PredictionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionOutcome::Ok => "ok",
            PredictionOutcome::InvalidInput => "invalid_input",
            PredictionOutcome::ModelUnavailable => "model_unavailable",
            PredictionOutcome::PredictionFailed => "prediction_failed",
        }
    }
}

#[derive(Clone)]
pub struct PredictionMetrics {
    pub predictions_total: IntCounterVec,
    pub latency_ms: Histogram,
}

static PREDICTION_METRICS: OnceCell<PredictionMetrics> = OnceCell::new();

/// Register prediction metrics (idempotent).
pub fn init_metrics() -> Result<()> {
    PREDICTION_METRICS.get_or_try_init(|| -> Result<PredictionMetrics> {
        let predictions_total = IntCounterVec::new(
            Opts::new("brewcast_predictions_total", "Prediction requests by outcome"),
            &["outcome"],
        )?;
        let latency_ms = Histogram::with_opts(
            HistogramOpts::new("brewcast_prediction_latency_ms", "Model invocation latency (ms)")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0]),
        )?;
        prometheus::register(Box::new(predictions_total.clone()))?;
        prometheus::register(Box::new(latency_ms.clone()))?;
        Ok(PredictionMetrics { predictions_total, latency_ms })
    })?;
    Ok(())
}

pub fn metrics_initialized() -> bool { PREDICTION_METRICS.get().is_some() }

pub fn prediction_metrics() -> Option<&'static PredictionMetrics> { PREDICTION_METRICS.get() }

pub fn record_prediction(outcome: PredictionOutcome, model_latency: Option<Duration>) {
    let Some(m) = PREDICTION_METRICS.get() else { return };
    m.predictions_total.with_label_values(&[outcome.as_str()]).inc();
    if let Some(d) = model_latency { m.latency_ms.observe(d.as_secs_f64() * 1000.0); }
}
