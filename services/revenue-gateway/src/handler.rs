//! Prediction handling independent of the HTTP layer.

use crate::input::{build_input_record, ValidationError};
use crate::loader::{load_model, panic_message, LoadError};
use crate::model::RevenueModel;
use crate::schema::{FeatureSchema, InputRecord};
use anyhow::anyhow;
use brewcast_core::{record_prediction, PredictionOutcome};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// The loaded model, or why there is none. Fixed for the life of the process.
#[derive(Debug, Clone)]
pub enum ModelHandle {
    Loaded(Arc<dyn RevenueModel>),
    Unavailable { load_error: String },
}

/// Everything a request needs, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct PredictionContext {
    schema: FeatureSchema,
    model: ModelHandle,
}

impl PredictionContext {
    pub fn new(schema: FeatureSchema, model: ModelHandle) -> Self { Self { schema, model } }

    pub fn with_model(model: Arc<dyn RevenueModel>) -> Self { Self::new(FeatureSchema::default(), ModelHandle::Loaded(model)) }

    pub fn unavailable(load_error: impl Into<String>) -> Self {
        Self::new(FeatureSchema::default(), ModelHandle::Unavailable { load_error: load_error.into() })
    }

    pub fn from_load_result(schema: FeatureSchema, loaded: Result<Arc<dyn RevenueModel>, LoadError>) -> Self {
        let model = match loaded {
            Ok(m) => ModelHandle::Loaded(m),
            Err(e) => ModelHandle::Unavailable { load_error: e.to_string() },
        };
        Self::new(schema, model)
    }

    /// Load the artifact at `path` with the default strategies; never fails.
    pub fn load(path: &Path) -> Self { Self::from_load_result(FeatureSchema::default(), load_model(path)) }

    pub fn schema(&self) -> &FeatureSchema { &self.schema }
    pub fn is_ready(&self) -> bool { matches!(self.model, ModelHandle::Loaded(_)) }

    pub fn load_error(&self) -> Option<&str> {
        match &self.model {
            ModelHandle::Loaded(_) => None,
            ModelHandle::Unavailable { load_error } => Some(load_error.as_str()),
        }
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Model prediction failed: {0}")]
    PredictionFailed(String),
}

impl PredictError {
    /// HTTP status the failure maps to.
    pub fn status(&self) -> u16 {
        match self { PredictError::Invalid(_) => 400, PredictError::ModelUnavailable(_) | PredictError::PredictionFailed(_) => 500 }
    }

    fn outcome(&self) -> PredictionOutcome {
        match self {
            PredictError::ModelUnavailable(_) => PredictionOutcome::ModelUnavailable,
            PredictError::Invalid(_) => PredictionOutcome::InvalidInput,
            PredictError::PredictionFailed(_) => PredictionOutcome::PredictionFailed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub prediction: f64,
    pub input: InputRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
}

impl From<&PredictError> for FailureResponse {
    fn from(e: &PredictError) -> Self { Self { success: false, error: e.to_string() } }
}

/// Model check first, then validation, then invocation; the first failure is returned.
#[instrument(skip_all)]
pub fn predict(ctx: &PredictionContext, form: &HashMap<String, String>) -> Result<PredictionResponse, PredictError> {
    let (result, model_latency) = predict_inner(ctx, form);
    match &result {
        Ok(r) => {
            debug!(prediction = r.prediction, "prediction served");
            record_prediction(PredictionOutcome::Ok, model_latency);
        }
        Err(e) => {
            warn!(status = e.status(), error = %e, "prediction request failed");
            record_prediction(e.outcome(), model_latency);
        }
    }
    result
}

// Latency is `Some` whenever the model was actually invoked, whatever the outcome.
fn predict_inner(ctx: &PredictionContext, form: &HashMap<String, String>) -> (Result<PredictionResponse, PredictError>, Option<Duration>) {
    let model = match &ctx.model {
        ModelHandle::Loaded(m) => m,
        ModelHandle::Unavailable { load_error } => return (Err(PredictError::ModelUnavailable(load_error.clone())), None),
    };
    let input = match build_input_record(&ctx.schema, form) {
        Ok(input) => input,
        Err(e) => return (Err(e.into()), None),
    };
    let started = Instant::now();
    let prediction = invoke(model.as_ref(), &input);
    let elapsed = started.elapsed();
    (prediction.map(|prediction| PredictionResponse { success: true, prediction, input }), Some(elapsed))
}

// A panicking model is a failed prediction, not a dropped connection.
fn invoke(model: &dyn RevenueModel, input: &InputRecord) -> Result<f64, PredictError> {
    let outputs = catch_unwind(AssertUnwindSafe(|| model.predict(input)))
        .unwrap_or_else(|panic| Err(anyhow!("model panicked: {}", panic_message(&panic))))
        .map_err(|e| PredictError::PredictionFailed(format!("{e:#}")))?;
    single_output(&outputs).map_err(PredictError::PredictionFailed)
}

// Multi-output models are rejected rather than silently truncated to the first value.
fn single_output(outputs: &[f64]) -> Result<f64, String> {
    match outputs {
        [v] if v.is_finite() => Ok(*v),
        [v] => Err(format!("model returned a non-finite value ({v})")),
        [] => Err("model returned no output".into()),
        many => Err(format!("expected a single output, model returned {}", many.len())),
    }
}
