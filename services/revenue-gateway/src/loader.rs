//! Startup model loading: ordered deserialization strategies, first success wins.

use crate::model::{ModelArtifact, RevenueModel};
use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type AttemptFn<T> = Box<dyn Fn(&Path) -> Result<T> + Send + Sync>;

/// One named way of turning an artifact path into a value.
pub struct Strategy<T> {
    pub name: &'static str,
    attempt: AttemptFn<T>,
}

impl<T> Strategy<T> {
    pub fn new(name: &'static str, attempt: impl Fn(&Path) -> Result<T> + Send + Sync + 'static) -> Self {
        Self { name, attempt: Box::new(attempt) }
    }
}

impl<T> fmt::Debug for Strategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_struct("Strategy").field("name", &self.name).finish() }
}

/// Every strategy failed; one entry per attempt, in the order tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError { pub failures: Vec<(&'static str, String)> }

impl LoadError {
    pub fn strategies(&self) -> impl Iterator<Item = &'static str> + '_ { self.failures.iter().map(|(n, _)| *n) }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tried: Vec<&str> = self.strategies().collect();
        let errors: Vec<String> = self.failures.iter().map(|(n, e)| format!("{n}: {e}")).collect();
        write!(f, "Model could not be loaded. Tried {}. Errors: {}", tried.join(", "), errors.join("; "))
    }
}

impl std::error::Error for LoadError {}

/// Run `strategies` in order against `path`. Errors and panics inside a strategy are
/// recorded and never stop the next attempt.
pub fn first_success<T>(path: &Path, strategies: &[Strategy<T>]) -> Result<(&'static str, T), LoadError> {
    let mut failures = Vec::with_capacity(strategies.len());
    for s in strategies {
        let outcome = catch_unwind(AssertUnwindSafe(|| (s.attempt)(path)))
            .unwrap_or_else(|panic| Err(anyhow!("strategy panicked: {}", panic_message(&panic))));
        match outcome {
            Ok(v) => return Ok((s.name, v)),
            Err(e) => {
                let reason = format!("{e:#}");
                debug!(strategy = s.name, error = %reason, "load attempt failed");
                failures.push((s.name, reason));
            }
        }
    }
    Err(LoadError { failures })
}

pub(crate) fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    panic.downcast_ref::<&str>().map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into())
}

fn from_json(path: &Path) -> Result<ModelArtifact> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(serde_json::from_reader(BufReader::new(f))?)
}

// Each byte maps to the code point of the same value, so any byte string decodes.
fn from_json_latin1(path: &Path) -> Result<ModelArtifact> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let text: String = bytes.iter().map(|&b| b as char).collect();
    Ok(serde_json::from_str(&text)?)
}

fn from_yaml(path: &Path) -> Result<ModelArtifact> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(serde_yaml::from_reader(BufReader::new(f))?)
}

fn artifact_strategy(name: &'static str, read: fn(&Path) -> Result<ModelArtifact>) -> Strategy<Arc<dyn RevenueModel>> {
    Strategy::new(name, move |p| Ok(Arc::from(read(p)?.into_model()?)))
}

/// The production order: plain JSON, JSON read as Latin-1, then YAML (anchors/aliases).
pub fn default_strategies() -> Vec<Strategy<Arc<dyn RevenueModel>>> {
    vec![
        artifact_strategy("json", from_json),
        artifact_strategy("json_latin1", from_json_latin1),
        artifact_strategy("yaml", from_yaml),
    ]
}

pub fn load_model(path: &Path) -> Result<Arc<dyn RevenueModel>, LoadError> {
    load_model_with(path, &default_strategies())
}

pub fn load_model_with(path: &Path, strategies: &[Strategy<Arc<dyn RevenueModel>>]) -> Result<Arc<dyn RevenueModel>, LoadError> {
    match first_success(path, strategies) {
        Ok((name, model)) => {
            info!(target: "revenue-gateway", strategy = name, path = %path.display(), "model loaded");
            Ok(model)
        }
        Err(e) => {
            warn!(target: "revenue-gateway", path = %path.display(), error = %e, "model unavailable");
            Err(e)
        }
    }
}
