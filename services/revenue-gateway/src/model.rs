//! Predictive models behind the gateway.
//!
//! Anything that can turn an [`InputRecord`] into numeric outputs implements
//! [`RevenueModel`]; the handler never looks past that trait. The on-disk artifact the
//! loader understands is [`ModelArtifact`], currently a (optionally standardized) linear
//! regression.

use crate::schema::InputRecord;
use anyhow::{anyhow, bail, ensure, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Given a record, produce the model outputs (one value per target) or fail.
pub trait RevenueModel: Send + Sync + fmt::Debug {
    fn predict(&self, record: &InputRecord) -> Result<Vec<f64>>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearRegression),
}

impl ModelArtifact {
    /// Structural checks that do not need an input row.
    pub fn validate(&self) -> Result<()> {
        match self { ModelArtifact::Linear(m) => m.validate() }
    }

    pub fn into_model(self) -> Result<Box<dyn RevenueModel>> {
        self.validate()?;
        match self { ModelArtifact::Linear(m) => Ok(Box::new(m)) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardScaler { pub mean: Vec<f64>, pub scale: Vec<f64> }

impl StandardScaler {
    fn transform(&self, x: f64, i: usize) -> f64 {
        let scale = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] };
        (x - self.mean[i]) / scale
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearRegression {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl LinearRegression {
    pub fn n_features(&self) -> usize { self.coefficients.len() }

    fn validate(&self) -> Result<()> {
        ensure!(!self.coefficients.is_empty(), "linear model has no coefficients");
        ensure!(self.intercept.is_finite() && self.coefficients.iter().all(|c| c.is_finite()), "linear model has non-finite parameters");
        if let Some(names) = &self.feature_names {
            ensure!(names.len() == self.n_features(), "feature_names has {} entries but model has {} coefficients", names.len(), self.n_features());
        }
        if let Some(s) = &self.scaler {
            ensure!(s.mean.len() == self.n_features() && s.scale.len() == self.n_features(),
                "scaler shape (mean {}, scale {}) does not match {} coefficients", s.mean.len(), s.scale.len(), self.n_features());
        }
        Ok(())
    }

    // Parameters are public, so a model built in code may never have gone through `into_model`.
    fn check_columns(&self, record: &InputRecord) -> Result<()> {
        self.validate()?;
        if record.len() != self.n_features() {
            bail!("model expects {} features, got {}", self.n_features(), record.len());
        }
        if let Some(expected) = &self.feature_names {
            for (i, (want, got)) in expected.iter().zip(record.names()).enumerate() {
                if want != got { return Err(anyhow!("feature name mismatch at position {i}: model expects '{want}', got '{got}'")); }
            }
        }
        Ok(())
    }
}

impl RevenueModel for LinearRegression {
    fn predict(&self, record: &InputRecord) -> Result<Vec<f64>> {
        self.check_columns(record)?;
        let y = record.iter().enumerate().fold(self.intercept, |acc, (i, (_, x))| {
            let x = match &self.scaler { Some(s) => s.transform(x, i), None => x };
            acc + self.coefficients[i] * x
        });
        Ok(vec![y])
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schema::COFFEE_SHOP_FEATURES;

    pub(crate) fn record(values: [f64; 6]) -> InputRecord {
        InputRecord::from_columns(COFFEE_SHOP_FEATURES.iter().copied().zip(values).collect())
    }

    fn linear() -> LinearRegression {
        LinearRegression {
            intercept: 10.0,
            coefficients: vec![1.0, 2.0, 0.5, 3.0, 0.1, 0.05],
            feature_names: Some(COFFEE_SHOP_FEATURES.iter().map(|s| s.to_string()).collect()),
            scaler: None,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn linear_prediction_is_intercept_plus_dot_product() {
        let out = linear().predict(&record([100.0, 5.5, 10.0, 3.0, 20.0, 200.0])).unwrap();
        // 10 + 100 + 11 + 5 + 9 + 2 + 10
        assert_eq!(out.len(), 1);
        assert!((out[0] - 147.0).abs() < 1e-9);
    }

    #[test]
    fn scaler_standardizes_before_dot_product() {
        let mut m = linear();
        m.scaler = Some(StandardScaler { mean: vec![100.0; 6], scale: vec![10.0, 0.0, 1.0, 1.0, 1.0, 1.0] });
        m.coefficients = vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let out = m.predict(&record([120.0, 101.0, 0.0, 0.0, 0.0, 0.0])).unwrap();
        // (120-100)/10 + (101-100)/1 (zero scale treated as one)
        assert!((out[0] - (10.0 + 2.0 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let mut m = linear();
        m.coefficients.pop();
        m.feature_names = None;
        let err = m.predict(&record([1.0; 6])).unwrap_err();
        assert!(err.to_string().contains("expects 5 features, got 6"));
    }

    #[test]
    fn feature_name_mismatch_is_an_error() {
        let mut m = linear();
        if let Some(names) = m.feature_names.as_mut() { names.swap(0, 1); }
        let err = m.predict(&record([1.0; 6])).unwrap_err();
        assert!(err.to_string().contains("position 0"));
    }

    #[test]
    fn invalid_artifacts_are_rejected_at_conversion() {
        let empty = ModelArtifact::Linear(LinearRegression { coefficients: vec![], feature_names: None, ..linear() });
        assert!(empty.into_model().is_err());
        let bad_names = ModelArtifact::Linear(LinearRegression { feature_names: Some(vec!["a".into()]), ..linear() });
        assert!(bad_names.into_model().is_err());
        let bad_scaler = ModelArtifact::Linear(LinearRegression { scaler: Some(StandardScaler { mean: vec![0.0], scale: vec![1.0] }), ..linear() });
        assert!(bad_scaler.validate().is_err());
    }

    #[test]
    fn hand_built_model_with_short_scaler_errors_instead_of_panicking() {
        let mut m = linear();
        m.scaler = Some(StandardScaler { mean: vec![0.0; 2], scale: vec![1.0; 2] });
        let err = m.predict(&record([1.0; 6])).unwrap_err();
        assert!(err.to_string().contains("scaler shape"), "{err}");
    }

    #[test]
    fn artifact_json_uses_kind_tag() {
        let json = r#"{"kind":"linear","intercept":1.5,"coefficients":[1,2,3,4,5,6]}"#;
        let art: ModelArtifact = serde_json::from_str(json).unwrap();
        let ModelArtifact::Linear(m) = &art;
        assert_eq!(m.n_features(), 6);
        assert!(m.feature_names.is_none());
        assert!(art.validate().is_ok());
    }
}
