//! Fraud classifiers
//!
//! A classifier maps a feature vector to a fraud probability. The trained
//! variant is a logistic model loaded from a serialized artifact; the
//! heuristic variant is a fixed weighted sum used when no model loads.

use serde::{Deserialize, Serialize};

use crate::config::HeuristicWeights;
use crate::error::{FraudError, FraudResult};
use crate::types::FeatureVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    Trained,
    Heuristic,
}

/// Trait for fraud probability models
pub trait FraudClassifier: Send + Sync {
    /// Fraud probability in [0, 1]
    fn predict(&self, features: &FeatureVector) -> FraudResult<f64>;

    fn kind(&self) -> ClassifierKind;

    /// Version used as the calibration key
    fn model_version(&self) -> &str;
}

/// Logistic regression over the feature vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedClassifier {
    pub version: String,
    pub intercept: f64,
    /// Same order as `FeatureVector::as_array`
    pub weights: [f64; 3],
}

impl TrainedClassifier {
    pub fn new(version: impl Into<String>, intercept: f64, weights: [f64; 3]) -> FraudResult<Self> {
        let model = Self {
            version: version.into(),
            intercept,
            weights,
        };
        model.validate()?;
        Ok(model)
    }

    /// Load a model artifact of the form
    /// `{"version": "1.0", "intercept": -3.0, "weights": [2.0, 4.0, 1.5]}`.
    pub fn from_json(artifact: &str) -> FraudResult<Self> {
        let model: Self = serde_json::from_str(artifact)
            .map_err(|e| FraudError::ModelLoad(format!("unreadable artifact: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> FraudResult<()> {
        if self.version.trim().is_empty() {
            return Err(FraudError::ModelLoad("model version is empty".to_string()));
        }
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(FraudError::ModelLoad(
                "model coefficients must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl FraudClassifier for TrainedClassifier {
    fn predict(&self, features: &FeatureVector) -> FraudResult<f64> {
        if !features.is_finite() {
            return Err(FraudError::InvalidFeatures(format!(
                "non-finite feature in {:?}",
                features
            )));
        }

        let logit = self.intercept
            + self
                .weights
                .iter()
                .zip(features.as_array())
                .map(|(w, x)| w * x)
                .sum::<f64>();

        Ok(1.0 / (1.0 + (-logit).exp()))
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Trained
    }

    fn model_version(&self) -> &str {
        &self.version
    }
}

/// Weighted combination of deviation, fraud history and lateness
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicFallback {
    weights: HeuristicWeights,
}

impl HeuristicFallback {
    pub fn new(weights: HeuristicWeights) -> Self {
        Self { weights }
    }

    /// Infallible score; non-finite features count as zero.
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let clean = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };

        let score = self.weights.behavioral_deviation * clean(features.behavioral_deviation)
            + self.weights.historical_fraud_rate * clean(features.historical_fraud_rate)
            + self.weights.lateness_rate * clean(features.lateness_rate);

        score.clamp(0.0, 1.0)
    }
}

impl FraudClassifier for HeuristicFallback {
    fn predict(&self, features: &FeatureVector) -> FraudResult<f64> {
        Ok(self.score(features))
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Heuristic
    }

    fn model_version(&self) -> &str {
        "heuristic"
    }
}

/// Selects the classifier variant for a detector
pub struct ClassifierFactory;

impl ClassifierFactory {
    /// Trained model from `artifact`, or the heuristic when the artifact is
    /// missing or fails to load.
    pub fn from_json(
        artifact: Option<&str>,
        weights: HeuristicWeights,
    ) -> Box<dyn FraudClassifier> {
        match artifact.map(TrainedClassifier::from_json) {
            Some(Ok(model)) => {
                tracing::info!("Loaded fraud model version {}", model.version);
                Box::new(model)
            }
            Some(Err(e)) => {
                tracing::warn!("Fraud model unavailable ({}), using heuristic scoring", e);
                Box::new(HeuristicFallback::new(weights))
            }
            None => {
                tracing::warn!("No fraud model artifact, using heuristic scoring");
                Box::new(HeuristicFallback::new(weights))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn features(d: f64, f: f64, l: f64) -> FeatureVector {
        FeatureVector {
            behavioral_deviation: d,
            historical_fraud_rate: f,
            lateness_rate: l,
        }
    }

    #[test]
    fn test_trained_from_json() {
        let model = TrainedClassifier::from_json(
            r#"{"version": "2.0", "intercept": 0.0, "weights": [0.0, 0.0, 0.0]}"#,
        )
        .unwrap();

        assert_eq!(model.model_version(), "2.0");
        assert_eq!(model.kind(), ClassifierKind::Trained);
        assert_relative_eq!(model.predict(&features(0.3, 0.2, 0.1)).unwrap(), 0.5);
    }

    #[test]
    fn test_trained_logistic_output() {
        let model = TrainedClassifier::new("1.0", -1.0, [2.0, 0.0, 0.0]).unwrap();
        let p = model.predict(&features(1.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(p, 1.0 / (1.0 + (-1.0f64).exp()), epsilon = 1e-12);
    }

    #[test]
    fn test_trained_rejects_bad_artifact() {
        assert!(matches!(
            TrainedClassifier::from_json("{not json"),
            Err(FraudError::ModelLoad(_))
        ));
        assert!(matches!(
            TrainedClassifier::from_json(
                r#"{"version": "", "intercept": 0.0, "weights": [1.0, 1.0, 1.0]}"#
            ),
            Err(FraudError::ModelLoad(_))
        ));
        assert!(TrainedClassifier::new("1.0", f64::NAN, [0.0; 3]).is_err());
    }

    #[test]
    fn test_trained_rejects_non_finite_features() {
        let model = TrainedClassifier::new("1.0", 0.0, [1.0; 3]).unwrap();
        assert!(matches!(
            model.predict(&features(f64::NAN, 0.0, 0.0)),
            Err(FraudError::InvalidFeatures(_))
        ));
    }

    #[test]
    fn test_heuristic_weighted_sum() {
        let heuristic = HeuristicFallback::new(HeuristicWeights::default());
        let score = heuristic.score(&features(1.0, 0.2, 0.4));
        assert_relative_eq!(score, 0.40 + 0.35 * 0.2 + 0.25 * 0.4, epsilon = 1e-12);
        assert_eq!(heuristic.kind(), ClassifierKind::Heuristic);
        assert_eq!(heuristic.score(&features(f64::NAN, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_factory_selects_variant() {
        let weights = HeuristicWeights::default();

        let trained = ClassifierFactory::from_json(
            Some(r#"{"version": "1.0", "intercept": -2.0, "weights": [1.0, 2.0, 0.5]}"#),
            weights,
        );
        assert_eq!(trained.kind(), ClassifierKind::Trained);

        let broken = ClassifierFactory::from_json(Some("garbage"), weights);
        assert_eq!(broken.kind(), ClassifierKind::Heuristic);

        let missing = ClassifierFactory::from_json(None, weights);
        assert_eq!(missing.kind(), ClassifierKind::Heuristic);
        assert_eq!(missing.model_version(), "heuristic");
    }
}
