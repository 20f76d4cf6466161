use anyhow::{bail, Context, Result};
use conformal_core::CoverageLevel;
use serde::{Deserialize, Serialize};
use std::env;

/// Weights of the fallback heuristic (must sum to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicWeights {
    pub behavioral_deviation: f64,
    pub historical_fraud_rate: f64,
    pub lateness_rate: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            behavioral_deviation: 0.40,
            historical_fraud_rate: 0.35,
            lateness_rate: 0.25,
        }
    }
}

impl HeuristicWeights {
    pub fn total(&self) -> f64 {
        self.behavioral_deviation + self.historical_fraud_rate + self.lateness_rate
    }
}

/// Lower score bounds of each risk level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 0.4,
            high: 0.6,
            critical: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Calibration key for the classifier
    pub model_type: String,
    /// Coverage requested for model-path intervals (90, 95 or 99)
    pub coverage_level: u32,
    /// Profiles with fewer recorded events use the heuristic
    pub min_history_events: usize,
    /// Fixed confidence reported for heuristic scores
    pub heuristic_confidence: f64,
    pub heuristic_weights: HeuristicWeights,
    pub risk_thresholds: RiskThresholds,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_type: "fraud_detector".to_string(),
            coverage_level: 90,
            min_history_events: 10,
            heuristic_confidence: 0.6,
            heuristic_weights: HeuristicWeights::default(),
            risk_thresholds: RiskThresholds::default(),
        }
    }
}

impl DetectorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model_type) = lookup("FRAUD_MODEL_TYPE") {
            config.model_type = model_type;
        }
        if let Some(raw) = lookup("FRAUD_COVERAGE_LEVEL") {
            config.coverage_level = raw
                .trim()
                .parse()
                .with_context(|| format!("FRAUD_COVERAGE_LEVEL has an invalid value: {:?}", raw))?;
        }
        if let Some(raw) = lookup("FRAUD_MIN_HISTORY_EVENTS") {
            config.min_history_events = raw.trim().parse().with_context(|| {
                format!("FRAUD_MIN_HISTORY_EVENTS has an invalid value: {:?}", raw)
            })?;
        }
        if let Some(raw) = lookup("FRAUD_HEURISTIC_CONFIDENCE") {
            config.heuristic_confidence = raw.trim().parse().with_context(|| {
                format!("FRAUD_HEURISTIC_CONFIDENCE has an invalid value: {:?}", raw)
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if CoverageLevel::from_percent(self.coverage_level).is_none() {
            bail!(
                "FRAUD_COVERAGE_LEVEL must be 90, 95 or 99 (got {})",
                self.coverage_level
            );
        }
        if !(0.0..=1.0).contains(&self.heuristic_confidence) {
            bail!("heuristic_confidence must be between 0 and 1");
        }
        if (self.heuristic_weights.total() - 1.0).abs() > 1e-6 {
            bail!(
                "heuristic weights must sum to 1.0 (got {:.3})",
                self.heuristic_weights.total()
            );
        }
        let t = &self.risk_thresholds;
        if !(0.0 < t.medium && t.medium < t.high && t.high < t.critical && t.critical <= 1.0) {
            bail!("risk thresholds must satisfy 0 < medium < high < critical <= 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = DetectorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model_type, "fraud_detector");
        assert_eq!(config.heuristic_confidence, 0.6);
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = DetectorConfig::from_vars(|name| match name {
            "FRAUD_COVERAGE_LEVEL" => Some("95".to_string()),
            "FRAUD_MIN_HISTORY_EVENTS" => Some("25".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.coverage_level, 95);
        assert_eq!(config.min_history_events, 25);
    }

    #[test]
    fn test_from_vars_rejects_bad_values() {
        assert!(DetectorConfig::from_vars(|name| match name {
            "FRAUD_COVERAGE_LEVEL" => Some("85".to_string()),
            _ => None,
        })
        .is_err());

        let err = DetectorConfig::from_vars(|name| match name {
            "FRAUD_MIN_HISTORY_EVENTS" => Some("ten".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("FRAUD_MIN_HISTORY_EVENTS"));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = DetectorConfig::default();
        config.heuristic_weights.lateness_rate = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_risk_thresholds_must_be_ordered() {
        let mut config = DetectorConfig::default();
        config.risk_thresholds.medium = 0.6;
        assert!(config.validate().is_err());

        config.risk_thresholds = RiskThresholds {
            medium: 0.3,
            high: 0.5,
            critical: 1.2,
        };
        assert!(config.validate().is_err());
    }
}
