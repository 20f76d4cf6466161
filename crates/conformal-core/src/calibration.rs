//! Calibration Data Module
//!
//! Validated, keyed, time-limited storage of calibration sets.
//! A calibration set is the held-out (prediction, actual) history of one
//! model version; it is immutable once stored and replaced wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::{CacheStats, CalibrationCache};
use crate::config::ConformalConfig;
use crate::error::ConformalResult;
use crate::scorer::NonconformityScorer;

/// A stored calibration set for one model version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSet {
    pub model_type: String,
    pub model_version: String,
    /// Predicted probabilities, each in [0, 1]
    pub predictions: Vec<f64>,
    /// Observed outcomes, each exactly 0.0 or 1.0
    pub actuals: Vec<f64>,
    pub created_at: DateTime<Utc>,
}

/// Cache payload; model identity lives in the key
#[derive(Debug, Serialize, Deserialize)]
struct CalibrationRecord {
    predictions: Vec<f64>,
    actuals: Vec<f64>,
    created_at: DateTime<Utc>,
}

impl CalibrationSet {
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// Quality metrics for this set
    pub fn summary(&self) -> CalibrationSummary {
        CalibrationSummary::from_pairs(&self.predictions, &self.actuals)
    }
}

/// Descriptive quality metrics for a calibration set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub sample_size: usize,
    /// Fraction of actuals equal to 1
    pub positive_rate: f64,
    /// Mean squared error of the probabilities (lower is better)
    pub brier_score: f64,
    /// Expected Calibration Error over 10 equal-width bins (lower is better)
    pub expected_calibration_error: f64,
    /// Mean absolute residual
    pub mean_nonconformity: f64,
}

impl CalibrationSummary {
    pub fn from_pairs(predictions: &[f64], actuals: &[f64]) -> Self {
        if predictions.is_empty() {
            return Self::default();
        }

        let n = predictions.len() as f64;
        let scores = NonconformityScorer::new().calculate_scores(predictions, actuals);

        let positive_rate = actuals.iter().filter(|&&a| a >= 0.5).count() as f64 / n;
        let brier_score = scores.iter().map(|s| s * s).sum::<f64>() / n;
        let mean_nonconformity = scores.iter().sum::<f64>() / n;

        let n_bins = 10;
        let mut bins: Vec<(f64, f64, usize)> = vec![(0.0, 0.0, 0); n_bins];
        for (pred, actual) in predictions.iter().zip(actuals) {
            let idx = ((pred * n_bins as f64) as usize).min(n_bins - 1);
            bins[idx].0 += pred;
            bins[idx].1 += actual;
            bins[idx].2 += 1;
        }

        let expected_calibration_error = bins
            .iter()
            .filter(|(_, _, count)| *count > 0)
            .map(|(pred_sum, actual_sum, count)| {
                let count = *count as f64;
                ((pred_sum - actual_sum) / count).abs() * count / n
            })
            .sum();

        Self {
            sample_size: predictions.len(),
            positive_rate,
            brier_score,
            expected_calibration_error,
            mean_nonconformity,
        }
    }

    /// Human-readable assessment of the set
    pub fn assessment(&self) -> String {
        if self.sample_size < 30 {
            "Insufficient data for reliable calibration assessment".to_string()
        } else if self.expected_calibration_error < 0.05 {
            "Excellent calibration - intervals should be tight".to_string()
        } else if self.expected_calibration_error < 0.1 {
            "Good calibration".to_string()
        } else if self.expected_calibration_error < 0.2 {
            "Moderate calibration - expect wide intervals".to_string()
        } else {
            "Poor calibration - model probabilities need recalibration".to_string()
        }
    }
}

/// Owns the lifecycle of calibration sets in a TTL cache
pub struct CalibrationDataManager {
    cache: Arc<dyn CalibrationCache>,
    config: ConformalConfig,
}

impl CalibrationDataManager {
    pub fn new(cache: Arc<dyn CalibrationCache>, config: ConformalConfig) -> Self {
        Self { cache, config }
    }

    pub fn config(&self) -> &ConformalConfig {
        &self.config
    }

    pub fn cache_key(&self, model_type: &str, model_version: &str) -> String {
        format!("{}_{}_{}", self.config.key_prefix, model_type, model_version)
    }

    /// Validate and store a calibration set, replacing any previous one.
    ///
    /// Returns `false` on rejection; a rejected call never touches the
    /// existing entry.
    pub fn store_calibration_set(
        &self,
        model_type: &str,
        model_version: &str,
        predictions: &[f64],
        actuals: &[f64],
    ) -> bool {
        if predictions.len() != actuals.len() {
            tracing::error!(
                "Calibration set for {}/{} rejected: {} predictions vs {} actuals",
                model_type,
                model_version,
                predictions.len(),
                actuals.len()
            );
            return false;
        }

        if predictions.len() < self.config.min_calibration_samples {
            tracing::warn!(
                "Calibration set for {}/{} rejected: {} samples, need at least {}",
                model_type,
                model_version,
                predictions.len(),
                self.config.min_calibration_samples
            );
            return false;
        }

        if let Some((idx, pred)) = predictions
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.is_finite() && (0.0..=1.0).contains(*p)))
        {
            tracing::error!(
                "Calibration set for {}/{} rejected: prediction {} at index {} out of [0, 1]",
                model_type,
                model_version,
                pred,
                idx
            );
            return false;
        }

        if let Some((idx, actual)) = actuals
            .iter()
            .enumerate()
            .find(|(_, a)| **a != 0.0 && **a != 1.0)
        {
            tracing::error!(
                "Calibration set for {}/{} rejected: actual {} at index {} is not 0 or 1",
                model_type,
                model_version,
                actual,
                idx
            );
            return false;
        }

        let record = CalibrationRecord {
            predictions: predictions.to_vec(),
            actuals: actuals.to_vec(),
            created_at: Utc::now(),
        };

        let payload = match serde_json::to_vec(&record) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to encode calibration set: {}", e);
                return false;
            }
        };

        let key = self.cache_key(model_type, model_version);
        if let Err(e) = self.cache.set(&key, &payload, self.config.calibration_ttl()) {
            tracing::error!("Failed to store calibration set {}: {}", key, e);
            return false;
        }

        tracing::info!(
            "Stored calibration set for {}/{} ({} samples)",
            model_type,
            model_version,
            predictions.len()
        );
        true
    }

    /// Fetch the live calibration set, or `None` when absent or expired.
    pub fn get_calibration_set(
        &self,
        model_type: &str,
        model_version: &str,
    ) -> ConformalResult<Option<CalibrationSet>> {
        let key = self.cache_key(model_type, model_version);

        let Some(payload) = self.cache.get(&key)? else {
            return Ok(None);
        };

        let record: CalibrationRecord = serde_json::from_slice(&payload)?;
        Ok(Some(CalibrationSet {
            model_type: model_type.to_string(),
            model_version: model_version.to_string(),
            predictions: record.predictions,
            actuals: record.actuals,
            created_at: record.created_at,
        }))
    }

    /// Drop the calibration set ahead of its TTL. Returns whether one existed.
    pub fn invalidate_calibration_set(
        &self,
        model_type: &str,
        model_version: &str,
    ) -> ConformalResult<bool> {
        let removed = self.cache.delete(&self.cache_key(model_type, model_version))?;
        if removed {
            tracing::info!("Invalidated calibration set for {}/{}", model_type, model_version);
        }
        Ok(removed)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
