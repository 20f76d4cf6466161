//! Conformal Predictor Service
//!
//! Single integration seam for point-estimate classifiers: pulls the
//! calibration set, scores it and builds the interval.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::CalibrationCache;
use crate::calibration::{CalibrationDataManager, CalibrationSet};
use crate::config::ConformalConfig;
use crate::error::{ConformalError, ConformalResult};
use crate::interval::{ConformalIntervalCalculator, CoverageLevel, PredictionInterval};
use crate::scorer::NonconformityScorer;

/// Width below which an interval is considered confident enough to automate on
pub const DEFAULT_NARROW_THRESHOLD: f64 = 0.2;

/// `true` when the interval is strictly narrower than `threshold`.
pub fn is_narrow_interval(interval_width: f64, threshold: f64) -> bool {
    interval_width < threshold
}

/// Held-out coverage check for a calibrated model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    pub coverage_level: CoverageLevel,
    /// Fraction of held-out actuals inside their interval
    pub empirical_coverage: f64,
    pub mean_width: f64,
    pub evaluated: usize,
    pub calibration_size: usize,
}

impl CoverageReport {
    /// Shortfall of empirical against nominal coverage (positive = under-covering)
    pub fn coverage_gap(&self) -> f64 {
        self.coverage_level.nominal() - self.empirical_coverage
    }
}

pub struct ConformalPredictorService {
    calibration: CalibrationDataManager,
    scorer: NonconformityScorer,
    calculator: ConformalIntervalCalculator,
}

impl ConformalPredictorService {
    pub fn new(cache: Arc<dyn CalibrationCache>, config: ConformalConfig) -> Self {
        let calculator = ConformalIntervalCalculator::with_default_level(config.default_coverage());
        Self {
            calibration: CalibrationDataManager::new(cache, config),
            scorer: NonconformityScorer::new(),
            calculator,
        }
    }

    pub fn calibration(&self) -> &CalibrationDataManager {
        &self.calibration
    }

    pub fn store_calibration_set(
        &self,
        model_type: &str,
        model_version: &str,
        predictions: &[f64],
        actuals: &[f64],
    ) -> bool {
        self.calibration
            .store_calibration_set(model_type, model_version, predictions, actuals)
    }

    /// Interval around `point_prediction`, or `None` when the model version
    /// has no live calibration set.
    pub fn predict_with_intervals(
        &self,
        point_prediction: f64,
        model_type: &str,
        model_version: &str,
        coverage_level: u32,
    ) -> ConformalResult<Option<PredictionInterval>> {
        let Some(scores) = self.scores_for(model_type, model_version)? else {
            return Ok(None);
        };

        let interval =
            self.calculator.calculate_interval(point_prediction, &scores, coverage_level)?;

        tracing::debug!(
            "Conformal interval for {}/{}: [{:.3}, {:.3}] at {}",
            model_type,
            model_version,
            interval.lower_bound,
            interval.upper_bound,
            interval.coverage_level
        );
        Ok(Some(interval))
    }

    /// Intervals at 90, 95 and 99 percent from one calibration read.
    pub fn predict_all_levels(
        &self,
        point_prediction: f64,
        model_type: &str,
        model_version: &str,
    ) -> ConformalResult<Option<Vec<PredictionInterval>>> {
        let Some(scores) = self.scores_for(model_type, model_version)? else {
            return Ok(None);
        };

        self.calculator
            .calculate_all_levels(point_prediction, &scores)
            .map(Some)
    }

    /// Narrowness against the configured threshold.
    pub fn is_narrow(&self, interval_width: f64) -> bool {
        is_narrow_interval(interval_width, self.calibration.config().narrow_interval_threshold)
    }

    /// Measure how often held-out actuals fall inside their intervals.
    pub fn evaluate_coverage(
        &self,
        model_type: &str,
        model_version: &str,
        points: &[f64],
        actuals: &[f64],
        coverage_level: u32,
    ) -> ConformalResult<Option<CoverageReport>> {
        if points.len() != actuals.len() {
            return Err(ConformalError::InvalidInput(format!(
                "{} points vs {} actuals",
                points.len(),
                actuals.len()
            )));
        }
        if points.is_empty() {
            return Err(ConformalError::InvalidInput(
                "no held-out samples to evaluate".to_string(),
            ));
        }

        let Some(scores) = self.scores_for(model_type, model_version)? else {
            return Ok(None);
        };
        let level = self.calculator.resolve_level(coverage_level);

        let mut covered = 0usize;
        let mut total_width = 0.0;
        for (&point, &actual) in points.iter().zip(actuals) {
            let interval = self.calculator.interval_at(point, &scores, level)?;
            if interval.contains(actual) {
                covered += 1;
            }
            total_width += interval.width;
        }

        let evaluated = points.len();
        Ok(Some(CoverageReport {
            coverage_level: level,
            empirical_coverage: covered as f64 / evaluated as f64,
            mean_width: total_width / evaluated as f64,
            evaluated,
            calibration_size: scores.len(),
        }))
    }

    fn scores_for(
        &self,
        model_type: &str,
        model_version: &str,
    ) -> ConformalResult<Option<Vec<f64>>> {
        match self.calibration.get_calibration_set(model_type, model_version)? {
            Some(CalibrationSet {
                predictions,
                actuals,
                ..
            }) => Ok(Some(self.scorer.calculate_scores(&predictions, &actuals))),
            None => {
                tracing::warn!(
                    "No calibration data for {}/{}, intervals unavailable",
                    model_type,
                    model_version
                );
                Ok(None)
            }
        }
    }
}
