//! Conformal Intervals
//!
//! Converts a point probability and a population of nonconformity scores
//! into an interval with marginal coverage of at least the requested level.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConformalError, ConformalResult};

/// Supported coverage targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum CoverageLevel {
    /// 90% coverage, alpha = 0.10
    #[default]
    Ninety,
    /// 95% coverage, alpha = 0.05
    NinetyFive,
    /// 99% coverage, alpha = 0.01
    NinetyNine,
}

impl CoverageLevel {
    pub const ALL: [CoverageLevel; 3] = [
        CoverageLevel::Ninety,
        CoverageLevel::NinetyFive,
        CoverageLevel::NinetyNine,
    ];

    pub fn from_percent(percent: u32) -> Option<Self> {
        match percent {
            90 => Some(CoverageLevel::Ninety),
            95 => Some(CoverageLevel::NinetyFive),
            99 => Some(CoverageLevel::NinetyNine),
            _ => None,
        }
    }

    pub fn percent(&self) -> u32 {
        match self {
            CoverageLevel::Ninety => 90,
            CoverageLevel::NinetyFive => 95,
            CoverageLevel::NinetyNine => 99,
        }
    }

    /// Significance level (miscoverage rate)
    pub fn alpha(&self) -> f64 {
        match self {
            CoverageLevel::Ninety => 0.10,
            CoverageLevel::NinetyFive => 0.05,
            CoverageLevel::NinetyNine => 0.01,
        }
    }

    pub fn nominal(&self) -> f64 {
        self.percent() as f64 / 100.0
    }
}

impl fmt::Display for CoverageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

impl From<CoverageLevel> for u32 {
    fn from(level: CoverageLevel) -> Self {
        level.percent()
    }
}

impl TryFrom<u32> for CoverageLevel {
    type Error = String;

    fn try_from(percent: u32) -> Result<Self, Self::Error> {
        CoverageLevel::from_percent(percent)
            .ok_or_else(|| format!("unsupported coverage level: {}", percent))
    }
}

/// A coverage-guaranteed interval around a point probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInterval {
    /// The point prediction the interval was built around
    pub point_prediction: f64,
    /// Lower bound, clamped to 0
    pub lower_bound: f64,
    /// Upper bound, clamped to 1
    pub upper_bound: f64,
    /// upper_bound - lower_bound
    pub width: f64,
    /// 1 - quantile_value; rough tightness signal, not a calibrated probability
    pub calibration_score: f64,
    /// Effective coverage level (after defaulting)
    pub coverage_level: CoverageLevel,
    /// Empirical nonconformity quantile used as the half-width
    pub quantile_value: f64,
    /// Number of calibration scores the quantile came from
    pub sample_size: usize,
}

impl PredictionInterval {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower_bound && value <= self.upper_bound
    }
}

/// Split conformal interval construction
#[derive(Debug, Clone, Copy, Default)]
pub struct ConformalIntervalCalculator {
    default_level: CoverageLevel,
}

impl ConformalIntervalCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculator that substitutes `level` for unsupported coverage requests
    pub fn with_default_level(level: CoverageLevel) -> Self {
        Self {
            default_level: level,
        }
    }

    /// Resolve a requested percentage, falling back to the default with a
    /// warning when it is not one of 90/95/99.
    pub fn resolve_level(&self, coverage_level: u32) -> CoverageLevel {
        CoverageLevel::from_percent(coverage_level).unwrap_or_else(|| {
            tracing::warn!(
                "Invalid coverage level {}, using default {}",
                coverage_level,
                self.default_level
            );
            self.default_level
        })
    }

    /// Build the interval for a raw coverage percentage.
    pub fn calculate_interval(
        &self,
        point_prediction: f64,
        nonconformity_scores: &[f64],
        coverage_level: u32,
    ) -> ConformalResult<PredictionInterval> {
        let level = self.resolve_level(coverage_level);
        self.interval_at(point_prediction, nonconformity_scores, level)
    }

    /// Build the interval for an already-validated coverage level.
    pub fn interval_at(
        &self,
        point_prediction: f64,
        nonconformity_scores: &[f64],
        level: CoverageLevel,
    ) -> ConformalResult<PredictionInterval> {
        validate_point(point_prediction)?;
        if nonconformity_scores.is_empty() {
            return Err(ConformalError::EmptyScores);
        }
        if let Some(bad) = nonconformity_scores.iter().find(|s| !s.is_finite()) {
            return Err(ConformalError::InvalidInput(format!(
                "nonconformity score must be finite, got {}",
                bad
            )));
        }

        let n = nonconformity_scores.len();
        let q_level = quantile_level(n, level);
        let quantile_value = empirical_quantile(nonconformity_scores, q_level);

        let lower_bound = (point_prediction - quantile_value).max(0.0);
        let upper_bound = (point_prediction + quantile_value).min(1.0);

        Ok(PredictionInterval {
            point_prediction,
            lower_bound,
            upper_bound,
            width: upper_bound - lower_bound,
            calibration_score: (1.0 - quantile_value).clamp(0.0, 1.0),
            coverage_level: level,
            quantile_value,
            sample_size: n,
        })
    }

    /// Intervals for every supported level, narrowest coverage first.
    pub fn calculate_all_levels(
        &self,
        point_prediction: f64,
        nonconformity_scores: &[f64],
    ) -> ConformalResult<Vec<PredictionInterval>> {
        CoverageLevel::ALL
            .iter()
            .map(|&level| self.interval_at(point_prediction, nonconformity_scores, level))
            .collect()
    }
}

fn validate_point(point_prediction: f64) -> ConformalResult<()> {
    if !point_prediction.is_finite() || !(0.0..=1.0).contains(&point_prediction) {
        return Err(ConformalError::InvalidInput(format!(
            "point prediction must be a probability in [0, 1], got {}",
            point_prediction
        )));
    }
    Ok(())
}

/// Finite-sample corrected quantile level `ceil((n+1)(1-alpha)) / n`.
///
/// The rank is computed on the integer coverage percent so that products
/// like `100 * 0.9` cannot round past an integer. Capped at 1.0, which
/// selects the largest score when `n` is too small for the level.
pub(crate) fn quantile_level(n: usize, level: CoverageLevel) -> f64 {
    let percent = level.percent() as usize;
    let rank = ((n + 1) * percent).div_ceil(100);
    (rank as f64 / n as f64).min(1.0)
}

/// Empirical quantile with linear interpolation between order statistics.
pub(crate) fn empirical_quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;

    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}
