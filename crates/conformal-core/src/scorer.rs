//! Nonconformity scoring
//!
//! The nonconformity of a calibration sample is its absolute residual
//! `|prediction - actual|`. With predictions in [0,1] and binary actuals
//! every score lands in [0,1].

/// Stateless scorer turning a calibration set into nonconformity scores
#[derive(Debug, Clone, Copy, Default)]
pub struct NonconformityScorer;

impl NonconformityScorer {
    pub fn new() -> Self {
        Self
    }

    /// One score per calibration sample, in input order.
    ///
    /// Slices are assumed to be the same length (checked when the set was
    /// stored); extra trailing entries on either side are ignored.
    pub fn calculate_scores(&self, predictions: &[f64], actuals: &[f64]) -> Vec<f64> {
        debug_assert_eq!(predictions.len(), actuals.len());

        predictions
            .iter()
            .zip(actuals)
            .map(|(pred, actual)| (pred - actual).abs())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_are_absolute_residuals() {
        let scores =
            NonconformityScorer::new().calculate_scores(&[0.8, 0.3, 0.5], &[1.0, 1.0, 0.0]);

        assert_eq!(scores.len(), 3);
        assert!((scores[0] - 0.2).abs() < 1e-12);
        assert!((scores[1] - 0.7).abs() < 1e-12);
        assert!((scores[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_predictions_score_zero() {
        let predictions = vec![0.0, 1.0, 1.0, 0.0];
        let scores = NonconformityScorer::new().calculate_scores(&predictions, &predictions);

        assert!(scores.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_complement_predictions_score_one() {
        let predictions = vec![1.0, 0.0, 1.0, 0.0];
        let actuals = vec![0.0, 1.0, 0.0, 1.0];
        let scores = NonconformityScorer::new().calculate_scores(&predictions, &actuals);

        assert!(scores.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_scores_stay_in_unit_range() {
        let predictions: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();
        let actuals: Vec<f64> = (0..=100).map(|i| (i % 2) as f64).collect();
        let scores = NonconformityScorer::new().calculate_scores(&predictions, &actuals);

        assert!(scores.iter().all(|&s| (0.0..=1.0).contains(&s)));
    }

    #[test]
    fn test_empty_input() {
        assert!(NonconformityScorer::new().calculate_scores(&[], &[]).is_empty());
    }
}
