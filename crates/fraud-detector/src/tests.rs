#[cfg(test)]
mod detector_tests {
    use crate::classifier::{ClassifierFactory, ClassifierKind, FraudClassifier, TrainedClassifier};
    use crate::config::{DetectorConfig, HeuristicWeights};
    use crate::detector::PredictiveFraudDetector;
    use crate::error::{FraudError, FraudResult};
    use crate::types::{
        ActivityEvent, BehaviorProfile, DetectionMode, FeatureVector, FraudDecision, RiskLevel,
    };
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use conformal_core::{ConformalConfig, ConformalPredictorService, MemoryCache};
    use std::sync::Arc;

    const MODEL_TYPE: &str = "fraud_detector";

    struct BrokenClassifier;

    impl FraudClassifier for BrokenClassifier {
        fn predict(&self, _features: &FeatureVector) -> FraudResult<f64> {
            Err(FraudError::InvalidFeatures("feature pipeline offline".to_string()))
        }

        fn kind(&self) -> ClassifierKind {
            ClassifierKind::Trained
        }

        fn model_version(&self) -> &str {
            "broken"
        }
    }

    fn conformal() -> Arc<ConformalPredictorService> {
        Arc::new(ConformalPredictorService::new(
            Arc::new(MemoryCache::new()),
            ConformalConfig::default(),
        ))
    }

    fn trained() -> Box<dyn FraudClassifier> {
        Box::new(TrainedClassifier::new("1.0", -3.0, [4.0, 6.0, 2.0]).unwrap())
    }

    fn detector_with(
        classifier: Box<dyn FraudClassifier>,
        conformal: Arc<ConformalPredictorService>,
    ) -> PredictiveFraudDetector {
        PredictiveFraudDetector::new(classifier, conformal, DetectorConfig::default())
    }

    /// Calibration where every residual equals `residual`
    fn store_uniform_residuals(conformal: &ConformalPredictorService, residual: f64) {
        let predictions: Vec<f64> = (0..60)
            .map(|i| if i % 2 == 0 { 1.0 - residual } else { residual })
            .collect();
        let actuals: Vec<f64> = (0..60).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
        assert!(conformal.store_calibration_set(MODEL_TYPE, "1.0", &predictions, &actuals));
    }

    fn risky_profile() -> BehaviorProfile {
        BehaviorProfile {
            subject_id: "emp-7".to_string(),
            history_events: 40,
            fraud_events: 20,
            late_events: 20,
            mean_start_hour: 9.0,
            std_start_hour: 1.0,
        }
    }

    fn clean_profile() -> BehaviorProfile {
        BehaviorProfile {
            fraud_events: 0,
            late_events: 0,
            ..risky_profile()
        }
    }

    fn event_at(hour: u32) -> ActivityEvent {
        ActivityEvent {
            subject_id: "emp-7".to_string(),
            occurred_at: Utc.with_ymd_and_hms(2024, 6, 3, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_no_profile_gives_default() {
        let detector = detector_with(trained(), conformal());
        let assessment = detector.assess(None, &event_at(12)).unwrap();

        assert_eq!(assessment.mode, DetectionMode::Default);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert_eq!(assessment.fraud_probability, 0.0);
        assert_eq!(assessment.decision, FraudDecision::NoAction);
        assert!(assessment.features.is_none());
    }

    #[test]
    fn test_short_history_uses_heuristic() {
        let conformal = conformal();
        store_uniform_residuals(&conformal, 0.05);
        let detector = detector_with(trained(), conformal);

        let profile = BehaviorProfile {
            history_events: 5,
            fraud_events: 1,
            late_events: 1,
            ..risky_profile()
        };
        let assessment = detector.assess(Some(&profile), &event_at(12)).unwrap();

        assert_eq!(assessment.mode, DetectionMode::Heuristic);
        assert_relative_eq!(assessment.model_confidence, 0.6);
        assert_relative_eq!(
            assessment.fraud_probability,
            0.40 + 0.35 * 0.2 + 0.25 * 0.2,
            epsilon = 1e-12
        );
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert_eq!(assessment.decision, FraudDecision::Alert);
        assert!(!assessment.has_interval());
    }

    #[test]
    fn test_missing_model_uses_heuristic() {
        let classifier = ClassifierFactory::from_json(None, HeuristicWeights::default());
        let detector = detector_with(classifier, conformal());

        let assessment = detector.assess(Some(&risky_profile()), &event_at(12)).unwrap();

        assert_eq!(detector.classifier_kind(), ClassifierKind::Heuristic);
        assert_eq!(assessment.mode, DetectionMode::Heuristic);
        assert!(assessment.model_version.is_none());
        // 0.4 * 1.0 + 0.35 * 0.5 + 0.25 * 0.5
        assert_relative_eq!(assessment.fraud_probability, 0.7, epsilon = 1e-12);
        // High risk but no interval: never auto-escalated
        assert_eq!(assessment.decision, FraudDecision::Alert);
    }

    #[test]
    fn test_failing_model_falls_back() {
        let detector = detector_with(Box::new(BrokenClassifier), conformal());
        let assessment = detector.assess(Some(&risky_profile()), &event_at(12)).unwrap();

        assert_eq!(assessment.mode, DetectionMode::Heuristic);
        assert_relative_eq!(assessment.model_confidence, 0.6);
    }

    #[test]
    fn test_model_without_calibration_has_no_interval() {
        let detector = detector_with(trained(), conformal());
        let assessment = detector.assess(Some(&risky_profile()), &event_at(12)).unwrap();

        assert_eq!(assessment.mode, DetectionMode::Model);
        assert_eq!(assessment.model_version.as_deref(), Some("1.0"));
        assert!(!assessment.has_interval());
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
        assert_relative_eq!(assessment.model_confidence, assessment.fraud_probability);
        assert_eq!(assessment.decision, FraudDecision::Alert);
    }

    #[test]
    fn test_narrow_interval_auto_escalates() {
        let conformal = conformal();
        store_uniform_residuals(&conformal, 0.05);
        let detector = detector_with(trained(), conformal);

        let assessment = detector.assess(Some(&risky_profile()), &event_at(12)).unwrap();
        let interval = assessment.interval.as_ref().expect("calibrated");

        assert_eq!(assessment.mode, DetectionMode::Model);
        assert!(interval.width < 0.2);
        assert_relative_eq!(assessment.model_confidence, interval.calibration_score);
        assert_eq!(assessment.decision, FraudDecision::AutoEscalate);
    }

    #[test]
    fn test_wide_interval_only_alerts() {
        let conformal = conformal();
        store_uniform_residuals(&conformal, 0.5);
        let detector = detector_with(trained(), conformal);

        let assessment = detector.assess(Some(&risky_profile()), &event_at(12)).unwrap();

        assert!(assessment.risk_level.is_actionable());
        assert!(assessment.interval.as_ref().unwrap().width >= 0.2);
        assert_eq!(assessment.decision, FraudDecision::Alert);
    }

    #[test]
    fn test_low_risk_takes_no_action() {
        let conformal = conformal();
        store_uniform_residuals(&conformal, 0.05);
        let detector = detector_with(trained(), conformal);

        let assessment = detector.assess(Some(&clean_profile()), &event_at(9)).unwrap();

        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert!(assessment.has_interval());
        assert_eq!(assessment.decision, FraudDecision::NoAction);
    }

    #[test]
    fn test_decide_policy() {
        let conformal = conformal();
        store_uniform_residuals(&conformal, 0.05);
        let narrow = conformal
            .predict_with_intervals(0.9, MODEL_TYPE, "1.0", 90)
            .unwrap()
            .unwrap();
        let detector = detector_with(trained(), conformal);

        assert_eq!(detector.decide(RiskLevel::High, Some(&narrow)), FraudDecision::AutoEscalate);
        assert_eq!(detector.decide(RiskLevel::High, None), FraudDecision::Alert);
        assert_eq!(detector.decide(RiskLevel::Medium, Some(&narrow)), FraudDecision::Alert);
        assert_eq!(detector.decide(RiskLevel::Low, Some(&narrow)), FraudDecision::NoAction);
    }
}
