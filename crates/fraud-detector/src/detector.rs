//! Predictive Fraud Detector
//!
//! Per request the detector is in one of three states:
//! - Model: classifier point estimate, plus a conformal interval when the
//!   model version has calibration data.
//! - Heuristic: classifier unavailable or failing, or too little history.
//!   Fixed lower confidence and no interval.
//! - Default: no behavioral profile; minimal-risk result.
//!
//! Only high or critical risk with a narrow interval is auto-escalated.

use chrono::Utc;
use conformal_core::{ConformalPredictorService, PredictionInterval};
use std::sync::Arc;

use crate::classifier::{ClassifierKind, FraudClassifier, HeuristicFallback};
use crate::config::DetectorConfig;
use crate::error::FraudResult;
use crate::types::{
    ActivityEvent, BehaviorProfile, DetectionMode, FeatureVector, FraudDecision, RiskAssessment,
    RiskLevel,
};

pub struct PredictiveFraudDetector {
    classifier: Box<dyn FraudClassifier>,
    fallback: HeuristicFallback,
    conformal: Arc<ConformalPredictorService>,
    config: DetectorConfig,
}

impl PredictiveFraudDetector {
    pub fn new(
        classifier: Box<dyn FraudClassifier>,
        conformal: Arc<ConformalPredictorService>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            classifier,
            fallback: HeuristicFallback::new(config.heuristic_weights),
            conformal,
            config,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn classifier_kind(&self) -> ClassifierKind {
        self.classifier.kind()
    }

    /// Score one event against the subject's behavioral profile.
    ///
    /// Missing calibration data only drops the interval; conformal faults
    /// (cache failures, corrupt calibration payloads) are returned as errors.
    pub fn assess(
        &self,
        profile: Option<&BehaviorProfile>,
        event: &ActivityEvent,
    ) -> FraudResult<RiskAssessment> {
        let Some(profile) = profile else {
            tracing::debug!("No profile for {}, returning default assessment", event.subject_id);
            return Ok(self.default_assessment(event));
        };

        let features = FeatureVector::from_profile(profile, event);

        if profile.history_events < self.config.min_history_events {
            tracing::debug!(
                "Insufficient history for {} ({} < {} events), using heuristic",
                event.subject_id,
                profile.history_events,
                self.config.min_history_events
            );
            return Ok(self.heuristic_assessment(event, features));
        }

        if self.classifier.kind() == ClassifierKind::Heuristic {
            return Ok(self.heuristic_assessment(event, features));
        }

        match self.classifier.predict(&features) {
            Ok(probability) => self.model_assessment(event, features, probability),
            Err(e) => {
                tracing::warn!(
                    "Fraud model {} failed for {}: {}, using heuristic",
                    self.classifier.model_version(),
                    event.subject_id,
                    e
                );
                Ok(self.heuristic_assessment(event, features))
            }
        }
    }

    /// Automation policy: act only on high risk with a narrow interval.
    pub fn decide(
        &self,
        risk_level: RiskLevel,
        interval: Option<&PredictionInterval>,
    ) -> FraudDecision {
        let narrow = interval.is_some_and(|i| self.conformal.is_narrow(i.width));

        match risk_level {
            level if level.is_actionable() && narrow => FraudDecision::AutoEscalate,
            RiskLevel::High | RiskLevel::Critical | RiskLevel::Medium => FraudDecision::Alert,
            RiskLevel::Low => FraudDecision::NoAction,
        }
    }

    fn model_assessment(
        &self,
        event: &ActivityEvent,
        features: FeatureVector,
        probability: f64,
    ) -> FraudResult<RiskAssessment> {
        let probability = probability.clamp(0.0, 1.0);
        let version = self.classifier.model_version().to_string();

        let interval = self.conformal.predict_with_intervals(
            probability,
            &self.config.model_type,
            &version,
            self.config.coverage_level,
        )?;

        let model_confidence = match &interval {
            Some(interval) => interval.calibration_score,
            None => probability.max(1.0 - probability),
        };

        let risk_level = RiskLevel::from_score(probability, &self.config.risk_thresholds);
        let decision = self.decide(risk_level, interval.as_ref());

        tracing::debug!(
            "Model assessment for {}: p={:.3} {} -> {:?}",
            event.subject_id,
            probability,
            risk_level.as_str(),
            decision
        );

        Ok(RiskAssessment {
            subject_id: event.subject_id.clone(),
            fraud_probability: probability,
            risk_level,
            model_confidence,
            mode: DetectionMode::Model,
            model_version: Some(version),
            features: Some(features),
            interval,
            decision,
            assessed_at: Utc::now(),
        })
    }

    fn heuristic_assessment(
        &self,
        event: &ActivityEvent,
        features: FeatureVector,
    ) -> RiskAssessment {
        let score = self.fallback.score(&features);
        let risk_level = RiskLevel::from_score(score, &self.config.risk_thresholds);

        RiskAssessment {
            subject_id: event.subject_id.clone(),
            fraud_probability: score,
            risk_level,
            model_confidence: self.config.heuristic_confidence,
            mode: DetectionMode::Heuristic,
            model_version: None,
            features: Some(features),
            interval: None,
            decision: self.decide(risk_level, None),
            assessed_at: Utc::now(),
        }
    }

    fn default_assessment(&self, event: &ActivityEvent) -> RiskAssessment {
        RiskAssessment {
            subject_id: event.subject_id.clone(),
            fraud_probability: 0.0,
            risk_level: RiskLevel::Low,
            model_confidence: 0.0,
            mode: DetectionMode::Default,
            model_version: None,
            features: None,
            interval: None,
            decision: FraudDecision::NoAction,
            assessed_at: Utc::now(),
        }
    }
}
