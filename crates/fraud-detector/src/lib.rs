//! Predictive Fraud Detection
//!
//! Combines a classifier's point estimate with conformal intervals to
//! produce risk decisions with bounded uncertainty. Falls back to weighted
//! heuristics when the classifier or behavioral history is unavailable.

pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;
pub mod types;

#[cfg(test)]
mod tests;

pub use classifier::{
    ClassifierFactory, ClassifierKind, FraudClassifier, HeuristicFallback, TrainedClassifier,
};
pub use config::{DetectorConfig, HeuristicWeights, RiskThresholds};
pub use detector::PredictiveFraudDetector;
pub use error::{FraudError, FraudResult};
pub use types::{
    ActivityEvent, BehaviorProfile, DetectionMode, FeatureVector, FraudDecision, RiskAssessment,
    RiskLevel,
};
