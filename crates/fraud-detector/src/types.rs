use chrono::{DateTime, Timelike, Utc};
use conformal_core::PredictionInterval;
use serde::{Deserialize, Serialize};

use crate::config::RiskThresholds;

/// Risk classification of a fraud score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64, thresholds: &RiskThresholds) -> Self {
        match score {
            s if s >= thresholds.critical => RiskLevel::Critical,
            s if s >= thresholds.high => RiskLevel::High,
            s if s >= thresholds.medium => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// High and critical risks are candidates for automated action
    pub fn is_actionable(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

/// Behavioral baseline of a person or device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorProfile {
    pub subject_id: String,
    /// Number of past events the baseline was built from
    pub history_events: usize,
    /// Past events later confirmed as fraud
    pub fraud_events: usize,
    /// Past events that started late
    pub late_events: usize,
    /// Typical start time, hours since midnight
    pub mean_start_hour: f64,
    /// Spread of the start time, hours
    pub std_start_hour: f64,
}

impl BehaviorProfile {
    pub fn fraud_rate(&self) -> f64 {
        rate(self.fraud_events, self.history_events)
    }

    pub fn lateness_rate(&self) -> f64 {
        rate(self.late_events, self.history_events)
    }
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64).min(1.0)
    }
}

/// The event being scored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub subject_id: String,
    pub occurred_at: DateTime<Utc>,
}

impl ActivityEvent {
    /// Hours since midnight, fractional
    pub fn start_hour(&self) -> f64 {
        self.occurred_at.hour() as f64 + self.occurred_at.minute() as f64 / 60.0
    }
}

/// Model inputs, each normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub behavioral_deviation: f64,
    pub historical_fraud_rate: f64,
    pub lateness_rate: f64,
}

/// Floor on the start-hour spread so a perfectly regular history does not
/// turn every minute of drift into a maximal deviation.
const MIN_HOUR_STD: f64 = 0.5;

impl FeatureVector {
    pub fn from_profile(profile: &BehaviorProfile, event: &ActivityEvent) -> Self {
        let diff = (event.start_hour() - profile.mean_start_hour).abs() % 24.0;
        let circular = diff.min(24.0 - diff);
        let z = circular / profile.std_start_hour.max(MIN_HOUR_STD);

        Self {
            behavioral_deviation: (z / 3.0).min(1.0),
            historical_fraud_rate: profile.fraud_rate(),
            lateness_rate: profile.lateness_rate(),
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [
            self.behavioral_deviation,
            self.historical_fraud_rate,
            self.lateness_rate,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite())
    }
}

/// Which path produced an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Trained classifier, with a conformal interval when calibrated
    Model,
    /// Weighted heuristic, lower confidence, never has an interval
    Heuristic,
    /// No profile at all; minimal-risk default
    Default,
}

/// What the caller should do with an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudDecision {
    /// High-risk and a narrow interval: act automatically
    AutoEscalate,
    /// Raise for human review
    Alert,
    NoAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub subject_id: String,
    /// Point estimate of fraud probability
    pub fraud_probability: f64,
    pub risk_level: RiskLevel,
    pub model_confidence: f64,
    pub mode: DetectionMode,
    pub model_version: Option<String>,
    pub features: Option<FeatureVector>,
    pub interval: Option<PredictionInterval>,
    pub decision: FraudDecision,
    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    pub fn has_interval(&self) -> bool {
        self.interval.is_some()
    }
}
