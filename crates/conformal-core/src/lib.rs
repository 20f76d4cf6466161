//! Conformal Prediction Core
//!
//! Split conformal prediction for binary-outcome probability models.
//! Turns a point probability into an interval with a finite-sample coverage
//! guarantee, using calibration sets held in a TTL cache.

pub mod cache;
pub mod calibration;
pub mod config;
pub mod error;
pub mod interval;
pub mod predictor;
pub mod scorer;


pub use cache::{CacheStats, CalibrationCache, MemoryCache};
pub use calibration::{CalibrationDataManager, CalibrationSet, CalibrationSummary};
pub use config::{ConformalConfig, MAX_CALIBRATION_TTL_SECS, MIN_CALIBRATION_SAMPLES_FLOOR};
pub use error::{ConformalError, ConformalResult};
pub use interval::{ConformalIntervalCalculator, CoverageLevel, PredictionInterval};
pub use predictor::{
    is_narrow_interval, ConformalPredictorService, CoverageReport, DEFAULT_NARROW_THRESHOLD,
};
pub use scorer::NonconformityScorer;
