use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::interval::CoverageLevel;

/// Fewest calibration samples a store may be configured to accept
pub const MIN_CALIBRATION_SAMPLES_FLOOR: usize = 30;

/// Longest calibration TTL accepted (30 days)
pub const MAX_CALIBRATION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Runtime settings for calibration storage and interval policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformalConfig {
    /// How long a stored calibration set stays valid (seconds)
    pub calibration_ttl_secs: u64,
    /// Minimum calibration samples accepted for storage
    pub min_calibration_samples: usize,
    /// Coverage used when the caller does not ask for one
    pub default_coverage_level: u32,
    /// Width below which an interval counts as narrow
    pub narrow_interval_threshold: f64,
    /// Prefix for calibration cache keys
    pub key_prefix: String,
}

impl Default for ConformalConfig {
    fn default() -> Self {
        Self {
            calibration_ttl_secs: 3600,
            min_calibration_samples: 30,
            default_coverage_level: 90,
            narrow_interval_threshold: 0.2,
            key_prefix: "conformal_calib".to_string(),
        }
    }
}

impl ConformalConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build the config from an arbitrary variable lookup, falling back to
    /// defaults for anything unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            calibration_ttl_secs: parse_var(&lookup, "CONFORMAL_CALIBRATION_TTL_SECS")?
                .unwrap_or(defaults.calibration_ttl_secs),
            min_calibration_samples: parse_var(&lookup, "CONFORMAL_MIN_SAMPLES")?
                .unwrap_or(defaults.min_calibration_samples),
            default_coverage_level: parse_var(&lookup, "CONFORMAL_DEFAULT_COVERAGE")?
                .unwrap_or(defaults.default_coverage_level),
            narrow_interval_threshold: parse_var(&lookup, "CONFORMAL_NARROW_THRESHOLD")?
                .unwrap_or(defaults.narrow_interval_threshold),
            key_prefix: lookup("CONFORMAL_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if CoverageLevel::from_percent(self.default_coverage_level).is_none() {
            bail!(
                "CONFORMAL_DEFAULT_COVERAGE must be 90, 95 or 99 (got {})",
                self.default_coverage_level
            );
        }
        if self.min_calibration_samples < MIN_CALIBRATION_SAMPLES_FLOOR {
            bail!(
                "CONFORMAL_MIN_SAMPLES must be at least {} (got {})",
                MIN_CALIBRATION_SAMPLES_FLOOR,
                self.min_calibration_samples
            );
        }
        if self.calibration_ttl_secs > MAX_CALIBRATION_TTL_SECS {
            bail!(
                "CONFORMAL_CALIBRATION_TTL_SECS must be at most {} (got {})",
                MAX_CALIBRATION_TTL_SECS,
                self.calibration_ttl_secs
            );
        }
        if !(self.narrow_interval_threshold > 0.0 && self.narrow_interval_threshold <= 1.0) {
            bail!(
                "CONFORMAL_NARROW_THRESHOLD must be in (0, 1] (got {})",
                self.narrow_interval_threshold
            );
        }
        Ok(())
    }

    pub fn calibration_ttl(&self) -> Duration {
        Duration::from_secs(self.calibration_ttl_secs)
    }

    /// Default coverage as a typed level. `validate` guarantees it is supported.
    pub fn default_coverage(&self) -> CoverageLevel {
        CoverageLevel::from_percent(self.default_coverage_level).unwrap_or_default()
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value: {:?}", name, raw))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}
