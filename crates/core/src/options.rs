use crate::math::RealNumber;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PricingStrategy {
    Dantzig,
    Devex,
    DevexHarris,
    SteepestEdge,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RatiotestStrategy {
    Textbook,
    Twopass,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("reporting frequency must be at least 1")]
    ZeroReportingFrequency,
    #[error("threshold `{0}` must be positive and finite")]
    InvalidThreshold(&'static str),
}

/// Solver configuration. Rejected at entry, before any basis mutation,
/// when a recognized option carries an unusable value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings<T: RealNumber> {
    pub iteration_limit: usize,
    pub time_limit: Option<Duration>,
    pub reporting_frequency: usize,
    pub d_zero_threshold: T,
    pub pnorm_zero_threshold: T,
    pub lambda_zero_threshold: T,
    pub curvature_zero_threshold: T,
    pub feasibility_tolerance: T,
    pub pricing: PricingStrategy,
    pub ratiotest: RatiotestStrategy,
}

impl<T> Settings<T>
where
    T: RealNumber,
{
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.reporting_frequency == 0 {
            return Err(SettingsError::ZeroReportingFrequency);
        }
        let thresholds: [(&'static str, T); 5] = [
            ("d_zero_threshold", self.d_zero_threshold),
            ("pnorm_zero_threshold", self.pnorm_zero_threshold),
            ("lambda_zero_threshold", self.lambda_zero_threshold),
            ("curvature_zero_threshold", self.curvature_zero_threshold),
            ("feasibility_tolerance", self.feasibility_tolerance),
        ];
        for (name, value) in thresholds {
            if !(value > T::zero()) || !value.is_finite() {
                return Err(SettingsError::InvalidThreshold(name));
            }
        }
        Ok(())
    }
}

impl<T> Default for Settings<T>
where
    T: RealNumber,
{
    fn default() -> Self {
        Self {
            iteration_limit: 100_000,
            time_limit: None,
            reporting_frequency: 100,
            d_zero_threshold: T::from_f64(1e-7).unwrap(),
            pnorm_zero_threshold: T::from_f64(1e-12).unwrap(),
            lambda_zero_threshold: T::from_f64(1e-7).unwrap(),
            curvature_zero_threshold: T::from_f64(1e-5).unwrap(),
            feasibility_tolerance: T::from_f64(1e-9).unwrap(),
            pricing: PricingStrategy::Devex,
            ratiotest: RatiotestStrategy::Twopass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Scalar;

    #[test]
    fn defaults_validate() {
        assert!(Settings::<Scalar>::default().validate().is_ok());
    }

    #[test]
    fn bad_threshold_rejected() {
        let mut settings = Settings::<Scalar>::default();
        settings.d_zero_threshold = -1.0;
        assert!(settings.validate().is_err());
        settings.d_zero_threshold = 1e-7;
        settings.reporting_frequency = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn settings_json_roundtrip() {
        let settings = Settings::<Scalar>::default();
        let text = serde_json::to_string(&settings).unwrap();
        let back: Settings<Scalar> = serde_json::from_str(&text).unwrap();
        assert_eq!(back.iteration_limit, settings.iteration_limit);
        assert_eq!(back.pricing, settings.pricing);
    }
}
