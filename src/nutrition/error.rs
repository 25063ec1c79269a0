use std::time::Duration;

use thiserror::Error;

/// Failures of the recognize → normalize → scale pipeline.
///
/// Each kind is surfaced separately so a client can tell "try another photo"
/// apart from "try again in a minute".
#[derive(Debug, Error)]
pub enum NutritionError {
    #[error("no food detected in image")]
    NoFoodDetected,

    #[error("provider response could not be parsed: {0}")]
    ProviderParse(String),

    #[error("recognition provider unavailable: {reason}")]
    ProviderUnavailable {
        reason: String,
        /// Set when the provider rejected the call for rate/quota reasons.
        quota_exhausted: bool,
        retry_after: Option<Duration>,
    },

    #[error("weight_grams must be a positive number, got {0}")]
    InvalidWeight(f64),
}

impl NutritionError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            reason: reason.into(),
            quota_exhausted: false,
            retry_after: None,
        }
    }

    pub fn quota_exhausted(reason: impl Into<String>, retry_after: Duration) -> Self {
        Self::ProviderUnavailable {
            reason: reason.into(),
            quota_exhausted: true,
            retry_after: Some(retry_after),
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::ProviderParse(reason.into())
    }
}
