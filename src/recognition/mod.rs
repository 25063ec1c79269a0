//! Food photo recognition providers.

pub mod logmeal;
pub mod vision;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::RETRY_AFTER, Response, StatusCode};
use serde_json::Value;
use tracing::warn;

use crate::config::{ProviderKind, RecognitionConfig};
use crate::nutrition::{normalizer::RawRecognitionPayload, NutritionError};

#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, image: Bytes) -> Result<RawRecognitionPayload, NutritionError>;
}

pub fn from_config(cfg: &RecognitionConfig) -> anyhow::Result<Arc<dyn Recognizer>> {
    let recognizer: Arc<dyn Recognizer> = match cfg.provider {
        ProviderKind::LogMeal => Arc::new(logmeal::LogMealClient::new(cfg)?),
        ProviderKind::Vision => Arc::new(vision::VisionClient::new(cfg)?),
    };
    Ok(recognizer)
}

pub(crate) fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("build http client: {e}"))
}

pub(crate) fn transport_error(provider: &str, e: reqwest::Error) -> NutritionError {
    let reason = if e.is_timeout() {
        format!("{provider} timed out")
    } else {
        format!("{provider} request failed: {e}")
    };
    warn!(provider, error = %e, "provider request failed");
    NutritionError::unavailable(reason)
}

/// Maps non-2xx responses: 429 is a quota rejection with a cooldown hint,
/// anything else is a plain outage.
pub(crate) async fn check_status(
    provider: &str,
    resp: Response,
    default_cooldown: Duration,
) -> Result<Response, NutritionError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(default_cooldown);
        warn!(provider, retry_after_secs = retry_after.as_secs(), "provider quota exhausted");
        return Err(NutritionError::quota_exhausted(
            format!("{provider} rate limit reached"),
            retry_after,
        ));
    }

    let body = resp.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    warn!(provider, %status, body = %snippet, "provider returned error status");
    Err(NutritionError::unavailable(format!(
        "{provider} returned {status}"
    )))
}

pub(crate) async fn read_json(provider: &str, resp: Response) -> Result<Value, NutritionError> {
    let text = resp.text().await.map_err(|e| transport_error(provider, e))?;
    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(provider, error = %e, "provider returned non-JSON body");
        NutritionError::parse(format!("{provider} returned invalid JSON: {e}"))
    })
}
