use std::time::Duration;

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::nutrition::NutritionError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Nutrition(#[from] NutritionError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, Option<Duration>) {
        match self {
            AppError::Nutrition(e) => match e {
                NutritionError::NoFoodDetected => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "NO_FOOD_DETECTED", None)
                }
                NutritionError::ProviderParse(_) => {
                    (StatusCode::BAD_GATEWAY, "PROVIDER_PARSE_ERROR", None)
                }
                NutritionError::ProviderUnavailable {
                    quota_exhausted: true,
                    retry_after,
                    ..
                } => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "PROVIDER_QUOTA_EXCEEDED",
                    *retry_after,
                ),
                NutritionError::ProviderUnavailable { retry_after, .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PROVIDER_UNAVAILABLE",
                    *retry_after,
                ),
                NutritionError::InvalidWeight(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_WEIGHT", None)
                }
            },
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", None),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT", None),
            AppError::PayloadTooLarge(_) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", None)
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, retry_after) = self.parts();

        match &self {
            AppError::Internal(e) => tracing::error!(error = ?e, "internal error"),
            AppError::Nutrition(NutritionError::ProviderParse(_)) => {
                tracing::error!(error = %self, code, "request failed")
            }
            _ => tracing::warn!(error = %self, code, "request failed"),
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code,
                message: self.to_string(),
                retry_after_secs: retry_after.map(|d| d.as_secs()),
            },
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(value) = retry_after.and_then(|d| HeaderValue::from_str(&d.as_secs().to_string()).ok()) {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        response
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: AppError) -> (StatusCode, Option<String>, Value) {
        let resp = err.into_response();
        let status = resp.status();
        let retry = resp
            .headers()
            .get(RETRY_AFTER)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, retry, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn quota_maps_to_429_with_retry_after() {
        let err = AppError::from(NutritionError::quota_exhausted(
            "logmeal rate limit reached",
            Duration::from_secs(30),
        ));
        let (status, retry, body) = render(err).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(retry.as_deref(), Some("30"));
        assert_eq!(body["error"]["code"], "PROVIDER_QUOTA_EXCEEDED");
        assert_eq!(body["error"]["retry_after_secs"], 30);
    }

    #[tokio::test]
    async fn each_nutrition_kind_has_its_own_code() {
        let (status, retry, body) = render(NutritionError::unavailable("timed out").into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(retry.is_none());
        assert_eq!(body["error"]["code"], "PROVIDER_UNAVAILABLE");

        let (status, _, body) = render(NutritionError::NoFoodDetected.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "NO_FOOD_DETECTED");

        let (status, _, body) = render(NutritionError::parse("bad json").into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "PROVIDER_PARSE_ERROR");

        let (status, _, body) = render(NutritionError::InvalidWeight(-5.0).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_WEIGHT");
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let err = AppError::from(anyhow::anyhow!("connection refused to 10.0.0.3"));
        let (status, _, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL");
        assert_eq!(body["error"]["message"], "internal server error");
    }
}
