use axum::extract::{rejection::JsonRejection, FromRequest};
use axum::http::StatusCode;

use crate::error::AppError;

/// `axum::Json` whose rejections use the `AppError` envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge(rejection.body_text());
        }
        match rejection {
            JsonRejection::JsonDataError(err) => match missing_field(&err.body_text()) {
                Some(field) => AppError::validation(format!("missing required field `{field}`")),
                None => AppError::validation(format!("invalid request body: {}", err.body_text())),
            },
            JsonRejection::JsonSyntaxError(err) => {
                AppError::validation(format!("malformed JSON: {}", err.body_text()))
            }
            JsonRejection::MissingJsonContentType(_) => {
                AppError::validation("expected `Content-Type: application/json`")
            }
            other => AppError::validation(other.body_text()),
        }
    }
}

fn missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let rest = message.get(start..)?;
    rest.get(..rest.find('`')?)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        extract::DefaultBodyLimit,
        http::{header, Request},
        routing::post,
        Router,
    };
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    #[derive(Deserialize)]
    struct Portion {
        #[allow(dead_code)]
        grams: u32,
    }

    async fn accept(AppJson(_): AppJson<Portion>) -> StatusCode {
        StatusCode::NO_CONTENT
    }

    async fn send(body: &'static str, json: bool) -> (StatusCode, Value) {
        let app = Router::new()
            .route("/", post(accept))
            .layer(DefaultBodyLimit::max(64));
        let mut req = Request::post("/");
        if json {
            req = req.header(header::CONTENT_TYPE, "application/json");
        }
        let resp = app.oneshot(req.body(Body::from(body)).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn rejections_use_error_envelope() {
        assert_eq!(send(r#"{"grams": 5}"#, true).await.0, StatusCode::NO_CONTENT);

        for (body, json) in [
            (r#"{"grams": -3}"#, true),
            (r#"{"grams": 5"#, true),
            (r#"{"grams": 5}"#, false),
        ] {
            let (status, err) = send(body, json).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
        }

        let (_, err) = send("{}", true).await;
        assert_eq!(
            err["error"]["message"],
            "validation error: missing required field `grams`"
        );
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let (status, err) = send(
            r#"{"grams": 5, "padding": "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx"}"#,
            true,
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err["error"]["code"], "PAYLOAD_TOO_LARGE");
    }
}
