//! Generative vision model (Gemini `generateContent`) prompted for a JSON item list.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::instrument;

use super::{check_status, http_client, read_json, transport_error, Recognizer};
use crate::config::RecognitionConfig;
use crate::nutrition::{normalizer::RawRecognitionPayload, NutritionError};
use crate::photos::services::sniff_image_mime;

const PROVIDER: &str = "vision";

const PROMPT: &str = "Identify every distinct food item in this photo. Respond with only a JSON \
array, one object per item, shaped as {\"item\": string, \"calories\": number, \"protein_g\": number, \
\"carbs_g\": number, \"fats_g\": number}. All values are per 100 grams of that item. \
Respond with [] if there is no food in the photo.";

#[derive(Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    cooldown: Duration,
}

impl VisionClient {
    pub fn new(cfg: &RecognitionConfig) -> anyhow::Result<Self> {
        let api_key = cfg
            .vision_api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("VISION_API_KEY is required for the vision provider"))?;
        Ok(Self {
            http: http_client(Duration::from_secs(cfg.timeout_secs))?,
            base_url: cfg.vision_base_url.trim_end_matches('/').to_string(),
            model: cfg.vision_model.clone(),
            api_key,
            cooldown: Duration::from_secs(cfg.cooldown_secs),
        })
    }
}

/// Concatenated text parts of the first candidate.
fn candidate_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text")?.as_str())
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

#[async_trait]
impl Recognizer for VisionClient {
    #[instrument(skip(self, image), fields(bytes = image.len(), model = %self.model))]
    async fn recognize(&self, image: Bytes) -> Result<RawRecognitionPayload, NutritionError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": PROMPT },
                    { "inline_data": {
                        "mime_type": sniff_image_mime(&image),
                        "data": BASE64.encode(&image),
                    } }
                ]
            }],
            "generationConfig": { "response_mime_type": "application/json" }
        });

        let resp = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let resp = check_status(PROVIDER, resp, self.cooldown).await?;
        let body = read_json(PROVIDER, resp).await?;

        let text = candidate_text(&body)
            .ok_or_else(|| NutritionError::parse("vision response has no candidate text"))?;
        Ok(RawRecognitionPayload::Vision { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> RecognitionConfig {
        RecognitionConfig {
            provider: ProviderKind::Vision,
            logmeal_base_url: String::new(),
            logmeal_api_token: None,
            vision_base_url: base_url,
            vision_api_key: Some("k-123".into()),
            vision_model: "gemini-1.5-flash".into(),
            timeout_secs: 5,
            cooldown_secs: 45,
        }
    }

    #[tokio::test]
    async fn returns_model_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(query_param("key", "k-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [
                    { "text": "[{\"item\": \"toast\", " },
                    { "text": "\"calories\": 313, \"protein_g\": 11.6, \"carbs_g\": 55.7, \"fats_g\": 4.2}]" }
                ] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = VisionClient::new(&config(server.uri())).unwrap();
        let payload = client.recognize(Bytes::from_static(b"\x89PNG....")).await.unwrap();
        let items = payload.normalize().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "toast");
        assert_eq!(items[0].fat_per_100g, 4.2);
    }

    #[tokio::test]
    async fn missing_candidates_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let client = VisionClient::new(&config(server.uri())).unwrap();
        assert!(matches!(
            client.recognize(Bytes::from_static(b"img")).await,
            Err(NutritionError::ProviderParse(_))
        ));
    }

    #[tokio::test]
    async fn quota_without_retry_after_uses_cooldown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = VisionClient::new(&config(server.uri())).unwrap();
        match client.recognize(Bytes::from_static(b"img")).await {
            Err(NutritionError::ProviderUnavailable {
                quota_exhausted: true,
                retry_after,
                ..
            }) => assert_eq!(retry_after, Some(Duration::from_secs(45))),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
