//! LogMeal: segment the photo, then ask for nutritional info of the segmented image.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{check_status, http_client, read_json, transport_error, Recognizer};
use crate::config::RecognitionConfig;
use crate::nutrition::{normalizer::RawRecognitionPayload, NutritionError};

const PROVIDER: &str = "logmeal";

#[derive(Clone)]
pub struct LogMealClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    cooldown: Duration,
}

impl LogMealClient {
    pub fn new(cfg: &RecognitionConfig) -> anyhow::Result<Self> {
        let api_token = cfg
            .logmeal_api_token
            .clone()
            .ok_or_else(|| anyhow::anyhow!("LOGMEAL_API_TOKEN is required for the logmeal provider"))?;
        Ok(Self {
            http: http_client(Duration::from_secs(cfg.timeout_secs))?,
            base_url: cfg.logmeal_base_url.trim_end_matches('/').to_string(),
            api_token,
            cooldown: Duration::from_secs(cfg.cooldown_secs),
        })
    }

    async fn post(&self, req: reqwest::RequestBuilder) -> Result<Value, NutritionError> {
        let resp = req
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let resp = check_status(PROVIDER, resp, self.cooldown).await?;
        read_json(PROVIDER, resp).await
    }
}

#[async_trait]
impl Recognizer for LogMealClient {
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    async fn recognize(&self, image: Bytes) -> Result<RawRecognitionPayload, NutritionError> {
        let part = Part::bytes(image.to_vec())
            .file_name("food.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| transport_error(PROVIDER, e))?;
        let segmentation = self
            .post(
                self.http
                    .post(format!("{}/v2/image/segmentation/complete", self.base_url))
                    .multipart(Form::new().part("image", part)),
            )
            .await?;

        let image_id = match segmentation.get("imageId") {
            Some(id @ (Value::Number(_) | Value::String(_))) => id.clone(),
            _ => {
                debug!("segmentation returned no imageId");
                return Err(NutritionError::NoFoodDetected);
            }
        };

        let nutrition = self
            .post(
                self.http
                    .post(format!("{}/v2/recipe/nutritionalInfo", self.base_url))
                    .json(&json!({ "imageId": image_id })),
            )
            .await?;

        Ok(RawRecognitionPayload::LogMeal {
            segmentation,
            nutrition,
        })
    }
}
