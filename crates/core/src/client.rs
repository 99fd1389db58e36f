//! Prediction endpoint client.
//!
//! One awaited `multipart/form-data` POST per call, no retries. Failures are
//! classified into [`AppError::Network`], [`AppError::Server`] and
//! [`AppError::Unexpected`] here, once, so callers only ever see the
//! taxonomy.

use std::future::Future;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::image_processing::ImageProcessor;
use crate::model::{PredictionResult, SelectedImage};

/// Multipart field the endpoint reads the image from.
pub const UPLOAD_FIELD: &str = "file";
pub const UPLOAD_FILENAME: &str = "image.jpg";
pub const UPLOAD_MIME: &str = "image/jpeg";

/// Anything that can turn a selected image into a prediction.
pub trait Predictor {
    /// Fails with [`AppError::NoImage`] before any I/O when `image` is `None`.
    fn predict(
        &self,
        image: Option<&SelectedImage>,
    ) -> impl Future<Output = Result<PredictionResult>> + Send;
}

/// Optional error body of a non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

pub struct PredictionClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl PredictionClient {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_endpoint(config.endpoint.clone())
    }

    pub fn with_endpoint(endpoint: Url) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Uploads the image and parses the classification.
    pub async fn predict_image(&self, image: Option<&SelectedImage>) -> Result<PredictionResult> {
        let image = image.ok_or(AppError::NoImage)?;
        let bytes = ImageProcessor::read_bytes(image).await?;

        let part = Part::bytes(bytes)
            .file_name(UPLOAD_FILENAME)
            .mime_str(UPLOAD_MIME)
            .map_err(|e| AppError::unexpected(format!("Invalid upload part: {}", e)))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        info!("sending {} to {}", image.path().display(), self.endpoint);

        // `multipart` sets `Content-Type: multipart/form-data; boundary=...`
        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            warn!("response body from {} was cut off: {}", self.endpoint, e);
            AppError::Network
        })?;

        if !status.is_success() {
            warn!("prediction endpoint returned {}", status);
            return Err(server_error(&body));
        }

        let result: PredictionResult = serde_json::from_slice(&body).map_err(|e| {
            warn!("malformed prediction body: {}", e);
            AppError::unexpected(format!("Malformed prediction body: {}", e))
        })?;

        if !result.has_valid_confidence() {
            warn!("confidence {} outside [0, 1]", result.confidence);
            return Err(AppError::unexpected(format!(
                "Confidence {} is not a probability",
                result.confidence
            )));
        }

        debug!("prediction: {} ({:.4})", result.class_name, result.confidence);
        Ok(result)
    }
}

impl Predictor for PredictionClient {
    async fn predict(&self, image: Option<&SelectedImage>) -> Result<PredictionResult> {
        self.predict_image(image).await
    }
}

/// A send failure is a network failure unless the request never got built.
fn classify_send_error(e: reqwest::Error) -> AppError {
    if e.is_builder() {
        warn!("could not build prediction request: {}", e);
        AppError::unexpected(format!("Request construction failed: {}", e))
    } else {
        warn!("no response from prediction endpoint: {}", e);
        AppError::Network
    }
}

/// Server error carrying the body's `detail`, or the generic fallback.
fn server_error(body: &[u8]) -> AppError {
    let detail = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .and_then(|detail| match detail {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });

    match detail {
        Some(detail) => AppError::Server(detail),
        None => AppError::server_fallback(),
    }
}
