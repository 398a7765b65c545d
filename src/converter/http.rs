//! HTTP client for a remote OCR server

use super::traits::Converter;
use crate::config::ConverterConfig;
use crate::error::{ConversionError, Error, Result};
use crate::types::FileKind;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

/// Response fields tried, in order, when a body has no `result`
const FALLBACK_FIELDS: &[&str] = &["markdown", "content", "text", "output"];

/// Converter backed by a remote OCR server
///
/// Uploads go to `POST {base_url}/ocr/image` and `POST {base_url}/ocr/pdf` as
/// multipart forms with a `file` part and an optional `prompt` field.
#[derive(Clone, Debug)]
pub struct HttpConverter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpConverter {
    /// Build a client from connection settings
    pub fn new(config: &ConverterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn upload(
        &self,
        endpoint: &str,
        kind: FileKind,
        filename: &str,
        bytes: Vec<u8>,
        prompt: &str,
    ) -> Result<Value> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(kind.mime_type())?;
        let mut form = Form::new().part("file", part);
        if !prompt.is_empty() {
            form = form.text("prompt", prompt.to_string());
        }

        let mut request = self
            .client
            .post(format!("{}/ocr/{}", self.base_url, endpoint))
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ConversionError::Backend {
                status: status.as_u16(),
                message: if message.is_empty() {
                    status.to_string()
                } else {
                    message
                },
            }
            .into());
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            Error::Conversion(ConversionError::MalformedResponse(format!(
                "invalid JSON: {e}"
            )))
        })
    }
}

#[async_trait]
impl Converter for HttpConverter {
    async fn convert_image(&self, filename: &str, bytes: Vec<u8>, prompt: &str) -> Result<String> {
        let body = self
            .upload("image", FileKind::Image, filename, bytes, prompt)
            .await?;
        extract_text(&body).ok_or_else(|| {
            ConversionError::MalformedResponse("response has no result text".into()).into()
        })
    }

    async fn convert_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        prompt: &str,
    ) -> Result<Vec<String>> {
        let body = self
            .upload("pdf", FileKind::Pdf, filename, bytes, prompt)
            .await?;
        extract_pages(&body).ok_or_else(|| {
            ConversionError::MalformedResponse("response has no page results".into()).into()
        })
    }

    async fn health(&self) -> Result<bool> {
        let mut request = self.client.get(format!("{}/health", self.base_url));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        match request.send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) if e.is_connect() || e.is_timeout() => {
                tracing::debug!(base_url = %self.base_url, error = %e, "conversion service unreachable");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Text of a single-result body: `result`, then the fallback fields
fn extract_text(body: &Value) -> Option<String> {
    std::iter::once("result")
        .chain(FALLBACK_FIELDS.iter().copied())
        .find_map(|field| body.get(field).and_then(Value::as_str))
        .map(str::to_string)
}

/// Per-page text of a document body
///
/// Prefers `results: [{result}, ...]`; a body with a single text field is
/// treated as a one-page document.
fn extract_pages(body: &Value) -> Option<Vec<String>> {
    match body.get("results").and_then(Value::as_array) {
        Some(results) => results
            .iter()
            .map(|page| match page {
                Value::String(text) => Some(text.clone()),
                other => extract_text(other),
            })
            .collect(),
        None => extract_text(body).map(|text| vec![text]),
    }
}
