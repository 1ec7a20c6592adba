use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};

use crate::config::EditorConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_DETAIL_CHARS: usize = 512;

/// One image-edit call as it goes over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub model: String,
    pub image_mime_type: String,
    /// Bare base64, no data-URI prefix.
    pub image_data: String,
    pub text: String,
}

impl EditRequest {
    /// `generateContent` body: the image part first, then the text part.
    pub fn payload(&self) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": self.image_mime_type,
                            "data": self.image_data,
                        }
                    },
                    { "text": self.text },
                ],
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
            },
        })
    }
}

/// The remote image model, reduced to the one call the app makes.
///
/// Implementations return the decoded JSON response untouched; interpreting
/// it belongs to the caller.
pub trait ImageEditor: Send + Sync {
    fn name(&self) -> &str;
    fn generate_image_edit(&self, request: &EditRequest, api_key: &str) -> Result<Value>;
}

pub struct GeminiImageEditor {
    api_base: String,
    http: HttpClient,
}

impl GeminiImageEditor {
    pub fn new(config: &EditorConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

impl ImageEditor for GeminiImageEditor {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_image_edit(&self, request: &EditRequest, api_key: &str) -> Result<Value> {
        let endpoint = self.endpoint_for_model(&request.model);
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&request.payload())
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        read_reply(response)
    }
}

/// Decodes a `generateContent` reply. Failed statuses keep the code and the
/// service's own `error.message` when the body carries one.
fn read_reply(response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let body = response.text().context("failed to read Gemini reply")?;
    if !status.is_success() {
        let detail = service_error_message(&body).unwrap_or(body);
        bail!(
            "Gemini request failed ({}): {}",
            status.as_u16(),
            truncate_text(detail.trim(), MAX_DETAIL_CHARS)
        );
    }
    serde_json::from_str(&body).context("Gemini reply was not valid JSON")
}

fn service_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .pointer("/error/message")?
        .as_str()
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}

/// Cuts `value` to `max_chars` characters, marking the cut with an ellipsis.
pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &value[..cut]),
        None => value.to_string(),
    }
}
