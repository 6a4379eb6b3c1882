//! Google Gemini provider implementation.
//!
//! Uses the `generateContent` REST endpoint with
//! `responseMimeType: application/json` and a response schema, so the reply
//! text is the JSON document itself.

use serde::{Deserialize, Serialize};

use super::{ContentBlock, LlmProvider, LlmResponse, MAX_OUTPUT_TOKENS, StopReason};
use crate::AiError;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }

    /// Replaces the HTTP client (e.g. to apply a timeout).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

/// Converts content blocks to Gemini parts. Images go inline as base64.
fn convert_parts(content: &[ContentBlock]) -> Vec<serde_json::Value> {
    content
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text } => serde_json::json!({ "text": text }),
            ContentBlock::Image { image } => serde_json::json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": ContentBlock::image_base64(image),
                },
            }),
        })
        .collect()
}

/// Rewrites a JSON Schema into Gemini's `OpenAPI` subset: upper-case type
/// names, and no `additionalProperties`.
fn to_gemini_schema(schema: &serde_json::Value) -> serde_json::Value {
    match schema {
        serde_json::Value::Object(map) => map
            .iter()
            .filter(|(key, _)| key.as_str() != "additionalProperties")
            .map(|(key, value)| {
                let converted = match (key.as_str(), value) {
                    ("type", serde_json::Value::String(t)) => {
                        serde_json::Value::String(t.to_uppercase())
                    }
                    _ => to_gemini_schema(value),
                };
                (key.clone(), converted)
            })
            .collect::<serde_json::Map<_, _>>()
            .into(),
        serde_json::Value::Array(items) => items.iter().map(to_gemini_schema).collect(),
        other => other.clone(),
    }
}

fn build_request(
    system_prompt: &str,
    content: &[ContentBlock],
    response_schema: &serde_json::Value,
) -> GeminiRequest {
    GeminiRequest {
        system_instruction: GeminiContent {
            role: None,
            parts: vec![serde_json::json!({ "text": system_prompt })],
        },
        contents: vec![GeminiContent {
            role: Some("user"),
            parts: convert_parts(content),
        }],
        generation_config: GeminiGenerationConfig {
            response_mime_type: "application/json",
            response_schema: to_gemini_schema(response_schema),
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

fn parse_response(body: &str) -> Result<LlmResponse, AiError> {
    let response: GeminiResponse = serde_json::from_str(body)?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Provider {
            message: "No candidates in Gemini response".to_string(),
        })?;

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    let stop_reason = match candidate.finish_reason.as_deref() {
        Some("MAX_TOKENS") => StopReason::MaxTokens,
        Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT") => StopReason::Refused,
        _ => StopReason::EndTurn,
    };

    Ok(LlmResponse { text, stop_reason })
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        content: &[ContentBlock],
        response_schema: &serde_json::Value,
    ) -> Result<LlmResponse, AiError> {
        let request = build_request(system_prompt, content, response_schema);

        let resp = self
            .client
            .post(format!("{BASE_URL}/models/{}:generateContent", self.model))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let err: GeminiError = serde_json::from_str(&body).unwrap_or_else(|_| GeminiError {
                error: GeminiErrorDetail {
                    message: format!("HTTP {status}: {body}"),
                },
            });
            return Err(AiError::Provider {
                message: err.error.message,
            });
        }

        parse_response(&body)
    }
}
