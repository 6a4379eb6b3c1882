//! `OpenAI` GPT provider implementation.
//!
//! Also serves any `OpenAI`-compatible server (Ollama, vLLM, llama.cpp,
//! LM Studio) through [`OpenAiProvider::with_base_url`].

use serde::{Deserialize, Serialize};

use super::{ContentBlock, LlmProvider, LlmResponse, MAX_OUTPUT_TOKENS, StopReason};
use crate::AiError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Replaces the HTTP client (e.g. to apply a timeout).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Points the provider at an `OpenAI`-compatible server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    response_format: OpenAiResponseFormat,
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: serde_json::Value,
}

#[derive(Serialize)]
struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

/// Converts content blocks to chat-completions content parts. Images are
/// sent inline as data URLs.
fn convert_content(content: &[ContentBlock]) -> serde_json::Value {
    let parts: Vec<serde_json::Value> = content
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text } => serde_json::json!({ "type": "text", "text": text }),
            ContentBlock::Image { image } => serde_json::json!({
                "type": "image_url",
                "image_url": {
                    "url": format!(
                        "data:{};base64,{}",
                        image.mime_type,
                        ContentBlock::image_base64(image)
                    ),
                },
            }),
        })
        .collect();
    serde_json::Value::Array(parts)
}

fn build_request<'a>(
    model: &'a str,
    system_prompt: &str,
    content: &[ContentBlock],
    response_schema: &serde_json::Value,
) -> OpenAiRequest<'a> {
    OpenAiRequest {
        model,
        messages: vec![
            OpenAiMessage {
                role: "system",
                content: serde_json::json!(system_prompt),
            },
            OpenAiMessage {
                role: "user",
                content: convert_content(content),
            },
        ],
        response_format: OpenAiResponseFormat {
            format_type: "json_schema",
            json_schema: serde_json::json!({
                "name": "inspection_analysis",
                "strict": true,
                "schema": response_schema,
            }),
        },
        max_tokens: MAX_OUTPUT_TOKENS,
    }
}

fn parse_response(body: &str) -> Result<LlmResponse, AiError> {
    let response: OpenAiResponse = serde_json::from_str(body)?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Provider {
            message: "No choices in OpenAI response".to_string(),
        })?;

    if let Some(refusal) = choice.message.refusal {
        log::warn!("OpenAI refused the request: {refusal}");
        return Ok(LlmResponse {
            text: String::new(),
            stop_reason: StopReason::Refused,
        });
    }

    let stop_reason = match choice.finish_reason.as_deref() {
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::Refused,
        _ => StopReason::EndTurn,
    };

    Ok(LlmResponse {
        text: choice.message.content.unwrap_or_default(),
        stop_reason,
    })
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        content: &[ContentBlock],
        response_schema: &serde_json::Value,
    ) -> Result<LlmResponse, AiError> {
        let request = build_request(&self.model, system_prompt, content, response_schema);

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let err: OpenAiError = serde_json::from_str(&body).unwrap_or_else(|_| OpenAiError {
                error: OpenAiErrorDetail {
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
