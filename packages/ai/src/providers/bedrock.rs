//! AWS Bedrock provider implementation using the Converse API.

use std::time::Duration;

use aws_sdk_bedrockruntime::types::{
    self as bedrock, ContentBlock as BedrockContent, ConversationRole, ImageBlock, ImageFormat,
    ImageSource, Message as BedrockMessage, StopReason as BedrockStopReason, SystemContentBlock,
};
use aws_smithy_types::Blob;
use aws_smithy_types::timeout::TimeoutConfig;

use super::{ContentBlock, LlmProvider, LlmResponse, MAX_OUTPUT_TOKENS, StopReason};
use crate::AiError;

/// AWS Bedrock provider using the Converse API.
///
/// Supports any model available on Bedrock that accepts image input
/// (Claude, Llama, Nova, etc.). Authentication uses the standard AWS
/// credential chain (env vars, IAM role, `~/.aws/credentials`).
pub struct BedrockProvider {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
}

impl BedrockProvider {
    /// Creates a new Bedrock provider.
    ///
    /// Loads AWS configuration from the environment (region, credentials).
    /// The `model_id` should be a Bedrock model ID such as
    /// `us.anthropic.claude-sonnet-4-20250514-v1:0`.
    pub async fn new(model_id: String, region: Option<String>, timeout: Duration) -> Self {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            );

        if let Some(region) = region {
            config_loader = config_loader.region(aws_config::Region::new(region));
        }

        let config = config_loader.load().await;
        let client = aws_sdk_bedrockruntime::Client::new(&config);

        Self { client, model_id }
    }
}

/// Maps a MIME type onto the image formats Bedrock accepts. Anything
/// unrecognized is sent as JPEG, the format device cameras produce.
fn image_format(mime_type: &str) -> ImageFormat {
    match mime_type {
        "image/png" => ImageFormat::Png,
        "image/gif" => ImageFormat::Gif,
        "image/webp" => ImageFormat::Webp,
        _ => ImageFormat::Jpeg,
    }
}

/// Converts our content blocks into a single Bedrock user message.
fn convert_message(content: &[ContentBlock]) -> Result<BedrockMessage, AiError> {
    let mut bedrock_blocks = Vec::with_capacity(content.len());

    for block in content {
        match block {
            ContentBlock::Text { text } => {
                bedrock_blocks.push(BedrockContent::Text(text.clone()));
            }
            ContentBlock::Image { image } => {
                let image_block = ImageBlock::builder()
                    .format(image_format(&image.mime_type))
                    .source(ImageSource::Bytes(Blob::new(image.data.to_vec())))
                    .build()
                    .map_err(|e| AiError::Provider {
                        message: format!("Failed to build ImageBlock: {e}"),
                    })?;
                bedrock_blocks.push(BedrockContent::Image(image_block));
            }
        }
    }

    BedrockMessage::builder()
        .role(ConversationRole::User)
        .set_content(Some(bedrock_blocks))
        .build()
        .map_err(|e| AiError::Provider {
            message: format!("Failed to build Bedrock Message: {e}"),
        })
}

#[async_trait::async_trait]
impl LlmProvider for BedrockProvider {
    fn name(&self) -> &'static str {
        "bedrock"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        content: &[ContentBlock],
        response_schema: &serde_json::Value,
    ) -> Result<LlmResponse, AiError> {
        let message = convert_message(content)?;

        // Converse has no schema-constrained output for every model, so the
        // schema rides along in the system prompt.
        let system = format!(
            "{system_prompt}\n\nRespond with a single JSON object and nothing else. \
             It must conform to this JSON Schema:\n{response_schema}"
        );

        let response = self
            .client
            .converse()
            .model_id(&self.model_id)
            .system(SystemContentBlock::Text(system))
            .messages(message)
            .inference_config(
                bedrock::InferenceConfiguration::builder()
                    .max_tokens(i32::try_from(MAX_OUTPUT_TOKENS).unwrap_or(i32::MAX))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| AiError::Provider {
                message: format!("Bedrock Converse error: {e}"),
            })?;

        let output = response.output().ok_or_else(|| AiError::Provider {
            message: "No output in Bedrock response".to_string(),
        })?;

        let bedrock::ConverseOutput::Message(response_msg) = output else {
            return Err(AiError::Provider {
                message: "Unexpected Bedrock output variant".to_string(),
            });
        };

        let text = response_msg
            .content()
            .iter()
            .filter_map(|block| match block {
                BedrockContent::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        let stop_reason = match response.stop_reason() {
            BedrockStopReason::MaxTokens => StopReason::MaxTokens,
            BedrockStopReason::ContentFiltered | BedrockStopReason::GuardrailIntervened => {
                StopReason::Refused
            }
            _ => StopReason::EndTurn,
        };

        Ok(LlmResponse { text, stop_reason })
    }
}
