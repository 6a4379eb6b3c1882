//! LLM provider abstraction and implementations.
//!
//! Supports Anthropic Claude, `OpenAI`, Google Gemini, and AWS Bedrock via
//! a common trait. Every request is a single user turn made of
//! [`ContentBlock`]s, and every provider is asked to answer with a JSON
//! document matching the supplied schema.

pub mod anthropic;
#[cfg(feature = "bedrock")]
pub mod bedrock;
pub mod gemini;
pub mod openai;

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use roadworthy_inspection_models::EvidenceImage;

use crate::AiError;

/// Default timeout for a single provider request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum tokens requested from providers that require a limit.
pub const MAX_OUTPUT_TOKENS: u32 = 2048;

/// One piece of the user turn sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// Prompt text.
    Text {
        /// The text.
        text: String,
    },
    /// An attached image.
    Image {
        /// The encoded image.
        image: EvidenceImage,
    },
}

impl ContentBlock {
    /// Returns the image payload as standard base64.
    #[must_use]
    pub fn image_base64(image: &EvidenceImage) -> String {
        STANDARD.encode(&image.data)
    }
}

/// Response from the LLM provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    /// Concatenated text of the reply.
    pub text: String,
    /// Why the model stopped generating.
    pub stop_reason: StopReason,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Model finished its response naturally.
    EndTurn,
    /// Maximum tokens reached; the reply is probably truncated.
    MaxTokens,
    /// Provider refused or filtered the reply.
    Refused,
}

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Sends a single-turn request and returns the model's reply.
    ///
    /// `response_schema` is a JSON Schema the reply must conform to;
    /// providers that support structured output pass it through, the
    /// rest rely on the system prompt.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails.
    async fn generate(
        &self,
        system_prompt: &str,
        content: &[ContentBlock],
        response_schema: &serde_json::Value,
    ) -> Result<LlmResponse, AiError>;
}

/// Stand-in used when no provider could be configured.
///
/// Every request fails with the configuration error, which the analysis
/// adapter turns into its fallback result.
pub struct UnconfiguredProvider {
    reason: String,
}

impl UnconfiguredProvider {
    /// Creates a provider that always fails with `reason`.
    #[must_use]
    pub const fn new(reason: String) -> Self {
        Self { reason }
    }
}

#[async_trait::async_trait]
impl LlmProvider for UnconfiguredProvider {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn generate(
        &self,
        _system_prompt: &str,
        _content: &[ContentBlock],
        _response_schema: &serde_json::Value,
    ) -> Result<LlmResponse, AiError> {
        Err(AiError::Config {
            message: self.reason.clone(),
        })
    }
}

/// Builds the HTTP client shared by the HTTP providers.
///
/// # Errors
///
/// Returns [`AiError::Http`] if the TLS backend fails to initialize.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, AiError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Reads the request timeout from `AI_TIMEOUT_SECS`, falling back to
/// [`DEFAULT_TIMEOUT`] when unset or unparseable.
#[must_use]
pub fn timeout_from_env() -> Duration {
    match std::env::var("AI_TIMEOUT_SECS") {
        Ok(raw) => raw.trim().parse::<u64>().map_or_else(
            |_| {
                log::warn!("Ignoring invalid AI_TIMEOUT_SECS={raw}");
                DEFAULT_TIMEOUT
            },
            Duration::from_secs,
        ),
        Err(_) => DEFAULT_TIMEOUT,
    }
}

/// Creates an LLM provider based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `AWS_BEARER_TOKEN_BEDROCK` set -> Bedrock
/// 2. `ANTHROPIC_API_KEY` set -> Anthropic Claude
/// 3. `OPENAI_API_KEY` set -> `OpenAI`
/// 4. `GEMINI_API_KEY` or `API_KEY` set -> Gemini
/// 5. AWS credentials available (`AWS_ACCESS_KEY_ID`, `AWS_PROFILE`,
///    or IAM role on EC2/ECS) -> Bedrock
///
/// `AI_MODEL` overrides the model, `AI_BASE_URL` points the `OpenAI`
/// provider at a compatible server, and `AI_TIMEOUT_SECS` bounds each
/// request.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
#[allow(clippy::unused_async)] // async is needed when bedrock feature is enabled
pub async fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    let provider = std::env::var("AI_PROVIDER").unwrap_or_else(|_| detect_provider());
    let timeout = timeout_from_env();

    match provider.to_lowercase().as_str() {
        "anthropic" | "claude" => {
            let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| AiError::Config {
                message: "ANTHROPIC_API_KEY environment variable not set".to_string(),
            })?;
            let model = std::env::var("AI_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string());
            Ok(Box::new(
                anthropic::AnthropicProvider::new(api_key, model)
                    .with_client(build_http_client(timeout)?),
            ))
        }
        "openai" | "gpt" => {
            let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| AiError::Config {
                message: "OPENAI_API_KEY environment variable not set".to_string(),
            })?;
            let model = std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
            let mut provider = openai::OpenAiProvider::new(api_key, model)
                .with_client(build_http_client(timeout)?);
            if let Ok(base_url) = std::env::var("AI_BASE_URL") {
                log::info!("Using OpenAI-compatible endpoint at {base_url}");
                provider = provider.with_base_url(base_url);
            }
            Ok(Box::new(provider))
        }
        "gemini" | "google" => {
            let api_key = std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .map_err(|_| AiError::Config {
                    message: "GEMINI_API_KEY environment variable not set".to_string(),
                })?;
            let model =
                std::env::var("AI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
            Ok(Box::new(
                gemini::GeminiProvider::new(api_key, model)
                    .with_client(build_http_client(timeout)?),
            ))
        }
        #[cfg(feature = "bedrock")]
        "bedrock" | "aws" => {
            let model = std::env::var("AI_MODEL")
                .unwrap_or_else(|_| "us.anthropic.claude-sonnet-4-20250514-v1:0".to_string());
            let region = std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .ok()
                .or_else(|| {
                    // Bearer token auth requires a region for endpoint resolution.
                    if std::env::var("AWS_BEARER_TOKEN_BEDROCK").is_ok() {
                        log::info!(
                            "No AWS_REGION set; defaulting to us-east-1 for Bedrock bearer token auth"
                        );
                        Some("us-east-1".to_string())
                    } else {
                        None
                    }
                });
            let provider = bedrock::BedrockProvider::new(model, region, timeout).await;
            Ok(Box::new(provider))
        }
        #[cfg(not(feature = "bedrock"))]
        "bedrock" | "aws" => Err(AiError::Config {
            message: "Bedrock support not compiled. Rebuild with --features bedrock".to_string(),
        }),
        other => Err(AiError::Config {
            message: format!(
                "Unknown AI provider: {other}. Use 'anthropic', 'openai', 'gemini', or 'bedrock'."
            ),
        }),
    }
}

/// Auto-detects which provider to use based on available credentials.
///
/// Returns a provider name string that matches the arms in
/// [`create_provider_from_env`].
fn detect_provider() -> String {
    if std::env::var("AWS_BEARER_TOKEN_BEDROCK").is_ok() {
        log::info!("Auto-detected AI provider: Bedrock (AWS_BEARER_TOKEN_BEDROCK found)");
        return "bedrock".to_string();
    }

    if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return "anthropic".to_string();
    }

    if std::env::var("OPENAI_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: OpenAI (OPENAI_API_KEY found)");
        return "openai".to_string();
    }

    if std::env::var("GEMINI_API_KEY").is_ok() || std::env::var("API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: Gemini (GEMINI_API_KEY found)");
        return "gemini".to_string();
    }

    let has_aws_keys = std::env::var("AWS_ACCESS_KEY_ID").is_ok();
    let has_aws_profile = std::env::var("AWS_PROFILE").is_ok();
    let has_aws_role = std::env::var("AWS_ROLE_ARN").is_ok()
        || std::env::var("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI").is_ok();

    if has_aws_keys || has_aws_profile || has_aws_role {
        log::info!("Auto-detected AI provider: Bedrock (AWS credentials found)");
        return "bedrock".to_string();
    }

    log::warn!(
        "No AI credentials detected. Set one of: ANTHROPIC_API_KEY, OPENAI_API_KEY, \
         GEMINI_API_KEY, AWS_BEARER_TOKEN_BEDROCK, or AWS credentials \
         (AWS_ACCESS_KEY_ID/AWS_PROFILE). You can also set AI_PROVIDER explicitly."
    );

    // Fall back to anthropic — will produce a clear error about missing key
    "anthropic".to_string()
}
