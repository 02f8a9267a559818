//! Schema-constrained extraction through an LLM provider.
//!
//! One run is invoke → validate → deserialize. Content acquisition happens
//! before the extractor is called, so a failed fetch never reaches the
//! provider.

use crate::schema::Schema;
use crate::source::SourceContent;
use crate::tools::{ToolCall, ToolRequest, ToolSet, ToolSignature};
use crate::ExtractError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Configuration for LLM extraction
#[derive(Clone, Debug)]
pub struct LLMExtractorConfig {
    /// Text content longer than this many characters is truncated
    pub max_content_length: usize,
}

impl Default for LLMExtractorConfig {
    fn default() -> Self {
        Self {
            max_content_length: 200_000,
        }
    }
}

/// A record type the model can be asked to produce.
pub trait Extractable: DeserializeOwned + Serialize {
    fn schema() -> Schema;
}

/// Everything the provider needs for one structured completion.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub system: String,
    pub content: SourceContent,
    pub schema: Schema,
}

/// The provider's raw answer, not yet validated.
#[derive(Clone, Debug)]
pub struct ModelResponse {
    pub value: Value,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// Result of LLM extraction
#[derive(Clone, Debug)]
pub struct ExtractionResult<T> {
    /// Extracted data
    pub data: T,
    /// LLM model used
    pub model: String,
    /// Token usage information
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Pipeline stages, in order. Errors stop the run in the stage they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquiring,
    Invoking,
    Validating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Acquiring => "acquiring",
            Stage::Invoking => "invoking",
            Stage::Validating => "validating",
        };
        f.write_str(name)
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get the name of the provider
    fn name(&self) -> &str;

    /// Ask for content matching `request.schema`
    async fn generate(&self, request: &CompletionRequest) -> Result<ModelResponse, ExtractError>;

    /// Ask the model to pick one of the declared tools
    async fn select_tool(&self, request: &ToolRequest) -> Result<ToolCall, ExtractError>;
}

/// Main LLM extractor
pub struct LLMExtractor {
    provider: Arc<dyn LLMProvider>,
    config: LLMExtractorConfig,
}

impl LLMExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self::with_config(provider, LLMExtractorConfig::default())
    }

    pub fn with_config(provider: Arc<dyn LLMProvider>, config: LLMExtractorConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Extracts a typed record from `source`.
    pub async fn extract<T: Extractable>(
        &self,
        system: &str,
        source: SourceContent,
    ) -> Result<ExtractionResult<T>, ExtractError> {
        let schema = T::schema();
        let result = self.extract_value(&schema, system, source).await?;
        let data: T = serde_json::from_value(result.data)?;

        Ok(ExtractionResult {
            data,
            model: result.model,
            usage: result.usage,
        })
    }

    /// Extracts an instance of a schema only known at runtime.
    #[instrument(
        level = "info",
        skip_all,
        fields(schema = %schema.name, provider = %self.provider.name())
    )]
    pub async fn extract_value(
        &self,
        schema: &Schema,
        system: &str,
        source: SourceContent,
    ) -> Result<ExtractionResult<Value>, ExtractError> {
        let content = self.prepare(source);
        let request = CompletionRequest {
            system: system.to_string(),
            content,
            schema: schema.clone(),
        };

        info!(
            stage = %Stage::Invoking,
            content_length = request.content.len(),
            "Sending content to model"
        );
        let response = self.provider.generate(&request).await?;

        debug!(stage = %Stage::Validating, model = %response.model, "Validating model response");
        validate_response(schema, response)
    }

    /// Lets the model pick a tool and validates its choice and arguments.
    #[instrument(level = "info", skip_all, fields(provider = %self.provider.name()))]
    pub async fn select_tool(
        &self,
        system: &str,
        instruction: &str,
        tools: Vec<ToolSignature>,
    ) -> Result<ToolCall, ExtractError> {
        let request = ToolRequest {
            system: system.to_string(),
            instruction: instruction.to_string(),
            tools,
        };

        info!(
            stage = %Stage::Invoking,
            tools = request.tools.len(),
            "Asking model to select a tool"
        );
        let call = self.provider.select_tool(&request).await?;

        debug!(stage = %Stage::Validating, tool = %call.name, "Validating tool call");
        request.validate_call(call)
    }

    /// Typed variant of [`select_tool`](Self::select_tool).
    pub async fn choose<S: ToolSet>(
        &self,
        system: &str,
        instruction: &str,
    ) -> Result<S, ExtractError> {
        let call = self.select_tool(system, instruction, S::signatures()).await?;
        S::from_call(call)
    }

    fn prepare(&self, source: SourceContent) -> SourceContent {
        if let SourceContent::Text(text) = &source {
            let chars = text.chars().count();
            if chars > self.config.max_content_length {
                warn!(
                    length = chars,
                    limit = self.config.max_content_length,
                    "Truncating content before sending to model"
                );
                return source.truncated(self.config.max_content_length);
            }
        }
        source
    }
}

/// Validates a raw model response against `schema`. Pure and repeatable:
/// the same response always yields the same result or the same error.
pub fn validate_response(
    schema: &Schema,
    response: ModelResponse,
) -> Result<ExtractionResult<Value>, ExtractError> {
    schema.validate(&response.value)?;
    Ok(ExtractionResult {
        data: response.value,
        model: response.model,
        usage: response.usage,
    })
}
