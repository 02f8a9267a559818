//! LLM provider implementations
//!
//! `OpenAIProvider` talks to any OpenAI-compatible chat completion service
//! (OpenAI, Azure OpenAI, GitHub Models). `MockProvider` answers locally and
//! is used by the tests.

use crate::llm_extractor::{CompletionRequest, LLMProvider, ModelResponse};
use crate::source::SourceContent;
use crate::tools::{ToolCall, ToolRequest};
use crate::ExtractError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock LLM provider for testing
pub struct MockProvider {
    name: String,
    responses: HashMap<String, Value>,
    tool_call: Option<ToolCall>,
    calls: AtomicUsize,
    last_content: Mutex<Option<SourceContent>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            responses: HashMap::new(),
            tool_call: None,
            calls: AtomicUsize::new(0),
            last_content: Mutex::new(None),
        }
    }

    /// Canned response for requests targeting the schema called `schema_name`.
    pub fn with_response(mut self, schema_name: impl Into<String>, response: Value) -> Self {
        self.responses.insert(schema_name.into(), response);
        self
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_call = Some(call);
        self
    }

    /// Number of requests that reached the provider.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Content of the most recent structured request.
    pub fn last_content(&self) -> Option<SourceContent> {
        self.last_content.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl LLMProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<ModelResponse, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_content.lock() {
            *last = Some(request.content.clone());
        }

        // Without a canned answer, build a value that fits the schema
        let value = self
            .responses
            .get(&request.schema.name)
            .cloned()
            .unwrap_or_else(|| request.schema.placeholder());

        Ok(ModelResponse {
            value,
            model: self.name.clone(),
            usage: None,
        })
    }

    async fn select_tool(&self, request: &ToolRequest) -> Result<ToolCall, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(call) = &self.tool_call {
            return Ok(call.clone());
        }

        request
            .tools
            .first()
            .map(|tool| ToolCall::new(tool.name.clone(), tool.parameters.placeholder()))
            .ok_or_else(|| ExtractError::service("Mock", "No tools declared"))
    }
}

/// Parses model output as JSON, falling back to the outermost `{...}` span
/// when the model wrapped the object in prose or a code fence.
pub fn parse_json_content(text: &str) -> Result<Value, ExtractError> {
    if let Ok(json) = serde_json::from_str::<Value>(text) {
        return Ok(json);
    }

    extract_json_from_text(text)
        .and_then(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .ok_or_else(|| {
            ExtractError::ParseError("No valid JSON object in model response".to_string())
        })
}

fn extract_json_from_text(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;

    if start <= end {
        Some(&text[start..=end])
    } else {
        None
    }
}

pub mod openai {
    use super::*;
    use crate::llm_extractor::TokenUsage;
    use crate::source::SourceContent;
    use async_openai::config::{AzureConfig, OpenAIConfig};
    use async_openai::error::OpenAIError;
    use async_openai::types::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, ChatCompletionResponseMessage,
        ChatCompletionToolArgs, ChatCompletionToolChoiceOption, ChatCompletionToolType,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FunctionObjectArgs, ImageDetail, ImageUrlArgs,
        ResponseFormat, ResponseFormatJsonSchema,
    };
    use async_openai::Client;
    use tracing::{debug, instrument, warn};

    enum ChatClient {
        OpenAI(Client<OpenAIConfig>),
        Azure(Client<AzureConfig>),
    }

    impl ChatClient {
        async fn create(
            &self,
            request: CreateChatCompletionRequest,
        ) -> Result<CreateChatCompletionResponse, OpenAIError> {
            match self {
                ChatClient::OpenAI(client) => client.chat().create(request).await,
                ChatClient::Azure(client) => client.chat().create(request).await,
            }
        }
    }

    /// OpenAI provider implementation
    pub struct OpenAIProvider {
        client: ChatClient,
        model: String,
        service: String,
    }

    impl OpenAIProvider {
        pub fn new(api_key: String) -> Self {
            let config = OpenAIConfig::new().with_api_key(api_key);
            Self::from_config(config, "gpt-4o-mini".to_string())
        }

        pub fn with_model(mut self, model: String) -> Self {
            self.model = model;
            self
        }

        /// Label used in error messages, e.g. "GitHub Models".
        pub fn with_service_name(mut self, service: impl Into<String>) -> Self {
            self.service = service.into();
            self
        }

        /// Create from custom client configuration
        pub fn from_config(config: OpenAIConfig, model: String) -> Self {
            Self {
                client: ChatClient::OpenAI(Client::with_config(config)),
                model,
                service: "OpenAI".to_string(),
            }
        }

        /// Azure routes by deployment, so the deployment doubles as the model name.
        pub fn from_azure_config(config: AzureConfig, deployment: String) -> Self {
            Self {
                client: ChatClient::Azure(Client::with_config(config)),
                model: deployment,
                service: "Azure OpenAI".to_string(),
            }
        }

        pub fn model(&self) -> &str {
            &self.model
        }

        fn err(&self, e: impl ToString) -> ExtractError {
            ExtractError::service(&self.service, e)
        }

        fn system_message(&self, text: &str) -> Result<ChatCompletionRequestMessage, ExtractError> {
            let message = ChatCompletionRequestSystemMessageArgs::default()
                .content(text)
                .build()
                .map_err(|e| self.err(e))?;
            Ok(ChatCompletionRequestMessage::System(message))
        }

        fn user_message(
            &self,
            content: &SourceContent,
        ) -> Result<ChatCompletionRequestMessage, ExtractError> {
            let content = match content {
                SourceContent::Text(text) => {
                    ChatCompletionRequestUserMessageContent::Text(text.clone())
                }
                SourceContent::Image { data_uri, caption } => {
                    let mut parts: Vec<ChatCompletionRequestUserMessageContentPart> = Vec::new();
                    if let Some(caption) = caption {
                        let text = ChatCompletionRequestMessageContentPartTextArgs::default()
                            .text(caption.as_str())
                            .build()
                            .map_err(|e| self.err(e))?;
                        parts.push(text.into());
                    }
                    let image_url = ImageUrlArgs::default()
                        .url(data_uri.as_str())
                        .detail(ImageDetail::Auto)
                        .build()
                        .map_err(|e| self.err(e))?;
                    let image = ChatCompletionRequestMessageContentPartImageArgs::default()
                        .image_url(image_url)
                        .build()
                        .map_err(|e| self.err(e))?;
                    parts.push(image.into());
                    ChatCompletionRequestUserMessageContent::Array(parts)
                }
            };

            let message = ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()
                .map_err(|e| self.err(e))?;
            Ok(ChatCompletionRequestMessage::User(message))
        }

        async fn first_message(
            &self,
            request: CreateChatCompletionRequest,
        ) -> Result<(ChatCompletionResponseMessage, String, Option<TokenUsage>), ExtractError> {
            let response = self.client.create(request).await.map_err(|e| self.err(e))?;

            let usage = response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });
            if let Some(usage) = &usage {
                debug!(
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Model usage"
                );
            }

            let choice = response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| self.err("Response contained no choices"))?;

            Ok((choice.message, response.model, usage))
        }
    }

    #[async_trait]
    impl LLMProvider for OpenAIProvider {
        fn name(&self) -> &str {
            "openai"
        }

        #[instrument(
            level = "debug",
            skip_all,
            fields(model = %self.model, schema = %request.schema.name)
        )]
        async fn generate(
            &self,
            request: &CompletionRequest,
        ) -> Result<ModelResponse, ExtractError> {
            let response_format = ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: request.schema.description.clone(),
                    name: request.schema.name.clone(),
                    schema: Some(request.schema.to_json_schema()),
                    strict: Some(true),
                },
            };

            let chat_request = CreateChatCompletionRequestArgs::default()
                .model(&self.model)
                .messages(vec![
                    self.system_message(&request.system)?,
                    self.user_message(&request.content)?,
                ])
                .response_format(response_format)
                .build()
                .map_err(|e| self.err(e))?;

            let (message, model, usage) = self.first_message(chat_request).await?;

            if let Some(refusal) = message.refusal {
                warn!(refusal = %refusal, "Model refused structured extraction");
                return Err(ExtractError::Refusal(refusal));
            }

            let content = message
                .content
                .ok_or_else(|| self.err("Response message had no content"))?;
            let value = parse_json_content(&content)?;

            Ok(ModelResponse { value, model, usage })
        }

        #[instrument(level = "debug", skip_all, fields(model = %self.model))]
        async fn select_tool(&self, request: &ToolRequest) -> Result<ToolCall, ExtractError> {
            let mut tools = Vec::with_capacity(request.tools.len());
            for signature in &request.tools {
                let mut function = FunctionObjectArgs::default();
                function
                    .name(signature.name.as_str())
                    .parameters(signature.parameters.to_json_schema());
                if let Some(description) = &signature.description {
                    function.description(description.as_str());
                }
                let function = function.build().map_err(|e| self.err(e))?;

                let tool = ChatCompletionToolArgs::default()
                    .r#type(ChatCompletionToolType::Function)
                    .function(function)
                    .build()
                    .map_err(|e| self.err(e))?;
                tools.push(tool);
            }

            let instruction = SourceContent::Text(request.instruction.clone());
            let chat_request = CreateChatCompletionRequestArgs::default()
                .model(&self.model)
                .messages(vec![
                    self.system_message(&request.system)?,
                    self.user_message(&instruction)?,
                ])
                .tools(tools)
                .tool_choice(ChatCompletionToolChoiceOption::Required)
                .build()
                .map_err(|e| self.err(e))?;

            let (message, _, _) = self.first_message(chat_request).await?;

            let tool_call = message
                .tool_calls
                .and_then(|calls| calls.into_iter().next())
                .ok_or_else(|| self.err("No tool call in response"))?;

            let arguments = parse_json_content(&tool_call.function.arguments)?;
            Ok(ToolCall::new(tool_call.function.name, arguments))
        }
    }
}
