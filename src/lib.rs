//! Schema-constrained extraction of structured records from GitHub issues,
//! READMEs, web pages, documents and images.
//!
//! A run acquires one [`SourceContent`], asks a hosted model for an instance
//! of a [`Schema`] and validates the answer before returning it:
//!
//! ```no_run
//! use std::sync::Arc;
//! use structured_extract::{scenarios, ClientConfig, Fetcher, IssueRef, LLMExtractor};
//!
//! # async fn run() -> Result<(), structured_extract::ExtractError> {
//! let provider = ClientConfig::from_env()?.into_provider();
//! let extractor = LLMExtractor::new(Arc::new(provider));
//! let fetcher = Fetcher::new_github_client()?;
//!
//! let issue = IssueRef::new("microsoft", "RAG_Hack", 159);
//! let submission = scenarios::hack_submission_from_issue(&fetcher, &extractor, &issue).await?;
//! println!("{}", submission.data.name);
//! # Ok(())
//! # }
//! ```

mod document;
mod error;
mod extractor;
mod fetcher;
mod github_types;
mod llm_config;
mod llm_extractor;
mod llm_providers;
mod logging;
mod schema;
mod source;
mod tools;
mod utils;

pub mod records;
pub mod scenarios;

pub use document::{load_document, pages_to_markdown, DocumentKind, PAGE_BREAK};
pub use error::{ErrorKind, ExtractError};
pub use extractor::{PageExtractor, PageSelector, PageText};
pub use fetcher::{Fetcher, FetcherConfig, GITHUB_API_BASE};
pub use github_types::{GitHubContent, GitHubIssue, GitHubLabel, GitHubUser, IssueRef};
pub use llm_config::{
    ApiKeyValidator, ClientConfig, ModelHost, AZURE_API_VERSION, GITHUB_MODELS_ENDPOINT,
};
pub use llm_extractor::{
    validate_response, CompletionRequest, Extractable, ExtractionResult, LLMExtractor,
    LLMExtractorConfig, LLMProvider, ModelResponse, Stage, TokenUsage,
};
pub use llm_providers::openai::OpenAIProvider;
pub use llm_providers::{parse_json_content, MockProvider};
pub use logging::{log_error_card, log_result_card, render_result};
#[cfg(feature = "logging")]
pub use logging::{setup_logging, LogConfig};
pub use schema::{Field, FieldType, Schema, ValidationError, ViolationKind};
pub use source::{encode_data_uri, load_image_data_uri, mime_type_for, SourceContent};
pub use tools::{ToolCall, ToolRequest, ToolSet, ToolSignature};
