//! LLM configuration and validation utilities
//!
//! Settings come from environment variables (optionally loaded from `.env`
//! by the CLI). `MODEL_HOST` picks the service:
//!
//! - `azure` (default): `AZURE_OPENAI_SERVICE`, `AZURE_OPENAI_GPT_DEPLOYMENT` and
//!   `AZURE_OPENAI_KEY` are required; `AZURE_OPENAI_API_VERSION` is optional.
//! - `github`: `GITHUB_TOKEN` is required; `GITHUB_MODEL` is optional.
//! - `openai`: `OPENAI_API_KEY` is required; `OPENAI_MODEL` and `OPENAI_BASE_URL`
//!   are optional.
//!
//! Only API-key authentication is supported. Keyless Azure credentials
//! (Entra ID or other bearer tokens from a credential chain) are not; an
//! Azure deployment without a key fails with a configuration error.

use crate::llm_providers::openai::OpenAIProvider;
use crate::ExtractError;
use async_openai::config::{AzureConfig, OpenAIConfig};
use std::str::FromStr;
use tracing::{debug, info};

pub const AZURE_API_VERSION: &str = "2024-08-01-preview";
pub const GITHUB_MODELS_ENDPOINT: &str = "https://models.inference.ai.azure.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelHost {
    Azure,
    GitHub,
    OpenAI,
}

impl FromStr for ModelHost {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "azure" => Ok(ModelHost::Azure),
            "github" => Ok(ModelHost::GitHub),
            "openai" => Ok(ModelHost::OpenAI),
            other => Err(ExtractError::ConfigError(format!(
                "Unknown MODEL_HOST '{}'. Expected one of: azure, github, openai",
                other
            ))),
        }
    }
}

/// API key validation utilities
pub struct ApiKeyValidator;

impl ApiKeyValidator {
    pub fn validate_key(variable: &str, api_key: &str) -> Result<(), ExtractError> {
        if api_key.trim().is_empty() {
            return Err(ExtractError::ConfigError(format!("{} cannot be empty", variable)));
        }

        if api_key.chars().any(char::is_whitespace) {
            return Err(ExtractError::ConfigError(format!(
                "{} must not contain whitespace",
                variable
            )));
        }

        Ok(())
    }
}

/// Everything needed to build a model client.
#[derive(Clone)]
pub struct ClientConfig {
    pub host: ModelHost,
    pub model: String,
    pub api_key: String,
    pub endpoint: Option<String>,
    pub api_version: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ExtractError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source. Empty values
    /// count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ExtractError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = match get("MODEL_HOST") {
            Some(value) => value.parse()?,
            None => ModelHost::Azure,
        };
        debug!(host = ?host, "Resolving model client configuration");

        let config = match host {
            ModelHost::Azure => {
                let missing: Vec<&str> = [
                    "AZURE_OPENAI_SERVICE",
                    "AZURE_OPENAI_GPT_DEPLOYMENT",
                    "AZURE_OPENAI_KEY",
                ]
                .into_iter()
                .filter(|key| get(*key).is_none())
                .collect();
                if !missing.is_empty() {
                    return Err(ExtractError::ConfigError(format!(
                        "{} environment variables are empty",
                        missing.join(", ")
                    )));
                }

                let service = get("AZURE_OPENAI_SERVICE").unwrap_or_default();
                Self {
                    host,
                    model: get("AZURE_OPENAI_GPT_DEPLOYMENT").unwrap_or_default(),
                    api_key: get("AZURE_OPENAI_KEY").unwrap_or_default(),
                    endpoint: Some(format!("https://{}.openai.azure.com", service)),
                    api_version: Some(
                        get("AZURE_OPENAI_API_VERSION")
                            .unwrap_or_else(|| AZURE_API_VERSION.to_string()),
                    ),
                }
            }
            ModelHost::GitHub => Self {
                host,
                model: get("GITHUB_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
                api_key: get("GITHUB_TOKEN").ok_or_else(|| {
                    ExtractError::ConfigError(
                        "GITHUB_TOKEN environment variable is empty".to_string(),
                    )
                })?,
                endpoint: Some(GITHUB_MODELS_ENDPOINT.to_string()),
                api_version: None,
            },
            ModelHost::OpenAI => Self {
                host,
                model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                api_key: get("OPENAI_API_KEY").ok_or_else(|| {
                    ExtractError::ConfigError(
                        "OPENAI_API_KEY environment variable is empty".to_string(),
                    )
                })?,
                endpoint: get("OPENAI_BASE_URL"),
                api_version: None,
            },
        };

        let key_name = match host {
            ModelHost::Azure => "AZURE_OPENAI_KEY",
            ModelHost::GitHub => "GITHUB_TOKEN",
            ModelHost::OpenAI => "OPENAI_API_KEY",
        };
        ApiKeyValidator::validate_key(key_name, &config.api_key)?;

        Ok(config)
    }

    pub fn into_provider(self) -> OpenAIProvider {
        info!(host = ?self.host, model = %self.model, "Using a hosted model");

        match self.host {
            ModelHost::Azure => {
                let api_version = self
                    .api_version
                    .unwrap_or_else(|| AZURE_API_VERSION.to_string());
                let mut config = AzureConfig::new()
                    .with_api_version(api_version)
                    .with_deployment_id(self.model.clone())
                    .with_api_key(self.api_key);
                if let Some(endpoint) = self.endpoint {
                    config = config.with_api_base(endpoint);
                }
                OpenAIProvider::from_azure_config(config, self.model)
            }
            ModelHost::GitHub => {
                let endpoint = self
                    .endpoint
                    .unwrap_or_else(|| GITHUB_MODELS_ENDPOINT.to_string());
                let config = OpenAIConfig::new()
                    .with_api_base(endpoint)
                    .with_api_key(self.api_key);
                OpenAIProvider::from_config(config, self.model).with_service_name("GitHub Models")
            }
            ModelHost::OpenAI => {
                let mut config = OpenAIConfig::new().with_api_key(self.api_key);
                if let Some(endpoint) = self.endpoint {
                    config = config.with_api_base(endpoint);
                }
                OpenAIProvider::from_config(config, self.model)
            }
        }
    }
}
