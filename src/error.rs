use crate::schema::ValidationError;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Failed to fetch content: {0}")]
    FetchError(String),

    #[error("Request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Expected element not found: {0}")]
    MissingElement(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("Document conversion failed: {0}")]
    DocumentError(String),

    #[error("External service error: {service} - {message}")]
    ExternalServiceError { service: String, message: String },

    #[error("Model refused the request: {0}")]
    Refusal(String),

    #[error("Failed to parse model response: {0}")]
    ParseError(String),

    #[error("Response failed validation: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Model selected an undeclared tool: {0}")]
    UnknownTool(String),
}

/// Where in a pipeline run an error stops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Acquisition,
    Invocation,
    Validation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            ErrorKind::Configuration => "CONFIGURATION_FAILED",
            ErrorKind::Acquisition => "ACQUISITION_FAILED",
            ErrorKind::Invocation => "INVOCATION_FAILED",
            ErrorKind::Validation => "VALIDATION_FAILED",
        };
        f.write_str(state)
    }
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::ConfigError(_) => ErrorKind::Configuration,
            ExtractError::UrlParseError(_)
            | ExtractError::FetchError(_)
            | ExtractError::HttpStatus { .. }
            | ExtractError::InvalidSelector(_)
            | ExtractError::MissingElement(_)
            | ExtractError::Io { .. }
            | ExtractError::UnsupportedDocument(_)
            | ExtractError::DocumentError(_) => ErrorKind::Acquisition,
            ExtractError::ExternalServiceError { .. } | ExtractError::Refusal(_) => {
                ErrorKind::Invocation
            }
            ExtractError::ParseError(_)
            | ExtractError::ValidationError(_)
            | ExtractError::UnknownTool(_) => ErrorKind::Validation,
        }
    }

    pub(crate) fn service(service: &str, message: impl ToString) -> Self {
        ExtractError::ExternalServiceError {
            service: service.to_string(),
            message: message.to_string(),
        }
    }

    pub fn log(&self) {
        match self {
            ExtractError::ConfigError(e) => {
                error!(error = %e, "Configuration is incomplete");
            }
            ExtractError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            ExtractError::FetchError(e) => {
                error!(error = %e, "Content fetch failed");
            }
            ExtractError::HttpStatus { url, status } => {
                error!(url = %url, status = status, "Remote resource returned an error status");
            }
            ExtractError::InvalidSelector(e) => {
                warn!(error = %e, "Selector could not be parsed");
            }
            ExtractError::MissingElement(e) => {
                error!(element = %e, "Expected element absent from page");
            }
            ExtractError::Io { path, source } => {
                error!(path = %path.display(), error = %source, "File read failed");
            }
            ExtractError::UnsupportedDocument(e) => {
                warn!(document = %e, "Unsupported document type");
            }
            ExtractError::DocumentError(e) => {
                error!(error = %e, "Document conversion failed");
            }
            ExtractError::ExternalServiceError { service, message } => {
                error!(
                    service = %service,
                    error = %message,
                    "External service error occurred"
                );
            }
            ExtractError::Refusal(e) => {
                warn!(refusal = %e, "Model refused to answer");
            }
            ExtractError::ParseError(e) => {
                error!(error = %e, "Model response could not be parsed");
            }
            ExtractError::ValidationError(e) => {
                error!(path = %e.path, violation = %e.kind, "Model response failed validation");
            }
            ExtractError::UnknownTool(name) => {
                error!(tool = %name, "Model selected an undeclared tool");
            }
        }
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(e: serde_json::Error) -> Self {
        ExtractError::ParseError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, Schema};
    use serde_json::json;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ExtractError::ConfigError("GITHUB_TOKEN".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ExtractError::HttpStatus {
                url: "https://api.github.com".into(),
                status: 404
            }
            .kind(),
            ErrorKind::Acquisition
        );
        assert_eq!(
            ExtractError::service("OpenAI", "connection reset").kind(),
            ErrorKind::Invocation
        );
        assert_eq!(
            ExtractError::UnknownTool("DeleteEverything".into()).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_validation_error_message() {
        let schema = Schema::new("Post").field("title", FieldType::String);
        let err: ExtractError = schema.validate(&json!({})).unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "Response failed validation: $.title: required field is missing"
        );
    }

    #[test]
    fn test_status_message() {
        let err = ExtractError::HttpStatus {
            url: "https://example.com/page".into(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "Request to https://example.com/page failed with status 503"
        );
    }
}
