//! Ready-made pipelines: acquire content, then extract a record from it.
//!
//! Acquisition always finishes before the model is called, so any fetch or
//! parse failure returns without spending a completion.

use crate::document::load_document;
use crate::extractor::PageExtractor;
use crate::fetcher::Fetcher;
use crate::github_types::{GitHubIssue, IssueRef};
use crate::llm_extractor::{ExtractionResult, LLMExtractor, Stage};
use crate::records::{
    BlogPost, DocumentAction, Graph, HackSubmission, PlantInventory, Receipt, RepoOverview,
};
use crate::schema::Schema;
use crate::source::{load_image_data_uri, mime_type_for, SourceContent};
use crate::ExtractError;
use serde_json::Value;
use std::path::Path;
use tracing::{info, instrument};

pub const HACK_SUBMISSION_PROMPT: &str =
    "Extract the info from the GitHub issue markdown about this hack submission.";
pub const REPO_OVERVIEW_PROMPT: &str =
    "Extract the information from the GitHub repository README about this project.";
pub const BLOG_POST_PROMPT: &str = "Extract the information from the blog post";
pub const RECEIPT_PROMPT: &str = "Extract the information from the receipt";
pub const GRAPH_PROMPT: &str = "Extract the information from the graph";
pub const TABLE_PROMPT: &str = "Extract the information from the table";
pub const DOCUMENT_ACTION_PROMPT: &str =
    "Decide whether to do a search of our documents or whether to summarize a document";
pub const CUSTOM_PROMPT: &str = "Extract the information from the provided content";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Fetches a GitHub issue without involving the model.
pub async fn fetch_issue(fetcher: &Fetcher, issue: &IssueRef) -> Result<GitHubIssue, ExtractError> {
    info!(
        stage = %Stage::Acquiring,
        owner = %issue.owner,
        repo = %issue.repo,
        number = issue.number,
        "Fetching issue"
    );
    fetcher.fetch_github_issue(issue).await
}

#[instrument(
    level = "info",
    skip_all,
    fields(owner = %issue.owner, repo = %issue.repo, number = issue.number)
)]
pub async fn hack_submission_from_issue(
    fetcher: &Fetcher,
    extractor: &LLMExtractor,
    issue: &IssueRef,
) -> Result<ExtractionResult<HackSubmission>, ExtractError> {
    let issue = fetch_issue(fetcher, issue).await?;
    let body = issue
        .body
        .filter(|body| !body.trim().is_empty())
        .ok_or_else(|| ExtractError::MissingElement("issue body".to_string()))?;
    extractor
        .extract(HACK_SUBMISSION_PROMPT, SourceContent::text(body))
        .await
}

#[instrument(level = "info", skip_all, fields(owner = %owner, repo = %repo))]
pub async fn repo_overview_from_readme(
    fetcher: &Fetcher,
    extractor: &LLMExtractor,
    owner: &str,
    repo: &str,
) -> Result<ExtractionResult<RepoOverview>, ExtractError> {
    info!(stage = %Stage::Acquiring, "Fetching README");
    let readme = fetcher.fetch_github_readme(owner, repo).await?;
    extractor
        .extract(REPO_OVERVIEW_PROMPT, SourceContent::text(readme))
        .await
}

/// Extracts a blog post using the default Blogger markers.
pub async fn blog_post_from_page(
    fetcher: &Fetcher,
    extractor: &LLMExtractor,
    url: &str,
) -> Result<ExtractionResult<BlogPost>, ExtractError> {
    blog_post_with(fetcher, extractor, url, &PageExtractor::blogger()).await
}

#[instrument(level = "info", skip_all, fields(url = %url))]
pub async fn blog_post_with(
    fetcher: &Fetcher,
    extractor: &LLMExtractor,
    url: &str,
    page: &PageExtractor,
) -> Result<ExtractionResult<BlogPost>, ExtractError> {
    info!(stage = %Stage::Acquiring, "Fetching web page");
    let html = fetcher.fetch_html(url).await?;
    let text = page.extract(&html)?;
    extractor
        .extract(BLOG_POST_PROMPT, SourceContent::text(text.to_prompt()))
        .await
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn receipt_from_document(
    extractor: &LLMExtractor,
    path: &Path,
) -> Result<ExtractionResult<Receipt>, ExtractError> {
    info!(stage = %Stage::Acquiring, "Loading document");
    let markdown = load_document(path).await?;
    extractor
        .extract(RECEIPT_PROMPT, SourceContent::text(markdown))
        .await
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn graph_from_image(
    extractor: &LLMExtractor,
    path: &Path,
) -> Result<ExtractionResult<Graph>, ExtractError> {
    info!(stage = %Stage::Acquiring, "Loading image");
    let data_uri = load_image_data_uri(path).await?;
    extractor
        .extract(GRAPH_PROMPT, SourceContent::image(data_uri))
        .await
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn plant_inventory_from_image(
    extractor: &LLMExtractor,
    path: &Path,
) -> Result<ExtractionResult<PlantInventory>, ExtractError> {
    info!(stage = %Stage::Acquiring, "Loading image");
    let data_uri = load_image_data_uri(path).await?;
    extractor
        .extract(TABLE_PROMPT, SourceContent::image(data_uri))
        .await
}

pub async fn choose_document_action(
    extractor: &LLMExtractor,
    instruction: &str,
) -> Result<DocumentAction, ExtractError> {
    extractor.choose(DOCUMENT_ACTION_PROMPT, instruction).await
}

/// Reads a [`Schema`] from a JSON file.
pub async fn load_schema(path: &Path) -> Result<Schema, ExtractError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let schema: Schema = serde_json::from_str(&raw).map_err(|e| {
        ExtractError::ConfigError(format!("Invalid schema file {}: {e}", path.display()))
    })?;
    schema.check_definition().map_err(|msg| {
        ExtractError::ConfigError(format!("Invalid schema file {}: {msg}", path.display()))
    })?;
    Ok(schema)
}

/// Images become image content; anything else goes through [`load_document`].
pub async fn load_source(path: &Path) -> Result<SourceContent, ExtractError> {
    let is_image = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false);

    if is_image {
        info!(mime = mime_type_for(path), "Loading input as image");
        Ok(SourceContent::image(load_image_data_uri(path).await?))
    } else {
        Ok(SourceContent::text(load_document(path).await?))
    }
}

/// Extracts an instance of a schema loaded at runtime.
#[instrument(
    level = "info",
    skip_all,
    fields(schema = %schema_path.display(), input = %input.display())
)]
pub async fn custom_extraction(
    extractor: &LLMExtractor,
    schema_path: &Path,
    input: &Path,
    system: Option<&str>,
) -> Result<(Schema, ExtractionResult<Value>), ExtractError> {
    info!(stage = %Stage::Acquiring, "Loading schema and input");
    let schema = load_schema(schema_path).await?;
    let source = load_source(input).await?;
    let result = extractor
        .extract_value(&schema, system.unwrap_or(CUSTOM_PROMPT), source)
        .await?;
    Ok((schema, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_providers::MockProvider;
    use serde_json::json;
    use std::sync::Arc;

    fn extractor(provider: MockProvider) -> (Arc<MockProvider>, LLMExtractor) {
        let provider = Arc::new(provider);
        let extractor = LLMExtractor::new(provider.clone());
        (provider, extractor)
    }

    #[tokio::test]
    async fn test_receipt_from_text_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.md");
        std::fs::write(&path, "# Order 1001\nWidget x1 $37.50\nShipping $5.00").unwrap();

        let (provider, extractor) = extractor(MockProvider::new().with_response(
            "Receipt",
            json!({
                "total": 42.5,
                "shipping": 5.0,
                "payment_method": "credit_card",
                "items": [{"product": "Widget", "price": 37.5, "quantity": 1}],
                "order_number": 1001
            }),
        ));

        let result = receipt_from_document(&extractor, &path).await.unwrap();
        assert_eq!(result.data.order_number, 1001);
        assert_eq!(result.data.items.len(), 1);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_document_skips_model() {
        let (provider, extractor) = extractor(MockProvider::new());
        let err = receipt_from_document(&extractor, Path::new("receipt.docx"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedDocument(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_image_skips_model() {
        let (provider, extractor) = extractor(MockProvider::new());
        let err = graph_from_image(&extractor, Path::new("does-not-exist.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_custom_extraction_from_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("contact.json");
        std::fs::write(
            &schema_path,
            r#"{
                "name": "Contact",
                "fields": [
                    {"name": "email", "type": "string"},
                    {"name": "tier", "type": "enum", "values": ["free", "pro"]}
                ]
            }"#,
        )
        .unwrap();
        let input = dir.path().join("note.txt");
        std::fs::write(&input, "Reach me at a@example.com, I'm on the pro plan").unwrap();

        let (_, extractor) = extractor(MockProvider::new().with_response(
            "Contact",
            json!({"email": "a@example.com", "tier": "pro"}),
        ));

        let (schema, result) = custom_extraction(&extractor, &schema_path, &input, None)
            .await
            .unwrap();
        assert_eq!(schema.name, "Contact");
        assert_eq!(result.data["tier"], "pro");
    }

    #[tokio::test]
    async fn test_empty_schema_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("empty.json");
        std::fs::write(&schema_path, r#"{"name": "Empty", "fields": []}"#).unwrap();

        let err = load_schema(&schema_path).await.unwrap_err();
        assert!(matches!(err, ExtractError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_malformed_schema_definitions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            (
                "empty_enum.json",
                r#"{"name": "Contact", "fields": [
                    {"name": "tier", "type": "enum", "values": []}
                ]}"#,
                "enum with no values",
            ),
            (
                "duplicate.json",
                r#"{"name": "Contact", "fields": [
                    {"name": "email", "type": "string"},
                    {"name": "email", "type": "string"}
                ]}"#,
                "more than once",
            ),
            (
                "spaced_name.json",
                r#"{"name": "Contact Info", "fields": [{"name": "email", "type": "string"}]}"#,
                "[a-zA-Z0-9_-]",
            ),
        ];

        for (file, body, expected) in cases {
            let schema_path = dir.path().join(file);
            std::fs::write(&schema_path, body).unwrap();

            let err = load_schema(&schema_path).await.unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::Configuration, "{file}");
            assert!(err.to_string().contains(expected), "{file}: {err}");
        }
    }
}
