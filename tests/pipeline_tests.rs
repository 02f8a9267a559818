use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use std::sync::{Arc, Mutex};
use structured_extract::records::{DocumentAction, Receipt};
use structured_extract::{
    scenarios, validate_response, ErrorKind, ExtractError, Extractable, Fetcher, IssueRef,
    LLMExtractor, MockProvider, ModelResponse, SourceContent, ToolCall,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves the same canned response to every request and returns the base URL.
async fn serve(status: u16, content_type: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = vec![0u8; 8192];
            let _ = socket.read(&mut request).await;

            let reason = match status {
                200 => "OK",
                404 => "Not Found",
                _ => "Error",
            };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\n\
                 Content-Type: {content_type}\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}")
}

/// Like [`serve`], but also records the raw request head of every request.
async fn serve_recording(body: String) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            recorded
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(&buf[..n]).to_string());

            let response = format!(
                "HTTP/1.1 200 OK\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}"), requests)
}

fn extractor(provider: MockProvider) -> (Arc<MockProvider>, LLMExtractor) {
    let provider = Arc::new(provider);
    (provider.clone(), LLMExtractor::new(provider))
}

const BLOG_HTML: &str = r#"<html><body>
  <h3 class="post-title entry-title">Integrating vision into RAG applications</h3>
  <div class="post-body entry-content">
    <p>RAG can search images.</p>
    <p>Use a multimodal model.</p>
  </div>
</body></html>"#;

#[tokio::test]
async fn test_http_error_never_reaches_model() {
    let base = serve(404, "text/html", "gone".to_string()).await;
    let (provider, extractor) = extractor(MockProvider::new());

    let err = scenarios::blog_post_from_page(&Fetcher::new(), &extractor, &format!("{base}/post"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::HttpStatus { status: 404, .. }));
    assert_eq!(err.kind(), ErrorKind::Acquisition);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_missing_page_markers_never_reach_model() {
    let page = "<html><body><h1>Hi</h1></body></html>".to_string();
    let base = serve(200, "text/html", page).await;
    let (provider, extractor) = extractor(MockProvider::new());

    let err = scenarios::blog_post_from_page(&Fetcher::new(), &extractor, &base)
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::MissingElement(ref s) if s == "h3.post-title"));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_invalid_url_never_reaches_model() {
    let (provider, extractor) = extractor(MockProvider::new());

    let err = scenarios::blog_post_from_page(&Fetcher::new(), &extractor, "not a url")
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::UrlParseError(_)));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_blog_post_sends_title_and_body() {
    let base = serve(200, "text/html; charset=utf-8", BLOG_HTML.to_string()).await;
    let (provider, extractor) = extractor(MockProvider::new().with_response(
        "BlogPost",
        json!({
            "title": "Integrating vision into RAG applications",
            "summary": "How to add images to RAG.",
            "tags": ["rag", "openai"]
        }),
    ));

    let result = scenarios::blog_post_from_page(&Fetcher::new(), &extractor, &base)
        .await
        .unwrap();

    assert_eq!(result.data.tags, vec!["rag", "openai"]);
    assert_eq!(
        provider.last_content(),
        Some(SourceContent::text(
            "Integrating vision into RAG applications\n\
             RAG can search images. Use a multimodal model."
        ))
    );
}

#[tokio::test]
async fn test_hack_submission_from_issue_body() {
    let issue = json!({
        "number": 159,
        "title": "Project: CareerCanvas",
        "body": "### Project Name\nCareerCanvas\n### Technologies\nPython, AI Search",
        "state": "open",
        "html_url": "https://github.com/microsoft/RAG_Hack/issues/159",
        "user": {"login": "shank250"},
        "labels": [{"name": "Submission"}]
    });
    let base = serve(200, "application/json", issue.to_string()).await;
    let fetcher = Fetcher::new().with_github_api_base(format!("{base}/"));

    let (provider, extractor) = extractor(MockProvider::new().with_response(
        "HackSubmission",
        json!({
            "name": "CareerCanvas",
            "description": "Builds tailored resumes.",
            "technologies": ["Python", "AI Search"],
            "repository_url": "https://github.com/shank250/CareerCanvas-msft-raghack",
            "video_url": "https://youtu.be/example",
            "team_members": ["shank250"]
        }),
    ));

    let result = scenarios::hack_submission_from_issue(
        &fetcher,
        &extractor,
        &IssueRef::new("microsoft", "RAG_Hack", 159),
    )
    .await
    .unwrap();

    assert_eq!(result.data.name, "CareerCanvas");
    assert_eq!(result.model, "mock");
    assert_eq!(
        provider.last_content(),
        Some(SourceContent::text(
            "### Project Name\nCareerCanvas\n### Technologies\nPython, AI Search"
        ))
    );
}

#[tokio::test]
async fn test_null_issue_body_never_reaches_model() {
    let issue = json!({
        "number": 160,
        "title": "Project: Untitled",
        "body": null,
        "state": "open",
        "html_url": "https://github.com/microsoft/RAG_Hack/issues/160",
        "user": {"login": "someone"},
        "labels": []
    });
    let base = serve(200, "application/json", issue.to_string()).await;
    let fetcher = Fetcher::new().with_github_api_base(format!("{base}/"));
    let (provider, extractor) = extractor(MockProvider::new());

    let err = scenarios::hack_submission_from_issue(
        &fetcher,
        &extractor,
        &IssueRef::new("microsoft", "RAG_Hack", 160),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ExtractError::MissingElement(ref s) if s == "issue body"));
    assert_eq!(err.kind(), ErrorKind::Acquisition);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_blank_github_token_sends_no_authorization() {
    let issue = json!({
        "number": 1,
        "title": "t",
        "body": "b",
        "state": "open",
        "html_url": "https://github.com/o/r/issues/1",
        "user": {"login": "u"},
        "labels": []
    });
    let (base, requests) = serve_recording(issue.to_string()).await;
    let fetcher = Fetcher::github_client_with_token(Some(""))
        .unwrap()
        .with_github_api_base(format!("{base}/"));

    scenarios::fetch_issue(&fetcher, &IssueRef::new("o", "r", 1))
        .await
        .unwrap();

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let head = requests[0].to_lowercase();
    assert!(head.contains("accept: application/vnd.github"), "{head}");
    assert!(!head.contains("authorization:"), "{head}");
}

#[tokio::test]
async fn test_readme_is_decoded_before_extraction() {
    let readme = "# CareerCanvas\n\nBuilt with Langchain and Azure AI Search.\n";
    let encoded = STANDARD.encode(readme);
    // GitHub wraps the payload
    let wrapped = encoded
        .as_bytes()
        .chunks(20)
        .map(|chunk| std::str::from_utf8(chunk).unwrap())
        .collect::<Vec<_>>()
        .join("\n");
    let body = json!({
        "name": "README.md",
        "path": "README.md",
        "content": wrapped,
        "encoding": "base64"
    });
    let base = serve(200, "application/json", body.to_string()).await;
    let fetcher = Fetcher::new().with_github_api_base(base);
    let (provider, extractor) = extractor(MockProvider::new());

    let result = scenarios::repo_overview_from_readme(
        &fetcher,
        &extractor,
        "shank250",
        "CareerCanvas-msft-raghack",
    )
    .await
    .unwrap();

    assert!(result.data.languages.is_empty());
    assert_eq!(provider.last_content(), Some(SourceContent::text(readme)));
}

#[tokio::test]
async fn test_receipt_missing_field_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("receipt.txt");
    std::fs::write(&path, "Order 1001: Widget $37.50, shipping $5.00").unwrap();

    let (provider, extractor) = extractor(MockProvider::new().with_response(
        "Receipt",
        json!({
            "total": 42.5,
            "shipping": 5.0,
            "payment_method": "credit_card",
            "items": [{"product": "Widget", "price": 37.5, "quantity": 1}]
        }),
    ));

    let err = scenarios::receipt_from_document(&extractor, &path)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(err, ExtractError::ValidationError(ref v) if v.path == "$.order_number"));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_valid_instance_passes_unchanged() {
    let value = json!({
        "total": 42.5,
        "shipping": 5.0,
        "payment_method": "credit_card",
        "items": [{"product": "Widget", "price": 37.5, "quantity": 1}],
        "order_number": 1001
    });
    let (_, extractor) = extractor(MockProvider::new().with_response("Receipt", value.clone()));

    let result = extractor
        .extract_value(&Receipt::schema(), "Extract the receipt", SourceContent::text("..."))
        .await
        .unwrap();

    assert_eq!(result.data, value);
}

#[test]
fn test_validation_is_idempotent() {
    let response = ModelResponse {
        value: json!({"total": "42.50"}),
        model: "gpt-4o".to_string(),
        usage: None,
    };

    let first = validate_response(&Receipt::schema(), response.clone()).unwrap_err();
    let second = validate_response(&Receipt::schema(), response).unwrap_err();

    assert_eq!(first.to_string(), second.to_string());
    assert!(matches!(first, ExtractError::ValidationError(ref v) if v.path == "$.total"));
}

#[tokio::test]
async fn test_tool_selection_search() {
    let (_, extractor) = extractor(
        MockProvider::new().with_tool_call(ToolCall::new("SearchDocuments", json!({"query": "X"}))),
    );

    let action = scenarios::choose_document_action(&extractor, "search our documents for X")
        .await
        .unwrap();

    assert_eq!(action, DocumentAction::SearchDocuments { query: "X".to_string() });
}

#[tokio::test]
async fn test_tool_selection_rejects_undeclared_tool() {
    let (_, extractor) = extractor(
        MockProvider::new().with_tool_call(ToolCall::new("DeleteDocuments", json!({"query": "X"}))),
    );

    let err = scenarios::choose_document_action(&extractor, "delete everything")
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::UnknownTool(ref name) if name == "DeleteDocuments"));
}

#[tokio::test]
async fn test_tool_selection_rejects_bad_arguments() {
    let (_, extractor) = extractor(
        MockProvider::new()
            .with_tool_call(ToolCall::new("SummarizeDocument", json!({"filename": 7}))),
    );

    let err = scenarios::choose_document_action(&extractor, "summarize the handbook")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
}
