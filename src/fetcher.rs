use crate::github_types::{GitHubContent, GitHubIssue, IssueRef};
use crate::ExtractError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use url::Url;

pub const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    github_api_base: String,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        debug!("Fetcher initialized with default configuration");
        Self::new_with_config(FetcherConfig::default()).unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to a default HTTP client");
            Self::with_client(Client::new())
        })
    }

    /// Creates a Fetcher with custom configuration
    pub fn new_with_config(config: FetcherConfig) -> Result<Self, ExtractError> {
        let mut client_builder = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout);

        if let Some(headers) = config.headers {
            client_builder = client_builder.default_headers(headers);
        }

        if let Some(redirect_policy) = config.redirect_policy {
            client_builder = client_builder.redirect(redirect_policy);
        }

        let client = client_builder.build().map_err(|e| {
            error!(error = %e, "Failed to create HTTP client");
            ExtractError::ConfigError(format!("Failed to initialize HTTP client: {}", e))
        })?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            github_api_base: GITHUB_API_BASE.to_string(),
        }
    }

    /// Points GitHub requests at another API root, e.g. an Enterprise host.
    pub fn with_github_api_base(mut self, base: impl Into<String>) -> Self {
        self.github_api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetches a web page and returns its body. Any non-2xx status ends the
    /// run; there is no retry.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_html(&self, url: &str) -> Result<String, ExtractError> {
        let _ = Url::parse(url)?;
        debug!(url = %url, "Fetching web page");

        let content = self.get_checked(url).await?.text().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to read response body");
            ExtractError::FetchError(e.to_string())
        })?;

        debug!(url = %url, content_length = content.len(), "Successfully fetched webpage");
        Ok(content)
    }

    async fn get_checked(&self, url: &str) -> Result<Response, ExtractError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to send request");
            ExtractError::FetchError(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Request returned non-success status");
            return Err(ExtractError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

// for GitHub
impl Fetcher {
    /// GitHub client authenticated with `GITHUB_TOKEN` when it is set and
    /// non-empty.
    pub fn new_github_client() -> Result<Self, ExtractError> {
        let token = std::env::var("GITHUB_TOKEN").ok();
        Self::github_client_with_token(token.as_deref())
    }

    pub fn github_client_with_token(token: Option<&str>) -> Result<Self, ExtractError> {
        debug!("Creating GitHub-specific client");

        Self::new_with_config(FetcherConfig {
            user_agent: "structured_extract/1.0".to_string(),
            headers: Some(github_headers(token)),
            ..FetcherConfig::default()
        })
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_github_issue(&self, issue: &IssueRef) -> Result<GitHubIssue, ExtractError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}",
            self.github_api_base, issue.owner, issue.repo, issue.number
        );
        debug!(url = %url, "Fetching GitHub issue");

        self.get_checked(&url)
            .await?
            .json::<GitHubIssue>()
            .await
            .map_err(|e| ExtractError::FetchError(format!("Failed to parse GitHub issue: {}", e)))
    }

    /// Fetches and decodes `README.md` from the default branch.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_github_readme(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<String, ExtractError> {
        let url = format!(
            "{}/repos/{}/{}/contents/README.md",
            self.github_api_base, owner, repo
        );
        debug!(url = %url, "Fetching GitHub README");

        let content = self
            .get_checked(&url)
            .await?
            .json::<GitHubContent>()
            .await
            .map_err(|e| {
                ExtractError::FetchError(format!("Failed to parse GitHub contents response: {}", e))
            })?;

        content.decode()
    }
}

/// Blank tokens are treated as absent so public resources stay reachable.
fn github_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github.v3+json"),
    );

    if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
        debug!("Found GitHub token in environment");
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "Ignoring malformed GITHUB_TOKEN"),
        }
    }

    headers
}

/// Settings for the underlying HTTP client.
///
/// # Examples
/// ```ignore
/// let fetcher = Fetcher::new_with_config(FetcherConfig {
///     user_agent: "my-custom-agent/1.0".to_string(),
///     timeout: Duration::from_secs(20),
///     ..Default::default()
/// })?;
/// ```
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: Option<HeaderMap>,
    pub redirect_policy: Option<reqwest::redirect::Policy>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "structured_extract/0.1.0".to_string(),
            timeout: Duration::from_secs(30),
            headers: None,
            redirect_policy: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_api_base_is_normalized() {
        let fetcher = Fetcher::new().with_github_api_base("http://127.0.0.1:8080/");
        assert_eq!(fetcher.github_api_base, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_blank_github_token_sends_no_authorization() {
        for token in [None, Some(""), Some("   ")] {
            let headers = github_headers(token);
            assert!(headers.get(AUTHORIZATION).is_none(), "token {:?}", token);
            assert_eq!(
                headers.get(ACCEPT).unwrap(),
                "application/vnd.github.v3+json"
            );
        }
    }

    #[test]
    fn test_github_token_becomes_bearer_header() {
        let headers = github_headers(Some(" ghp_example\n"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer ghp_example");
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_request() {
        let fetcher = Fetcher::new();
        let err = fetcher.fetch_html("not-a-valid-url").await.unwrap_err();
        assert!(matches!(err, ExtractError::UrlParseError(_)));
    }
}
