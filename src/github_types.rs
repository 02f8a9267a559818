use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::ExtractError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubIssue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub html_url: String,
    pub user: GitHubUser,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
}

/// A file entry from the repository contents API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubContent {
    pub name: String,
    pub path: String,
    pub content: String,
    pub encoding: String,
}

impl GitHubContent {
    /// Decodes the file body. GitHub wraps base64 payloads at 60 columns.
    pub fn decode(&self) -> Result<String, ExtractError> {
        if self.encoding != "base64" {
            return Err(ExtractError::FetchError(format!(
                "Unexpected content encoding for {}: {}",
                self.path, self.encoding
            )));
        }

        let compact: String = self
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = STANDARD.decode(compact).map_err(|e| {
            ExtractError::FetchError(format!("Invalid base64 in {}: {}", self.path, e))
        })?;
        String::from_utf8(bytes)
            .map_err(|e| ExtractError::FetchError(format!("{} is not UTF-8: {}", self.path, e)))
    }
}

/// Identifies one issue in a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl IssueRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }
}
