use crate::ExtractError;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Identifies an element by tag name and, optionally, one of its classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSelector {
    pub tag: String,
    pub class: Option<String>,
}

impl PageSelector {
    pub fn new(tag: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            class: Some(class.into()),
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            class: None,
        }
    }

    fn compile(&self) -> Result<Selector, ExtractError> {
        let css = self.to_string();
        Selector::parse(&css).map_err(|e| ExtractError::InvalidSelector(format!("{css}: {e:?}")))
    }
}

impl fmt::Display for PageSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class {
            Some(class) => write!(f, "{}.{}", self.tag, class),
            None => write!(f, "{}", self.tag),
        }
    }
}

/// Title and body text pulled out of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub title: String,
    pub body: String,
}

impl PageText {
    /// The text handed to the model: title line, then body.
    pub fn to_prompt(&self) -> String {
        format!("{}\n{}", self.title, self.body)
    }
}

/// Extracts tag-scoped plain text from HTML documents.
#[derive(Clone, Debug)]
pub struct PageExtractor {
    title: PageSelector,
    body: PageSelector,
}

impl Default for PageExtractor {
    fn default() -> Self {
        Self::blogger()
    }
}

impl PageExtractor {
    pub fn new(title: PageSelector, body: PageSelector) -> Self {
        Self { title, body }
    }

    /// Selectors for Blogger-hosted posts.
    pub fn blogger() -> Self {
        Self::new(
            PageSelector::new("h3", "post-title"),
            PageSelector::new("div", "post-body"),
        )
    }

    pub fn extract(&self, html: &str) -> Result<PageText, ExtractError> {
        let document = Html::parse_document(html);

        let title = self.first_text(&document, &self.title)?;
        let body = self.first_text(&document, &self.body)?;

        debug!(
            title_length = title.len(),
            body_length = body.len(),
            "Extracted page text"
        );
        Ok(PageText { title, body })
    }

    fn first_text(&self, document: &Html, selector: &PageSelector) -> Result<String, ExtractError> {
        let compiled = selector.compile()?;
        document
            .select(&compiled)
            .next()
            .map(element_text)
            .ok_or_else(|| ExtractError::MissingElement(selector.to_string()))
    }
}

/// Joins the element's text nodes, trimming each and dropping empty ones.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = r#"
        <html><body>
          <h3 class="post-title entry-title">
            Integrating vision into RAG applications
          </h3>
          <div class="post-header">Posted by someone</div>
          <div class="post-body entry-content">
            <p>Retrieval augmented generation is a common pattern.</p>
            <p>  Multimodal models can  read <b>images</b> too. </p>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_blogger_post() {
        let page = PageExtractor::blogger().extract(POST).unwrap();
        assert_eq!(page.title, "Integrating vision into RAG applications");
        assert_eq!(
            page.body,
            "Retrieval augmented generation is a common pattern. \
             Multimodal models can  read images too."
        );
        assert!(page.to_prompt().starts_with("Integrating vision"));
    }

    #[test]
    fn test_missing_body_is_an_error() {
        let html = r#"<h3 class="post-title">Title only</h3>"#;
        let err = PageExtractor::blogger().extract(html).unwrap_err();
        match err {
            ExtractError::MissingElement(sel) => assert_eq!(sel, "div.post-body"),
            e => panic!("Expected MissingElement, got: {:?}", e),
        }
    }

    #[test]
    fn test_class_must_match() {
        let html = r#"<h3 class="title">A</h3><div class="post-body">B</div>"#;
        assert!(PageExtractor::blogger().extract(html).is_err());
    }

    #[test]
    fn test_tag_only_selector() {
        let extractor = PageExtractor::new(PageSelector::tag("h1"), PageSelector::tag("article"));
        let page = extractor
            .extract("<h1>Hello</h1><article>World</article>")
            .unwrap();
        assert_eq!(page.to_prompt(), "Hello\nWorld");
    }

    #[test]
    fn test_invalid_selector() {
        let extractor = PageExtractor::new(PageSelector::new("h3", "1bad"), PageSelector::tag("p"));
        let err = extractor.extract("<p>x</p>").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidSelector(_)));
    }
}
