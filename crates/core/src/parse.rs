//! HTML parsing and CSS-selector queries.
//!
//! This module provides the [`Document`] and [`Element`] types used by the
//! detector to locate body containers and by list sources to read list pages.
//!
//! # Example
//!
//! ```rust
//! use syndic_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1>Title</h1>
//!             <p class="content">Paragraph</p>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html);
//! let paragraphs = doc.select("p.content").unwrap();
//! assert_eq!(paragraphs[0].text(), "Paragraph");
//! ```

use scraper::{Html, Selector};

use crate::{Result, SyndicError};

fn selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| SyndicError::HtmlParseError(format!("Invalid selector: {}", e)))
}

/// Represents a parsed HTML document or fragment.
///
/// # Example
///
/// ```rust
/// use syndic_core::parse::Document;
///
/// let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
/// let doc = Document::parse(html);
/// let title = doc.select_first("title").unwrap().map(|el| el.text());
/// assert_eq!(title.as_deref(), Some("Test"));
/// assert_eq!(doc.select("p").unwrap().len(), 1);
/// ```
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a full HTML document.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Parses an HTML fragment, such as a decoded article body.
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html) }
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`SyndicError::HtmlParseError`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use syndic_core::parse::Document;
    ///
    /// let html = r#"<p class="content">First</p><p class="content">Second</p>"#;
    /// let doc = Document::parse(html);
    /// let elements = doc.select("p.content").unwrap();
    /// assert_eq!(elements.len(), 2);
    /// ```
    pub fn select(&'_ self, selector_str: &str) -> Result<Vec<Element<'_>>> {
        let sel = selector(selector_str)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Selects the first element matching a CSS selector.
    pub fn select_first(&'_ self, selector_str: &str) -> Result<Option<Element<'_>>> {
        let sel = selector(selector_str)?;
        Ok(self.html.select(&sel).next().map(|el| Element { element: el }))
    }

    /// Gets all text content from the document.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }
}

/// A wrapper around scraper's ElementRef.
///
/// # Example
///
/// ```rust
/// use syndic_core::parse::Document;
///
/// let html = r#"<a href="https://example.com">Link text</a>"#;
/// let doc = Document::parse(html);
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.text(), "Link text");
/// assert_eq!(link.attr("href"), Some("https://example.com"));
/// ```
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the inner HTML of this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the trimmed text content, with inner whitespace runs collapsed.
    pub fn clean_text(&self) -> String {
        self.element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`SyndicError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector_str: &str) -> Result<Vec<Element<'_>>> {
        let sel = selector(selector_str)?;
        Ok(self.element.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Selects the first descendant matching a CSS selector.
    pub fn select_first(&'_ self, selector_str: &str) -> Result<Option<Element<'_>>> {
        let sel = selector(selector_str)?;
        Ok(self.element.select(&sel).next().map(|el| Element { element: el }))
    }
}
