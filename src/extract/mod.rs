//! Record extraction from parsed pages
//!
//! Extraction is a pure function of page content: no network, no state.
//! The dispatcher depends only on the [`Extractor`] capability; the concrete
//! implementation is injected when the orchestrator is built.

mod code;
mod selector;

pub use code::{infer_code, slug_name, FALLBACK_CODE};
pub use selector::SelectorExtractor;

use crate::records::{RawCategory, RawSubcategory};
use scraper::Html;
use thiserror::Error;
use url::Url;

/// Errors raised by an extractor for a whole page
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Missing expected page structure: {0}")]
    MissingStructure(String),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// A fetched page, parsed into a document
pub struct Page {
    pub url: Url,
    pub document: Html,
}

impl Page {
    /// Parses an HTML body delivered for `url`
    pub fn parse(url: Url, body: &str) -> Self {
        Self {
            url,
            document: Html::parse_document(body),
        }
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page").field("url", &self.url.as_str()).finish()
    }
}

/// Per-site extraction capability
pub trait Extractor {
    /// Categories linked from a main listing page
    fn extract_categories(&self, page: &Page) -> Result<Vec<RawCategory>, ExtractError>;

    /// Subcategories listed on a category page
    ///
    /// An empty list is a valid outcome.
    fn extract_subcategories(
        &self,
        page: &Page,
        parent_name: &str,
        parent_code: &str,
    ) -> Result<Vec<RawSubcategory>, ExtractError>;

    /// Next page of a paginated main listing, if any
    fn next_page(&self, _page: &Page) -> Option<Url> {
        None
    }
}
