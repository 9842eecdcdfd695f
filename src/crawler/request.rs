use url::Url;

/// What a fetched page is, and which parent it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTag {
    /// A main listing page carrying top-level category links
    Main,

    /// A category page listing the subcategories of one parent
    Category {
        parent_name: String,
        parent_code: String,
    },
}

/// One unit of crawl work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub url: Url,
    pub tag: RequestTag,
    /// Number of attempts already made for this request
    pub retry_count: u32,
}

impl CrawlRequest {
    pub fn new(url: Url, tag: RequestTag) -> Self {
        Self {
            url,
            tag,
            retry_count: 0,
        }
    }

    pub fn main(url: Url) -> Self {
        Self::new(url, RequestTag::Main)
    }

    pub fn category(url: Url, parent_name: &str, parent_code: &str) -> Self {
        Self::new(
            url,
            RequestTag::Category {
                parent_name: parent_name.to_string(),
                parent_code: parent_code.to_string(),
            },
        )
    }

    /// The same request, one attempt later
    pub fn retry(&self) -> Self {
        Self {
            url: self.url.clone(),
            tag: self.tag.clone(),
            retry_count: self.retry_count + 1,
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self.tag, RequestTag::Main)
    }
}
