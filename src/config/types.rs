use serde::Deserialize;

/// Main configuration structure for Shelf-Mapper
///
/// Every section is optional; missing sections fall back to their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub extraction: ExtractionConfig,
    pub proxy: ProxyConfig,
    pub selectors: SelectorConfig,
}

impl Config {
    /// Seed URLs for the crawl: configured seeds, else the site base URL
    pub fn seed_urls(&self) -> Vec<String> {
        if self.site.seeds.is_empty() {
            vec![self.site.base_url.clone()]
        } else {
            self.site.seeds.clone()
        }
    }
}

/// The shop being mapped
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Recorded as the `source` of every extracted record
    pub name: String,

    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Main listing pages to start from
    pub seeds: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Thomann".to_string(),
            base_url: "https://www.thomann.de/de/index.html".to_string(),
            seeds: Vec::new(),
        }
    }
}

/// Crawl engine behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: u32,

    /// Maximum number of requests accepted during one run
    #[serde(rename = "max-requests-per-crawl")]
    pub max_requests_per_crawl: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Retries after the first attempt of a request
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Delay before a retried request is fetched again (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Skip derived category requests whose URL was already enqueued
    #[serde(rename = "dedupe-category-urls")]
    pub dedupe_category_urls: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            max_requests_per_crawl: 50,
            request_timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 500,
            dedupe_category_urls: false,
        }
    }
}

/// User agent identification
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "ShelfMapper".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/shelf-mapper".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Export file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite dataset database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory receiving exported datasets
    #[serde(rename = "export-dir")]
    pub export_dir: String,

    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./shelf-mapper.db".to_string(),
            export_dir: "./export".to_string(),
            format: OutputFormat::Json,
        }
    }
}

/// What the crawl extracts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Enqueue one category page per discovered category
    pub subcategories: bool,

    /// Assemble and export the category tree after the crawl
    #[serde(rename = "build-tree")]
    pub build_tree: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            subcategories: true,
            build_tree: false,
        }
    }
}

/// Proxy pool, used round-robin
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub urls: Vec<String>,
}

/// CSS selectors driving the selector extractor
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Top-level category links on a main page
    #[serde(rename = "category-link")]
    pub category_link: String,

    /// Containers grouping nested categories under a titled parent
    #[serde(rename = "category-group")]
    pub category_group: String,

    /// Title element inside a category group
    #[serde(rename = "category-group-title")]
    pub category_group_title: String,

    /// Links inside a category group
    #[serde(rename = "category-group-link")]
    pub category_group_link: String,

    /// Attribute carrying the site-provided category code
    #[serde(rename = "code-attribute")]
    pub code_attribute: String,

    /// Element carrying a product count, relative to the link
    #[serde(rename = "product-count")]
    pub product_count: String,

    /// Pagination link on a main page
    #[serde(rename = "next-page")]
    pub next_page: String,

    /// One subcategory tile on a category page
    #[serde(rename = "subcategory-item")]
    pub subcategory_item: String,

    #[serde(rename = "subcategory-name")]
    pub subcategory_name: String,

    #[serde(rename = "subcategory-link")]
    pub subcategory_link: String,

    #[serde(rename = "subcategory-image")]
    pub subcategory_image: String,

    #[serde(rename = "subcategory-image-webp")]
    pub subcategory_image_webp: String,

    #[serde(rename = "subcategory-count")]
    pub subcategory_count: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            category_link: "nav.main-categories a[href]".to_string(),
            category_group: ".category-tree .category-group".to_string(),
            category_group_title: ".category-group__title".to_string(),
            category_group_link: ".category-group__links a[href]".to_string(),
            code_attribute: "data-category-code".to_string(),
            product_count: ".product-count".to_string(),
            next_page: ".pagination .next a[href]".to_string(),
            subcategory_item: ".subcategory-list .subcategory".to_string(),
            subcategory_name: ".subcategory__name".to_string(),
            subcategory_link: "a[href]".to_string(),
            subcategory_image: "picture img".to_string(),
            subcategory_image_webp: "picture source[type='image/webp']".to_string(),
            subcategory_count: ".subcategory__count".to_string(),
        }
    }
}
