use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated category of the catalog hierarchy
///
/// `code` is the primary key. `name`, `url` and `code` are never empty once a
/// record has passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub code: String,
    pub name: String,
    pub url: String,

    /// Name or code of the parent category, free-form
    pub parent_category: Option<String>,

    /// 0 for top-level categories, 1 for nested ones
    pub level: u32,

    pub product_count: Option<u64>,
    pub scraped_at: DateTime<Utc>,
    pub source: String,
}

/// A subcategory found on a category page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    pub name: String,
    pub url: String,
    pub image_url: String,
    pub image_url_webp: String,
    pub parent_category: String,
    pub parent_category_code: String,
    pub product_count: Option<u64>,
    pub scraped_at: DateTime<Utc>,
    pub source: String,
}

/// Category fields as produced by an extractor, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCategory {
    pub code: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub parent_category: Option<String>,
    pub level: Option<u32>,
    pub product_count: Option<u64>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
}

impl From<Category> for RawCategory {
    fn from(category: Category) -> Self {
        Self {
            code: Some(category.code),
            name: Some(category.name),
            url: Some(category.url),
            parent_category: category.parent_category,
            level: Some(category.level),
            product_count: category.product_count,
            scraped_at: Some(category.scraped_at),
            source: Some(category.source),
        }
    }
}

/// Subcategory fields as produced by an extractor, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSubcategory {
    pub name: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub image_url_webp: Option<String>,
    pub parent_category: Option<String>,
    pub parent_category_code: Option<String>,
    pub product_count: Option<u64>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
}

impl From<Subcategory> for RawSubcategory {
    fn from(sub: Subcategory) -> Self {
        Self {
            name: Some(sub.name),
            url: Some(sub.url),
            image_url: Some(sub.image_url),
            image_url_webp: Some(sub.image_url_webp),
            parent_category: Some(sub.parent_category),
            parent_category_code: Some(sub.parent_category_code),
            product_count: sub.product_count,
            scraped_at: Some(sub.scraped_at),
            source: Some(sub.source),
        }
    }
}
