//! Record validation
//!
//! Normalizes raw extractor output and accepts or rejects it before it enters
//! a store. Every function here is pure.

use crate::records::{Category, RawCategory, RawSubcategory, Subcategory};
use chrono::Utc;
use thiserror::Error;

const DEFAULT_SOURCE: &str = "unknown";

/// A record is missing a required field
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid {record}: missing required field '{field}'")]
pub struct ValidationError {
    pub record: &'static str,
    pub field: &'static str,
}

/// Trims a field, treating blank values as absent
fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(
    value: Option<String>,
    record: &'static str,
    field: &'static str,
) -> Result<String, ValidationError> {
    trimmed(value).ok_or(ValidationError { record, field })
}

/// Validates and normalizes a raw category
///
/// Requires non-empty `name`, `url` and `code`. Missing optional fields
/// default to `level = 0`, `scraped_at = now` and `source = "unknown"`.
pub fn validate_category(raw: RawCategory) -> Result<Category, ValidationError> {
    let name = required(raw.name, "category", "name")?;
    let url = required(raw.url, "category", "url")?;
    let code = required(raw.code, "category", "code")?;

    Ok(Category {
        code,
        name,
        url,
        parent_category: trimmed(raw.parent_category),
        level: raw.level.unwrap_or(0),
        product_count: raw.product_count,
        scraped_at: raw.scraped_at.unwrap_or_else(Utc::now),
        source: trimmed(raw.source).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
    })
}

/// Validates and normalizes a raw subcategory
///
/// Requires non-empty `name`, `url`, `parent_category` and
/// `parent_category_code`. Image fields default to empty strings.
pub fn validate_subcategory(raw: RawSubcategory) -> Result<Subcategory, ValidationError> {
    let name = required(raw.name, "subcategory", "name")?;
    let url = required(raw.url, "subcategory", "url")?;
    let parent_category = required(raw.parent_category, "subcategory", "parentCategory")?;
    let parent_category_code =
        required(raw.parent_category_code, "subcategory", "parentCategoryCode")?;

    Ok(Subcategory {
        name,
        url,
        image_url: trimmed(raw.image_url).unwrap_or_default(),
        image_url_webp: trimmed(raw.image_url_webp).unwrap_or_default(),
        parent_category,
        parent_category_code,
        product_count: raw.product_count,
        scraped_at: raw.scraped_at.unwrap_or_else(Utc::now),
        source: trimmed(raw.source).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
    })
}

/// Non-failing variant of [`validate_category`] for skip-and-continue call sites
pub fn sanitize_category(raw: RawCategory) -> Option<Category> {
    validate_category(raw).ok()
}

/// Non-failing variant of [`validate_subcategory`]
pub fn sanitize_subcategory(raw: RawSubcategory) -> Option<Subcategory> {
    validate_subcategory(raw).ok()
}

pub fn is_valid_category(raw: &RawCategory) -> bool {
    validate_category(raw.clone()).is_ok()
}

pub fn is_valid_subcategory(raw: &RawSubcategory) -> bool {
    validate_subcategory(raw.clone()).is_ok()
}
