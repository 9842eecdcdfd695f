//! Catalog records
//!
//! - `Category` / `Subcategory`: validated records, keyed by code and parent code
//! - `RawCategory` / `RawSubcategory`: extractor output before validation
//! - validation (trim, required fields, defaults)
//! - tree assembly of the flat category set, with subcategory leaves

mod category;
mod tree;
mod validate;

pub use category::{Category, RawCategory, RawSubcategory, Subcategory};
pub use tree::{build_tree, CategoryNode, CategoryTree, TreeEntry};
pub use validate::{
    is_valid_category, is_valid_subcategory, sanitize_category, sanitize_subcategory,
    validate_category, validate_subcategory, ValidationError,
};
