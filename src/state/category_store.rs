//! In-memory record stores
//!
//! Categories keyed by code and subcategory batches keyed by parent code.

use crate::records::{Category, Subcategory};
use indexmap::IndexMap;

/// Categories discovered during a run, keyed by code
///
/// Iteration follows first-insertion order of each code. Upserting an
/// existing code overwrites the record in place (last write wins, no merge).
#[derive(Debug, Clone, Default)]
pub struct CategoryStore {
    categories: IndexMap<String, Category>,
}

impl CategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the category stored under its code
    ///
    /// Returns the record it replaced, if any.
    pub fn upsert(&mut self, category: Category) -> Option<Category> {
        self.categories.insert(category.code.clone(), category)
    }

    pub fn get(&self, code: &str) -> Option<&Category> {
        self.categories.get(code)
    }

    /// Snapshot of every stored category; mutating it leaves the store untouched
    pub fn all(&self) -> Vec<Category> {
        self.categories.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Subcategories grouped by parent category code
#[derive(Debug, Clone, Default)]
pub struct SubcategoryStore {
    buckets: IndexMap<String, Vec<Subcategory>>,
}

impl SubcategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the subcategories of one parent, replacing any earlier list
    pub fn append(&mut self, parent_code: &str, subcategories: Vec<Subcategory>) {
        self.buckets.insert(parent_code.to_string(), subcategories);
    }

    pub fn get(&self, parent_code: &str) -> Option<&[Subcategory]> {
        self.buckets.get(parent_code).map(Vec::as_slice)
    }

    /// All subcategories, bucket after bucket in store order
    pub fn all_flattened(&self) -> Vec<Subcategory> {
        self.buckets.values().flatten().cloned().collect()
    }

    /// Number of parent buckets
    pub fn parent_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of subcategories across all buckets
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
