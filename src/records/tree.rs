//! Category tree assembly
//!
//! Reassembles the flat category set into a rooted forest by matching each
//! category's free-form `parent_category` against the names and codes of the
//! other categories. Subcategories are grafted afterwards as leaves under the
//! category whose code they name.

use crate::records::{Category, Subcategory};
use serde::Serialize;
use std::collections::HashMap;

/// A category together with everything resolved below it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<TreeEntry>,
}

/// One entry below a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TreeEntry {
    /// A nested category, resolved through `parent_category`
    Category(CategoryNode),

    /// A subcategory leaf, attached by `parent_category_code`
    Subcategory(Subcategory),
}

impl TreeEntry {
    pub fn name(&self) -> &str {
        match self {
            TreeEntry::Category(node) => &node.category.name,
            TreeEntry::Subcategory(subcategory) => &subcategory.name,
        }
    }

    pub fn as_category(&self) -> Option<&CategoryNode> {
        match self {
            TreeEntry::Category(node) => Some(node),
            TreeEntry::Subcategory(_) => None,
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            TreeEntry::Category(node) => node.node_count(),
            TreeEntry::Subcategory(_) => 1,
        }
    }
}

impl CategoryNode {
    fn leaf(category: Category) -> Self {
        Self {
            category,
            subcategories: Vec::new(),
        }
    }

    /// Nested categories, skipping subcategory leaves
    pub fn children(&self) -> impl Iterator<Item = &CategoryNode> {
        self.subcategories.iter().filter_map(TreeEntry::as_category)
    }

    /// Number of entries in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self
            .subcategories
            .iter()
            .map(TreeEntry::node_count)
            .sum::<usize>()
    }

    fn find_mut(&mut self, code: &str) -> Option<&mut CategoryNode> {
        if self.category.code == code {
            return Some(self);
        }
        self.subcategories.iter_mut().find_map(|entry| match entry {
            TreeEntry::Category(node) => node.find_mut(code),
            TreeEntry::Subcategory(_) => None,
        })
    }
}

/// The assembled forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTree {
    pub root: Vec<CategoryNode>,

    /// Number of flat input records, not the number of tree nodes
    pub total_categories: usize,
}

impl CategoryTree {
    pub fn node_count(&self) -> usize {
        self.root.iter().map(CategoryNode::node_count).sum()
    }

    /// Attaches each subcategory under the node whose code equals its
    /// `parent_category_code`, after that node's nested categories
    ///
    /// Subcategories whose parent is not in the tree are skipped.
    ///
    /// # Returns
    ///
    /// The number of subcategories attached.
    pub fn graft_subcategories(&mut self, subcategories: &[Subcategory]) -> usize {
        let mut grafted = 0;
        for subcategory in subcategories {
            let parent = self
                .root
                .iter_mut()
                .find_map(|node| node.find_mut(&subcategory.parent_category_code));
            match parent {
                Some(node) => {
                    node.subcategories
                        .push(TreeEntry::Subcategory(subcategory.clone()));
                    grafted += 1;
                }
                None => tracing::debug!(
                    "No tree node for subcategory {} (parent code {})",
                    subcategory.name,
                    subcategory.parent_category_code
                ),
            }
        }
        grafted
    }
}

/// Builds the category tree from a flat category list
///
/// 1. Every category is cloned and indexed by code. A repeated code replaces
///    the earlier record in place.
/// 2. Each clone with a `parent_category` is attached to the first other clone
///    (in input order) whose name or code equals it exactly. Clones without a
///    parent, or whose parent matches nothing, go to the root.
///
/// Parent links that would close a cycle are cut at the earliest category of
/// the cycle, which then becomes a root, so every category appears exactly once.
pub fn build_tree(categories: &[Category]) -> CategoryTree {
    // First pass: clone and index by code
    let mut nodes: Vec<Category> = Vec::with_capacity(categories.len());
    let mut by_code: HashMap<&str, usize> = HashMap::new();
    for category in categories {
        match by_code.get(category.code.as_str()) {
            Some(&index) => nodes[index] = category.clone(),
            None => {
                by_code.insert(category.code.as_str(), nodes.len());
                nodes.push(category.clone());
            }
        }
    }

    // Second pass: resolve parents by exact name or code match
    let mut parents: Vec<Option<usize>> = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let wanted = node.parent_category.as_deref().filter(|p| !p.is_empty())?;
            nodes
                .iter()
                .enumerate()
                .find(|(other, candidate)| {
                    *other != index && (candidate.name == wanted || candidate.code == wanted)
                })
                .map(|(other, _)| other)
        })
        .collect();

    break_cycles(&mut parents);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut roots = Vec::new();
    for (index, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(index),
            None => roots.push(index),
        }
    }

    let mut slots: Vec<Option<Category>> = nodes.into_iter().map(Some).collect();
    let root = roots
        .into_iter()
        .filter_map(|index| assemble(index, &mut slots, &children))
        .collect();

    CategoryTree {
        root,
        total_categories: categories.len(),
    }
}

fn break_cycles(parents: &mut [Option<usize>]) {
    let limit = parents.len();
    for start in 0..parents.len() {
        let mut current = start;
        let mut steps = 0;
        while let Some(parent) = parents[current] {
            if parent == start {
                tracing::debug!("Breaking parent cycle at category #{}", start);
                parents[start] = None;
                break;
            }
            current = parent;
            steps += 1;
            if steps > limit {
                break;
            }
        }
    }
}

fn assemble(
    index: usize,
    slots: &mut [Option<Category>],
    children: &[Vec<usize>],
) -> Option<CategoryNode> {
    let mut node = CategoryNode::leaf(slots[index].take()?);
    node.subcategories = children[index]
        .iter()
        .filter_map(|child| assemble(*child, slots, children))
        .map(TreeEntry::Category)
        .collect();
    Some(node)
}
