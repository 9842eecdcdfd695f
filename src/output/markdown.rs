//! Markdown outline of the category tree

use crate::records::{CategoryNode, CategoryTree, TreeEntry};

/// Formats a category tree as a nested markdown list
///
/// # Arguments
///
/// * `tree` - The assembled category tree
/// * `title` - Heading written above the outline
///
/// # Returns
///
/// A formatted markdown string
pub fn format_tree_markdown(tree: &CategoryTree, title: &str) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", title));
    md.push_str(&format!(
        "- **Categories**: {}\n- **Top-level**: {}\n\n",
        tree.total_categories,
        tree.root.len()
    ));

    md.push_str("## Hierarchy\n\n");
    if tree.root.is_empty() {
        md.push_str("_No categories found._\n");
    }
    for node in &tree.root {
        push_node(&mut md, node, 0);
    }

    md
}

fn push_node(md: &mut String, node: &CategoryNode, depth: usize) {
    let category = &node.category;
    md.push_str(&"  ".repeat(depth));
    md.push_str(&format!(
        "- [{}]({}) `{}`",
        category.name, category.url, category.code
    ));
    if let Some(count) = category.product_count {
        md.push_str(&format!(" ({} products)", count));
    }
    md.push('\n');

    for entry in &node.subcategories {
        match entry {
            TreeEntry::Category(child) => push_node(md, child, depth + 1),
            TreeEntry::Subcategory(subcategory) => {
                md.push_str(&"  ".repeat(depth + 1));
                md.push_str(&format!("- [{}]({})", subcategory.name, subcategory.url));
                if let Some(count) = subcategory.product_count {
                    md.push_str(&format!(" ({} products)", count));
                }
                md.push('\n');
            }
        }
    }
}
