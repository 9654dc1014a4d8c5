use super::builder::CategoryNode;
use crate::api::CategoryId;

/// Deepest level a node is nested or indented at. `build_forest` re-roots
/// anything below it; `flatten` clamps indentation to it.
pub const MAX_RENDER_DEPTH: usize = 64;

/// Pre-order projection of a forest into `(node, depth)` pairs.
///
/// Parents come immediately before all their descendants and siblings keep
/// their stored order. `depth` starts at `start_depth` for the given nodes
/// and never exceeds [`MAX_RENDER_DEPTH`]; every node is emitted.
pub fn flatten(nodes: &[CategoryNode], start_depth: usize) -> Vec<(&CategoryNode, usize)> {
    let mut out = Vec::new();
    let mut stack: Vec<(&CategoryNode, usize)> = nodes
        .iter()
        .rev()
        .map(|n| (n, start_depth.min(MAX_RENDER_DEPTH)))
        .collect();

    while let Some((node, depth)) = stack.pop() {
        out.push((node, depth));
        let child_depth = (depth + 1).min(MAX_RENDER_DEPTH);
        stack.extend(node.children.iter().rev().map(|c| (c, child_depth)));
    }
    out
}

/// One indented line of the category list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRow {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
    pub picture: Option<String>,
    /// Indentation level only.
    pub depth: usize,
    pub course_count: i64,
    pub child_count: usize,
}

impl CategoryRow {
    pub fn from_node(node: &CategoryNode, depth: usize) -> Self {
        Self {
            id: node.record.id.clone(),
            name: node.record.name.clone(),
            slug: node.record.slug.clone(),
            icon: node.record.icon.clone(),
            picture: node.record.picture.clone(),
            depth,
            course_count: node.record.course_count,
            child_count: node.children.len(),
        }
    }
}

/// Owned rows for the whole forest, ready to render.
pub fn rows(roots: &[CategoryNode]) -> Vec<CategoryRow> {
    flatten(roots, 0)
        .into_iter()
        .map(|(node, depth)| CategoryRow::from_node(node, depth))
        .collect()
}
