use std::collections::{HashMap, HashSet};

use super::rows::MAX_RENDER_DEPTH;
use crate::api::{CategoryId, CategoryRecord};

/// A category record plus its children, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub record: CategoryRecord,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Number of nodes in this subtree, including itself.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(CategoryNode::subtree_len).sum::<usize>()
    }
}

/// Output of [`build_forest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    pub roots: Vec<CategoryNode>,
    /// Records whose parent link was ignored because following it led back
    /// to the record itself. Each was promoted to a root.
    pub broken_cycles: Vec<CategoryId>,
    /// Records whose `parent_id` named an id missing from the input.
    pub orphans: Vec<CategoryId>,
    /// Records that would have sat deeper than [`MAX_RENDER_DEPTH`]. Each was
    /// promoted to a root, so no node is ever nested deeper than that.
    pub too_deep: Vec<CategoryId>,
}

impl Forest {
    pub fn len(&self) -> usize {
        self.roots.iter().map(CategoryNode::subtree_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Turn a flat, ordered list of records into a forest.
///
/// Children keep their input order; nothing is re-sorted. A record becomes a
/// root when its `parent_id` is absent, names an id that is not in the
/// input, or names itself through a cycle. Cycles are broken at the member
/// that appears first in the input, so every record lands in exactly one
/// node for any input.
///
/// Duplicate ids keep the first occurrence as the link target; later
/// duplicates still appear as nodes.
///
/// Nesting is bounded: a record that would land below [`MAX_RENDER_DEPTH`]
/// starts a new root instead, which keeps every later walk over the forest
/// shallow.
pub fn build_forest(records: &[CategoryRecord]) -> Forest {
    let mut index: HashMap<&CategoryId, usize> = HashMap::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        index.entry(&rec.id).or_insert(i);
    }

    // Effective parent of each record (by position), after dropping dangling
    // references.
    let mut parent: Vec<Option<usize>> = Vec::with_capacity(records.len());
    let mut orphans = Vec::new();
    for rec in records {
        let resolved = match &rec.parent_id {
            None => None,
            Some(pid) => match index.get(pid) {
                Some(&p) => Some(p),
                None => {
                    tracing::debug!(category_id = %rec.id, parent_id = %pid, "Dangling parent reference, treating as root");
                    orphans.push(rec.id.clone());
                    None
                }
            },
        };
        parent.push(resolved);
    }

    let broken_cycles = break_cycles(records, &mut parent);
    let too_deep = bound_depth(records, &mut parent);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut roots = Vec::new();
    for (i, p) in parent.iter().enumerate() {
        match p {
            Some(p) => children[*p].push(i),
            None => roots.push(i),
        }
    }

    Forest {
        roots: roots
            .into_iter()
            .map(|i| assemble(i, records, &children))
            .collect(),
        broken_cycles,
        orphans,
        too_deep,
    }
}

/// Cut every parent link that would put a record deeper than
/// [`MAX_RENDER_DEPTH`]. `parent` must be acyclic.
///
/// Depths are resolved by walking up to the nearest record whose depth is
/// already known, then assigning back down that path in one go, so the walk
/// is iterative and linear overall. A record promoted to a root restarts the
/// count for its descendants.
fn bound_depth(records: &[CategoryRecord], parent: &mut [Option<usize>]) -> Vec<CategoryId> {
    let mut depth: Vec<Option<usize>> = vec![None; records.len()];
    let mut cut = Vec::new();

    for start in 0..records.len() {
        if depth[start].is_some() {
            continue;
        }

        let mut path = vec![start];
        let mut base = loop {
            let top = path[path.len() - 1];
            match parent[top] {
                None => {
                    depth[top] = Some(0);
                    path.pop();
                    break 0;
                }
                Some(p) => match depth[p] {
                    Some(d) => break d,
                    None => path.push(p),
                },
            }
        };

        // Nearest the known ancestor first
        while let Some(i) = path.pop() {
            let d = base + 1;
            if d > MAX_RENDER_DEPTH {
                parent[i] = None;
                depth[i] = Some(0);
                cut.push(i);
                base = 0;
            } else {
                depth[i] = Some(d);
                base = d;
            }
        }
    }

    if !cut.is_empty() {
        tracing::warn!(
            count = cut.len(),
            max_depth = MAX_RENDER_DEPTH,
            "Category tree too deep, promoting nested categories to roots"
        );
    }
    // Report in input order
    cut.sort_unstable();
    cut.into_iter().map(|i| records[i].id.clone()).collect()
}

/// Walk each record's ancestor chain; a chain that returns to its start is a
/// cycle and gets cut at that record. Records proven to reach a root are
/// remembered so each chain is walked once.
fn break_cycles(records: &[CategoryRecord], parent: &mut [Option<usize>]) -> Vec<CategoryId> {
    let mut rooted: HashSet<usize> = HashSet::with_capacity(records.len());
    let mut broken = Vec::new();

    for start in 0..records.len() {
        if rooted.contains(&start) {
            continue;
        }

        let mut chain = vec![start];
        let mut seen: HashSet<usize> = HashSet::from([start]);
        let mut cursor = parent[start];

        let reaches_root = loop {
            match cursor {
                None => break true,
                Some(p) if rooted.contains(&p) => break true,
                Some(p) if p == start => break false,
                Some(p) if !seen.insert(p) => break false,
                Some(p) => {
                    chain.push(p);
                    cursor = parent[p];
                }
            }
        };

        if reaches_root {
            rooted.extend(chain);
        } else if cursor == Some(start) {
            tracing::warn!(
                category_id = %records[start].id,
                chain_len = chain.len(),
                "Category parent chain forms a cycle, promoting to root"
            );
            parent[start] = None;
            broken.push(records[start].id.clone());
            rooted.extend(chain);
        }
        // Otherwise the chain runs into a cycle that does not contain
        // `start`; that cycle is cut when its own first member is visited.
    }

    broken
}

fn assemble(i: usize, records: &[CategoryRecord], children: &[Vec<usize>]) -> CategoryNode {
    CategoryNode {
        record: records[i].clone(),
        children: children[i]
            .iter()
            .map(|&c| assemble(c, records, children))
            .collect(),
    }
}
