//! Hierarchy Builder and Tree Presentation Model.
//!
//! Both are pure: [`build_forest`] turns the flat record list into a forest,
//! [`flatten`] / [`rows`] project that forest into indented pre-order rows.
//! Nothing here holds state between calls; callers rebuild on every change
//! to the source collection.

mod builder;
mod rows;

use std::collections::{HashMap, HashSet};

use crate::api::{CategoryId, CategoryRecord};

pub use builder::{build_forest, CategoryNode, Forest};
pub use rows::{flatten, rows, CategoryRow, MAX_RENDER_DEPTH};

/// Ids of every transitive descendant of `id` (not including `id`).
///
/// Walks the raw parent links, so it tolerates cycles and dangling
/// references.
pub fn descendant_ids(records: &[CategoryRecord], id: &CategoryId) -> HashSet<CategoryId> {
    let mut children: HashMap<&CategoryId, Vec<&CategoryId>> = HashMap::new();
    for rec in records {
        if let Some(pid) = &rec.parent_id {
            children.entry(pid).or_default().push(&rec.id);
        }
    }

    let mut found = HashSet::new();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        for child in children.get(current).into_iter().flatten() {
            if *child != id && found.insert((*child).clone()) {
                stack.push(*child);
            }
        }
    }
    found
}

/// Categories that may be offered as the parent of the one being edited.
///
/// With `editing = None` (create) every record is a candidate. When editing,
/// the record itself is always excluded; with `exclude_descendants` its
/// current descendants are excluded too, so no edit can close a cycle.
pub fn parent_candidates<'a>(
    records: &'a [CategoryRecord],
    editing: Option<&CategoryId>,
    exclude_descendants: bool,
) -> Vec<&'a CategoryRecord> {
    let Some(editing) = editing else {
        return records.iter().collect();
    };

    let descendants = if exclude_descendants {
        descendant_ids(records, editing)
    } else {
        HashSet::new()
    };

    records
        .iter()
        .filter(|r| &r.id != editing && !descendants.contains(&r.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rec(id: i64, parent: Option<i64>, name: &str) -> CategoryRecord {
        CategoryRecord {
            id: CategoryId::from(id),
            name: name.to_string(),
            slug: crate::util::slugify(name),
            description: None,
            icon: None,
            picture: None,
            parent_id: parent.map(CategoryId::from),
            display_order: 0,
            course_count: 0,
        }
    }

    fn scenario() -> Vec<CategoryRecord> {
        vec![
            rec(1, None, "Tech"),
            rec(2, Some(1), "Web"),
            rec(3, Some(99), "Orphan"),
        ]
    }

    fn ids(recs: &[&CategoryRecord]) -> Vec<i64> {
        recs.iter().map(|r| r.id.as_str().parse().unwrap()).collect()
    }

    #[test]
    fn test_candidates_exclude_only_self_by_default() {
        let records = scenario();
        let candidates = parent_candidates(&records, Some(&CategoryId::from(1)), false);
        assert_eq!(ids(&candidates), vec![2, 3]);
    }

    #[test]
    fn test_candidates_can_exclude_descendants() {
        let mut records = scenario();
        records.push(rec(4, Some(2), "Frontend"));
        let candidates = parent_candidates(&records, Some(&CategoryId::from(1)), true);
        assert_eq!(ids(&candidates), vec![3]);
    }

    #[test]
    fn test_candidates_for_create_include_everything() {
        let records = scenario();
        assert_eq!(parent_candidates(&records, None, true).len(), 3);
    }

    #[test]
    fn test_descendants_tolerate_cycles() {
        let records = vec![rec(1, Some(2), "A"), rec(2, Some(1), "B"), rec(3, Some(2), "C")];
        let found = descendant_ids(&records, &CategoryId::from(1));
        assert_eq!(found.len(), 2);
        assert!(found.contains(&CategoryId::from(2)));
        assert!(found.contains(&CategoryId::from(3)));
    }

    /// Up to 30 records with unique ids 0..n and arbitrary parent refs,
    /// some dangling (ids 100+), some cyclic.
    fn arb_records() -> impl Strategy<Value = Vec<CategoryRecord>> {
        (0usize..30).prop_flat_map(|n| {
            proptest::collection::vec(proptest::option::of(0i64..(n as i64 + 3).max(1)), n).prop_map(
                move |parents| {
                    parents
                        .into_iter()
                        .enumerate()
                        .map(|(i, p)| {
                            let p = p.map(|p| if p >= n as i64 { p + 100 } else { p });
                            rec(i as i64, p, &format!("C{i}"))
                        })
                        .collect()
                },
            )
        })
    }

    proptest! {
        #[test]
        fn forest_partitions_input(records in arb_records()) {
            let forest = build_forest(&records);
            prop_assert_eq!(forest.len(), records.len());

            let mut seen: Vec<CategoryId> = flatten(&forest.roots, 0)
                .into_iter()
                .map(|(n, _)| n.record.id.clone())
                .collect();
            seen.sort();
            let mut expected: Vec<CategoryId> = records.iter().map(|r| r.id.clone()).collect();
            expected.sort();
            prop_assert_eq!(seen, expected);
        }

        #[test]
        fn unresolvable_parents_are_roots(records in arb_records()) {
            let forest = build_forest(&records);
            let known: HashSet<&CategoryId> = records.iter().map(|r| &r.id).collect();
            let roots: HashSet<&CategoryId> = forest.roots.iter().map(|n| &n.record.id).collect();
            for r in &records {
                let unresolved = r.parent_id.as_ref().map_or(true, |p| !known.contains(p));
                if unresolved {
                    prop_assert!(roots.contains(&r.id));
                }
            }
        }

        #[test]
        fn preorder_parents_precede_descendants(records in arb_records()) {
            let forest = build_forest(&records);
            let flat = flatten(&forest.roots, 0);
            let position: HashMap<&CategoryId, usize> = flat
                .iter()
                .enumerate()
                .map(|(i, (n, _))| (&n.record.id, i))
                .collect();
            let input_pos: HashMap<&CategoryId, usize> = records
                .iter()
                .enumerate()
                .map(|(i, r)| (&r.id, i))
                .collect();

            for (node, depth) in &flat {
                let mut last_child_pos = None;
                for child in &node.children {
                    prop_assert!(position[&node.record.id] < position[&child.record.id]);
                    prop_assert!(
                        flat[position[&child.record.id]].1 == depth + 1
                    );
                    let ip = input_pos[&child.record.id];
                    if let Some(prev) = last_child_pos {
                        prop_assert!(prev < ip, "siblings keep input order");
                    }
                    last_child_pos = Some(ip);
                }
            }
        }
    }
}
