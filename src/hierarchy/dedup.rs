//! Duplicate removal.
//!
//! Several entries may resolve to the same class name, e.g. a regex that
//! also matches a node listed explicitly. Only the most specific entry is
//! kept; on ties, the first one in pre-order wins. A discarded entry that
//! encloses the kept one is replaced by it, so the kept entry stays where
//! the outermost duplicate was and inherits the other children.

use super::{NodeId, TypeHierarchyTree};
use crate::reporting::{MessageCategory, MessageCollector};
use std::collections::HashMap;

pub(crate) fn remove_duplicates(tree: &mut TypeHierarchyTree, collector: &dyn MessageCollector) {
    // Detaching a subtree may remove members of other groups, so groups are
    // recomputed after each resolution.
    while let Some(group) = first_duplicate_group(tree) {
        let mut kept = group[0];
        for &id in &group[1..] {
            if tree.node(id).specificity > tree.node(kept).specificity {
                kept = id;
            }
        }

        let discarded: Vec<NodeId> = group.into_iter().filter(|&id| id != kept).collect();
        let kept_node = tree.node(kept);
        collector.report(
            &format!(
                "Duplicate entries for {}, keeping the one at {}",
                kept_node.name, kept_node.position
            ),
            MessageCategory::DuplicateMatch,
            None,
            discarded
                .iter()
                .map(|&id| tree.node(id).position.clone())
                .collect(),
        );
        // innermost first, so each replaced entry still encloses the kept one
        for id in discarded.into_iter().rev() {
            if tree.ancestors(kept).contains(&id) {
                tree.take_place_of(kept, id);
            } else {
                tree.detach(id);
            }
        }
    }
}

fn first_duplicate_group(tree: &TypeHierarchyTree) -> Option<Vec<NodeId>> {
    let mut groups: Vec<Vec<NodeId>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for id in tree.attached() {
        let name = tree.node(id).name.as_str();
        match index.get(name) {
            Some(&i) => groups[i].push(id),
            None => {
                index.insert(name, groups.len());
                groups.push(vec![id]);
            }
        }
    }
    groups.into_iter().find(|group| group.len() > 1)
}
