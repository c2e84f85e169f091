//! Orphan adoption: every grammar node ends up in the hierarchy.

use super::{Draft, GrammarNodes, Specificity, TypeHierarchyTree};
use crate::reporting::{MessageCategory, MessageCollector, Severity};
use std::collections::HashSet;

pub(crate) fn adopt_orphans(
    tree: &mut TypeHierarchyTree,
    grammar: &GrammarNodes,
    collector: &dyn MessageCollector,
) {
    let mut present: HashSet<String> = tree
        .attached()
        .into_iter()
        .map(|id| tree.node(id).name.clone())
        .collect();

    let mut orphans = Vec::new();
    for declared in &grammar.declared {
        let qname = grammar.qualified_name(&declared.raw_name);
        if present.insert(qname.clone()) {
            orphans.push((declared, qname));
        }
    }
    if orphans.is_empty() {
        return;
    }

    let root = tree.root();
    let raw_names: Vec<&str> = orphans.iter().map(|(d, _)| d.raw_name.as_str()).collect();
    collector.report(
        &format!(
            "{} nodes are not mentioned in the type hierarchy: {}",
            orphans.len(),
            raw_names.join(", ")
        ),
        MessageCategory::UncoveredNode,
        None,
        orphans.iter().map(|(d, _)| d.position.clone()).collect(),
    );
    collector.report(
        &format!("They will be adopted by the root ({})", tree.node(root).name),
        MessageCategory::UncoveredNode,
        Some(Severity::Fine),
        Vec::new(),
    );

    for (declared, qname) in orphans {
        tree.add_child(
            root,
            Draft {
                specificity: Specificity::Unknown,
                ..Draft::leaf(qname, declared.position.clone())
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_with(children: &[&str]) -> TypeHierarchyTree {
        TypeHierarchyTree::from_draft(Draft {
            specificity: Specificity::Root,
            children: children
                .iter()
                .map(|c| Draft {
                    specificity: Specificity::Resolved,
                    ..Draft::leaf(*c, crate::reporting::Position::file("h.yaml", 1, 1))
                })
                .collect(),
            ..Draft::leaf("p.ASTNode", crate::reporting::Position::file("h.yaml", 1, 1))
        })
    }

    #[test]
    fn test_orphans_are_appended_in_declaration_order() {
        let grammar = GrammarNodes::from_names("AST", "p", &["Zeta", "Expr", "Alpha", "Zeta"]);
        let mut tree = root_with(&["p.ASTExpr"]);
        let collector = crate::reporting::RecordingCollector::everything();
        adopt_orphans(&mut tree, &grammar, &collector);

        let root = tree.root();
        let children: Vec<(&str, Specificity, bool)> = tree
            .node(root)
            .children()
            .iter()
            .map(|&id| {
                let n = tree.node(id);
                (n.name.as_str(), n.specificity, n.external)
            })
            .collect();
        assert_eq!(
            children,
            vec![
                ("p.ASTExpr", Specificity::Resolved, false),
                ("p.ASTZeta", Specificity::Unknown, false),
                ("p.ASTAlpha", Specificity::Unknown, false),
            ]
        );

        let reports = collector.of_category(MessageCategory::UncoveredNode);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].severity, Severity::Warning);
        assert!(reports[0].message.contains("Zeta, Alpha"));
        assert_eq!(reports[1].severity, Severity::Fine);
        assert!(reports[1].message.contains("p.ASTNode"));
    }

    #[test]
    fn test_complete_hierarchy_is_untouched() {
        let grammar = GrammarNodes::from_names("AST", "p", &["Expr"]);
        let mut tree = root_with(&["p.ASTExpr"]);
        let collector = crate::reporting::RecordingCollector::everything();
        adopt_orphans(&mut tree, &grammar, &collector);
        assert_eq!(tree.attached().len(), 2);
        assert!(collector.entries().is_empty());
    }
}
