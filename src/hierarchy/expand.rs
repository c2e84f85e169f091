//! Shorthand expansion.
//!
//! | written        | resolves to                      | specificity |
//! |----------------|----------------------------------|-------------|
//! | `r:<pattern>`  | one entry per matching node      | `Regex`     |
//! | `Name`         | `<package>.<prefix>Name`         | `Resolved`  |
//! | `%Name`        | `<package>.Name`                 | `Quoted`    |
//! | anything else  | itself                           | `Qname`     |
//!
//! Patterns must match the whole raw node name.

use super::{Draft, GrammarNodes, NodeId, Specificity, TypeHierarchyTree};
use crate::grammar::options::qualify;
use crate::reporting::{MessageCategory, MessageCollector, Severity};
use once_cell::sync::Lazy;
use regex::Regex;

const REGEX_PREFIX: &str = "r:";

static SIMPLE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").expect("name regex is valid"));

pub(crate) fn expand_names(
    tree: &TypeHierarchyTree,
    grammar: &GrammarNodes,
    collector: &dyn MessageCollector,
) -> TypeHierarchyTree {
    let expander = Expander { tree, grammar, collector };
    let root = expander.expand_name(tree.root(), Specificity::Root);
    TypeHierarchyTree::from_draft(root)
}

struct Expander<'a> {
    tree: &'a TypeHierarchyTree,
    grammar: &'a GrammarNodes,
    collector: &'a dyn MessageCollector,
}

impl Expander<'_> {
    fn expand_children(&self, id: NodeId) -> Vec<Draft> {
        self.tree
            .node(id)
            .children()
            .iter()
            .flat_map(|&child| self.expand(child))
            .collect()
    }

    fn expand(&self, id: NodeId) -> Vec<Draft> {
        let name = &self.tree.node(id).name;
        match name.strip_prefix(REGEX_PREFIX) {
            Some(pattern) => self.expand_regex(id, pattern),
            None => {
                let specificity = if name.starts_with('%') {
                    Specificity::Quoted
                } else if SIMPLE_NAME.is_match(name) {
                    Specificity::Resolved
                } else {
                    Specificity::Qname
                };
                vec![self.expand_name(id, specificity)]
            }
        }
    }

    /// Expands a non-pattern entry. The root keeps the `Root` specificity
    /// whatever its shape.
    fn expand_name(&self, id: NodeId, specificity: Specificity) -> Draft {
        let node = self.tree.node(id);
        let name = node.name.as_str();

        let (qname, raw_name) = match name.strip_prefix('%') {
            Some(short) => (qualify(&self.grammar.node_package, short), short),
            None if SIMPLE_NAME.is_match(name) => (self.grammar.qualified_name(name), name),
            None => (name.to_string(), name),
        };

        let declared = self.grammar.is_declared(raw_name)
            || self
                .grammar
                .raw_names()
                .into_iter()
                .any(|n| self.grammar.qualified_name(n) == qname);
        if !declared {
            self.collector.report_at(
                &format!(
                    "The node {} is not in the grammar (can be generated anyway)",
                    qname
                ),
                MessageCategory::ExactNodeNotInGrammar,
                node.position.clone(),
            );
        }

        Draft {
            name: qname,
            position: node.position.clone(),
            specificity,
            external: !declared,
            children: self.expand_children(id),
        }
    }

    fn expand_regex(&self, id: NodeId, pattern: &str) -> Vec<Draft> {
        let node = self.tree.node(id);

        let regex = match Regex::new(&format!("^(?:{})$", pattern)) {
            Ok(regex) => regex,
            Err(e) => {
                self.collector.report_at(
                    &format!("Invalid regex '{}': {}", pattern, e),
                    MessageCategory::InvalidRegex,
                    node.position.clone(),
                );
                return Vec::new();
            }
        };

        let matching: Vec<&str> = self
            .grammar
            .raw_names()
            .into_iter()
            .filter(|name| regex.is_match(name))
            .collect();

        let children = if node.is_leaf() {
            Vec::new()
        } else {
            let message = format!(
                "Regex patterns should only be used as leaves, this pattern matches {} nodes",
                matching.len()
            );
            if matching.len() == 1 {
                self.collector.report_at(
                    &message,
                    MessageCategory::RegexShouldBeLeaf,
                    node.position.clone(),
                );
                self.expand_children(id)
            } else {
                self.collector.report(
                    &message,
                    MessageCategory::RegexShouldBeLeaf,
                    Some(Severity::Error),
                    vec![node.position.clone()],
                );
                return Vec::new();
            }
        };

        if matching.is_empty() {
            self.collector.report_at(
                &format!("Regex pattern '{}' matches no nodes", pattern),
                MessageCategory::UnmatchedHierarchyRegex,
                node.position.clone(),
            );
        }

        let mut children = Some(children);
        matching
            .into_iter()
            .map(|name| Draft {
                name: self.grammar.qualified_name(name),
                position: node.position.clone(),
                specificity: Specificity::Regex,
                external: false,
                children: children.take().unwrap_or_default(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::{DataPath, RecordingCollector};

    fn tree(text: &str) -> TypeHierarchyTree {
        let value: serde_yaml::Value = serde_yaml::from_str(text).unwrap();
        TypeHierarchyTree::from_data(
            Some(&value),
            &DataPath::new(["jjtx", "typeHierarchy"]),
            &RecordingCollector::everything(),
        )
    }

    fn expanded(
        text: &str,
        grammar: &GrammarNodes,
        collector: &RecordingCollector,
    ) -> Vec<(String, Specificity, usize)> {
        let tree = expand_names(&tree(text), grammar, collector);
        tree.attached()
            .into_iter()
            .map(|id| {
                let node = tree.node(id);
                (node.name.clone(), node.specificity, tree.ancestors(id).len())
            })
            .collect()
    }

    fn entry(name: &str, spec: Specificity, depth: usize) -> (String, Specificity, usize) {
        (name.to_string(), spec, depth)
    }

    #[test]
    fn test_shorthands() {
        let grammar = GrammarNodes::from_names("AST", "p", &["Expr", "Lit", "Node"]);
        let collector = RecordingCollector::everything();
        let result = expanded("Node: [ Expr, '%Lit', foo.Bar ]", &grammar, &collector);
        assert_eq!(
            result,
            vec![
                entry("p.ASTNode", Specificity::Root, 0),
                entry("p.ASTExpr", Specificity::Resolved, 1),
                entry("p.Lit", Specificity::Quoted, 1),
                entry("foo.Bar", Specificity::Qname, 1),
            ]
        );
        let missing = collector.of_category(MessageCategory::ExactNodeNotInGrammar);
        assert_eq!(missing.len(), 1);
        assert!(missing[0].message.contains("foo.Bar"));
    }

    #[test]
    fn test_empty_package_has_no_dot() {
        let grammar = GrammarNodes::from_names("AST", "", &["Expr"]);
        let collector = RecordingCollector::everything();
        let result = expanded("Node: [ Expr ]", &grammar, &collector);
        assert_eq!(result[1].0, "ASTExpr");
    }

    #[test]
    fn test_external_flag() {
        let grammar = GrammarNodes::from_names("AST", "p", &["Expr"]);
        let collector = RecordingCollector::everything();
        let tree = expand_names(&tree("Node: [ Expr, Other, p.ASTExpr ]"), &grammar, &collector);
        let external: Vec<bool> = tree
            .attached()
            .into_iter()
            .map(|id| tree.node(id).external)
            .collect();
        assert_eq!(external, vec![true, false, true, false]);
    }

    #[test]
    fn test_regex_leaf_expands_to_matches() {
        let grammar = GrammarNodes::from_names("AST", "p", &["AddExpr", "MulExpr", "Lit"]);
        let collector = RecordingCollector::everything();
        let result = expanded("Node: [ 'r:.*Expr' ]", &grammar, &collector);
        assert_eq!(
            result[1..],
            [
                entry("p.ASTAddExpr", Specificity::Regex, 1),
                entry("p.ASTMulExpr", Specificity::Regex, 1),
            ]
        );
        assert!(collector.entries().iter().all(|e| e.severity < Severity::Warning));
    }

    #[test]
    fn test_regex_matches_whole_name() {
        let grammar = GrammarNodes::from_names("AST", "p", &["Expr", "ExprList"]);
        let collector = RecordingCollector::everything();
        let result = expanded("Node: [ 'r:Expr' ]", &grammar, &collector);
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].0, "p.ASTExpr");
    }

    #[test]
    fn test_unmatched_regex_warns() {
        let grammar = GrammarNodes::from_names("AST", "p", &["Lit"]);
        let collector = RecordingCollector::everything();
        let result = expanded("Node: [ 'r:Foo.*' ]", &grammar, &collector);
        assert_eq!(result.len(), 1);
        let warnings = collector.of_category(MessageCategory::UnmatchedHierarchyRegex);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_regex_with_children() {
        let grammar = GrammarNodes::from_names("AST", "p", &["AddExpr", "MulExpr", "Lit"]);

        let collector = RecordingCollector::everything();
        let result = expanded("Node: [ {'r:Add.*': [Lit]} ]", &grammar, &collector);
        assert_eq!(
            result[1..],
            [
                entry("p.ASTAddExpr", Specificity::Regex, 1),
                entry("p.ASTLit", Specificity::Resolved, 2),
            ]
        );
        let reports = collector.of_category(MessageCategory::RegexShouldBeLeaf);
        assert_eq!(reports[0].severity, Severity::Warning);

        let collector = RecordingCollector::everything();
        let result = expanded("Node: [ {'r:.*Expr': [Lit]} ]", &grammar, &collector);
        assert_eq!(result.len(), 1);
        let reports = collector.of_category(MessageCategory::RegexShouldBeLeaf);
        assert_eq!(reports[0].severity, Severity::Error);
    }

    #[test]
    fn test_invalid_regex_is_dropped() {
        let grammar = GrammarNodes::from_names("AST", "p", &["Lit"]);
        let collector = RecordingCollector::everything();
        let result = expanded("Node: [ 'r:(', Lit ]", &grammar, &collector);
        assert_eq!(result.len(), 2);
        assert_eq!(collector.of_category(MessageCategory::InvalidRegex).len(), 1);
        assert_eq!(collector.max_severity(), Severity::Error);
    }
}
