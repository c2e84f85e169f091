//! Node type hierarchy
//!
//! The hierarchy of node classes is described in configuration as nested
//! single-key maps, sequences and strings, with shorthands for grammar
//! nodes. Resolution runs in four passes:
//!
//! 1. raw parse of the configuration value ([`TypeHierarchyTree::from_data`])
//! 2. name expansion against the grammar ([`expand`])
//! 3. duplicate removal ([`dedup`])
//! 4. adoption of the grammar nodes the configuration forgot ([`adopt`])
//!
//! Problems are reported to the collector and resolved deterministically;
//! none of the passes fails.

use crate::grammar::options::qualify;
use crate::grammar::{GrammarFile, GrammarOptions};
use crate::reporting::{DataPath, MessageCategory, MessageCollector, Position};
use serde_yaml::Value;
use std::collections::HashSet;

pub mod adopt;
pub mod dedup;
pub mod expand;
pub mod specificity;

pub use specificity::Specificity;

/// Root of the hierarchy when the configuration names none.
pub const DEFAULT_ROOT_NAME: &str = "Node";

// ============================================================================
// ARENA TREE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub name: String,
    pub position: Position,
    pub specificity: Specificity,
    /// No grammar construct declares this node.
    pub external: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl HierarchyNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Tree of node names. Nodes live in an arena and refer to each other by
/// index; detached nodes stay in the arena but are unreachable from the
/// root.
#[derive(Debug, Clone)]
pub struct TypeHierarchyTree {
    nodes: Vec<HierarchyNode>,
    root: NodeId,
    processed: bool,
}

/// A tree under construction, before it is laid out in an arena.
#[derive(Debug, Clone)]
pub(crate) struct Draft {
    pub name: String,
    pub position: Position,
    pub specificity: Specificity,
    pub external: bool,
    pub children: Vec<Draft>,
}

impl Draft {
    pub fn leaf(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
            specificity: Specificity::Unknown,
            external: false,
            children: Vec::new(),
        }
    }
}

impl TypeHierarchyTree {
    /// A tree containing only a root named `name`.
    pub fn default_root(name: &str) -> Self {
        Self::from_draft(Draft {
            specificity: Specificity::Root,
            ..Draft::leaf(name, Position::Data(hierarchy_path()))
        })
    }

    pub(crate) fn from_draft(root: Draft) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            processed: false,
        };
        tree.root = tree.insert(None, root);
        tree
    }

    fn insert(&mut self, parent: Option<NodeId>, draft: Draft) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(HierarchyNode {
            name: draft.name,
            position: draft.position,
            specificity: draft.specificity,
            external: draft.external,
            parent,
            children: Vec::new(),
        });
        for child in draft.children {
            let child_id = self.insert(Some(id), child);
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    pub(crate) fn to_draft(&self, id: NodeId) -> Draft {
        let node = self.node(id);
        Draft {
            name: node.name.clone(),
            position: node.position.clone(),
            specificity: node.specificity,
            external: node.external,
            children: node.children.iter().map(|&c| self.to_draft(c)).collect(),
        }
    }

    /// Appends a new leaf under `parent`.
    pub(crate) fn add_child(&mut self, parent: NodeId, draft: Draft) -> NodeId {
        let id = self.insert(Some(parent), draft);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Removes a node and its subtree from its parent.
    pub(crate) fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Moves `kept` to where `replaced` is, and hands it the children
    /// `replaced` still has. `replaced` ends up detached and childless.
    pub(crate) fn take_place_of(&mut self, kept: NodeId, replaced: NodeId) {
        self.detach(kept);
        let parent = self.nodes[replaced.0].parent.take();
        match parent {
            Some(parent) => {
                for child in self.nodes[parent.0].children.iter_mut() {
                    if *child == replaced {
                        *child = kept;
                    }
                }
            }
            None if self.root == replaced => self.root = kept,
            None => {}
        }
        self.nodes[kept.0].parent = parent;

        let orphans = std::mem::take(&mut self.nodes[replaced.0].children);
        for &child in &orphans {
            self.nodes[child.0].parent = Some(kept);
        }
        self.nodes[kept.0].children.extend(orphans);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &HierarchyNode {
        &self.nodes[id.0]
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// `id` and all its descendants, in pre-order.
    pub fn descendants_or_self(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.node(current).children.iter().rev());
        }
        result
    }

    /// Every node reachable from the root, in pre-order.
    pub fn attached(&self) -> Vec<NodeId> {
        self.descendants_or_self(self.root)
    }

    /// Finds an attached node by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.attached()
            .into_iter()
            .find(|&id| self.node(id).name == name)
    }

    /// Chain of ancestors of `id`, closest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            result.push(parent);
            current = self.node(parent).parent;
        }
        result
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// Resolves the raw tree against the grammar: expands shorthand names,
    /// removes duplicates, then adopts uncovered grammar nodes on the root.
    ///
    /// # Panics
    ///
    /// If the tree has already been processed.
    pub fn process(
        self,
        grammar: &GrammarNodes,
        collector: &dyn MessageCollector,
    ) -> TypeHierarchyTree {
        assert!(!self.processed, "type hierarchy is already processed");

        let mut tree = expand::expand_names(&self, grammar, collector);
        dedup::remove_duplicates(&mut tree, collector);
        adopt::adopt_orphans(&mut tree, grammar, collector);

        let mut compact = Self::from_draft(tree.to_draft(tree.root));
        compact.processed = true;
        compact
    }

    // ------------------------------------------------------------------------
    // Raw parse
    // ------------------------------------------------------------------------

    /// Builds the raw tree from a configuration value, located at `path`.
    /// Malformed entries are reported and dropped; if nothing usable is
    /// left, the tree is the default root.
    pub fn from_data(
        data: Option<&Value>,
        path: &DataPath,
        collector: &dyn MessageCollector,
    ) -> TypeHierarchyTree {
        let draft = match data {
            None | Some(Value::Null) => None,
            Some(value) => parse_value(value, path, collector),
        };
        match draft {
            Some(root) => Self::from_draft(Draft {
                specificity: Specificity::Root,
                ..root
            }),
            None => Self::default_root(DEFAULT_ROOT_NAME),
        }
    }
}

pub fn hierarchy_path() -> DataPath {
    DataPath::new(["jjtx", "typeHierarchy"])
}

fn parse_value(value: &Value, path: &DataPath, collector: &dyn MessageCollector) -> Option<Draft> {
    match value {
        Value::String(name) => parse_name(name, path, collector),
        Value::Mapping(map) => {
            if map.len() > 1 {
                collector.report_at(
                    &format!("{} roots, expected one", map.len()),
                    MessageCategory::MultipleHierarchyRoots,
                    path.clone().into(),
                );
                return None;
            }
            let (key, children) = match map.iter().next() {
                Some(entry) => entry,
                None => {
                    collector.report_at(
                        "expected one root",
                        MessageCategory::NoHierarchyRoots,
                        path.clone().into(),
                    );
                    return None;
                }
            };
            let Value::String(name) = key else {
                report_wrong_type("a node name", key, path, collector);
                return None;
            };
            let position = path.resolve(name);
            let mut node = parse_name(name, &position, collector)?;

            match children {
                Value::String(_) => {
                    node.children
                        .extend(parse_value(children, &position, collector));
                }
                Value::Sequence(items) => {
                    node.children = items
                        .iter()
                        .enumerate()
                        .filter_map(|(i, item)| parse_value(item, &position.resolve(i), collector))
                        .collect();
                }
                other => {
                    report_wrong_type("a sequence or a string", other, &position, collector);
                    return None;
                }
            }
            Some(node)
        }
        other => {
            report_wrong_type("a string or a map", other, path, collector);
            None
        }
    }
}

fn parse_name(name: &str, path: &DataPath, collector: &dyn MessageCollector) -> Option<Draft> {
    let name = name.trim();
    if name.is_empty() {
        collector.report_at(
            "expected a node name, got an empty string",
            MessageCategory::WrongType,
            path.clone().into(),
        );
        return None;
    }
    Some(Draft::leaf(name, path.clone().into()))
}

fn report_wrong_type(
    expected: &str,
    value: &Value,
    path: &DataPath,
    collector: &dyn MessageCollector,
) {
    let got = match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a map",
        Value::Tagged(_) => "a tagged value",
    };
    collector.report_at(
        &format!("expected {}, got {}", expected, got),
        MessageCategory::WrongType,
        path.clone().into(),
    );
}

// ============================================================================
// GRAMMAR VIEW
// ============================================================================

/// A node declared in the grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredNode {
    pub raw_name: String,
    pub position: Position,
}

/// What the hierarchy needs to know about the grammar: the declared nodes
/// in declaration order and how their names are qualified.
#[derive(Debug, Clone)]
pub struct GrammarNodes {
    pub node_prefix: String,
    pub node_package: String,
    /// One entry per node-opening construct; a name may appear several times.
    pub declared: Vec<DeclaredNode>,
}

impl GrammarNodes {
    /// `source_text` is the text the grammar was read from, used to locate
    /// node declarations.
    pub fn from_grammar(grammar: &GrammarFile, options: &GrammarOptions, source_text: &str) -> Self {
        let declared = grammar
            .node_owners(options.node_default_void)
            .into_iter()
            .map(|owner| DeclaredNode {
                raw_name: owner.name.to_string(),
                position: Position::from_offset(
                    grammar.name.as_str(),
                    source_text,
                    owner.production.offset,
                ),
            })
            .collect();
        Self {
            node_prefix: options.node_prefix.clone(),
            node_package: options.node_package.clone(),
            declared,
        }
    }

    /// Nodes without source positions, mostly for tests.
    pub fn from_names(prefix: &str, package: &str, names: &[&str]) -> Self {
        Self {
            node_prefix: prefix.to_string(),
            node_package: package.to_string(),
            declared: names
                .iter()
                .map(|name| DeclaredNode {
                    raw_name: name.to_string(),
                    position: Position::file("<grammar>", 1, 1),
                })
                .collect(),
        }
    }

    /// Declared raw names, in declaration order, without duplicates.
    pub fn raw_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.declared
            .iter()
            .map(|d| d.raw_name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    pub fn is_declared(&self, raw_name: &str) -> bool {
        self.declared.iter().any(|d| d.raw_name == raw_name)
    }

    /// `<package>.<prefix><raw_name>`.
    pub fn qualified_name(&self, raw_name: &str) -> String {
        qualify(
            &self.node_package,
            &format!("{}{}", self.node_prefix, raw_name),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::RecordingCollector;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn names(tree: &TypeHierarchyTree) -> Vec<String> {
        tree.attached()
            .into_iter()
            .map(|id| tree.node(id).name.clone())
            .collect()
    }

    #[test]
    fn test_from_data_nested() {
        let collector = RecordingCollector::everything();
        let value = yaml("Node:\n  - Expr:\n      - Add\n      - Mul\n  - Stmt: Block\n  - Lit\n");
        let tree = TypeHierarchyTree::from_data(Some(&value), &hierarchy_path(), &collector);
        assert_eq!(names(&tree), vec!["Node", "Expr", "Add", "Mul", "Stmt", "Block", "Lit"]);
        assert_eq!(tree.node(tree.root()).specificity, Specificity::Root);
        assert!(collector.entries().is_empty());

        let expr = tree.find("Expr").unwrap();
        assert_eq!(
            tree.node(expr).position.to_string(),
            "/jjtx/typeHierarchy/Node/0/Expr"
        );
        assert_eq!(tree.ancestors(tree.find("Add").unwrap()), vec![expr, tree.root()]);
    }

    #[test]
    fn test_malformed_entries_are_dropped() {
        let collector = RecordingCollector::everything();
        let value = yaml("Node:\n  - Expr: 3\n  - {A: [], B: []}\n  - {}\n  - 12\n  - Ok\n");
        let tree = TypeHierarchyTree::from_data(Some(&value), &hierarchy_path(), &collector);
        assert_eq!(names(&tree), vec!["Node", "Ok"]);
        assert_eq!(collector.of_category(MessageCategory::WrongType).len(), 2);
        assert_eq!(
            collector
                .of_category(MessageCategory::MultipleHierarchyRoots)
                .len(),
            1
        );
        let no_roots = collector.of_category(MessageCategory::NoHierarchyRoots);
        assert_eq!(no_roots[0].positions[0].to_string(), "/jjtx/typeHierarchy/Node/2");
    }

    #[test]
    fn test_absent_or_rejected_root_defaults() {
        let collector = RecordingCollector::everything();
        let tree = TypeHierarchyTree::from_data(None, &hierarchy_path(), &collector);
        assert_eq!(names(&tree), vec![DEFAULT_ROOT_NAME]);

        let value = yaml("[1, 2]");
        let tree = TypeHierarchyTree::from_data(Some(&value), &hierarchy_path(), &collector);
        assert_eq!(names(&tree), vec![DEFAULT_ROOT_NAME]);
        assert_eq!(collector.of_category(MessageCategory::WrongType).len(), 1);
    }

    #[test]
    fn test_detach_removes_subtree() {
        let value = yaml("Node: [ {A: [B]}, C ]");
        let mut tree =
            TypeHierarchyTree::from_data(Some(&value), &hierarchy_path(), &RecordingCollector::everything());
        let a = tree.find("A").unwrap();
        tree.detach(a);
        assert_eq!(names(&tree), vec!["Node", "C"]);
        assert!(tree.find("B").is_none());
    }

    #[test]
    #[should_panic(expected = "already processed")]
    fn test_process_twice_panics() {
        let grammar = GrammarNodes::from_names("AST", "p", &["A"]);
        let collector = RecordingCollector::everything();
        let tree = TypeHierarchyTree::default_root("Node").process(&grammar, &collector);
        assert!(tree.is_processed());
        tree.process(&grammar, &collector);
    }

    #[test]
    fn test_qualified_names() {
        let grammar = GrammarNodes::from_names("AST", "", &["A", "B", "A"]);
        assert_eq!(grammar.qualified_name("A"), "ASTA");
        assert_eq!(grammar.raw_names(), vec!["A", "B"]);
        let grammar = GrammarNodes::from_names("", "com.x", &[]);
        assert_eq!(grammar.qualified_name("A"), "com.x.A");
    }
}
