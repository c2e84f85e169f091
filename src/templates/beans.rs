//! Serializable views of the resolved model, exposed to templates.

use crate::grammar::options::split_qualified;
use crate::grammar::GrammarOptions;
use crate::hierarchy::{GrammarNodes, NodeId, TypeHierarchyTree};
use crate::weave::builder::{node_constant, parser_state_qname};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassBean {
    pub qualified_name: String,
    pub simple_name: String,
    pub package: String,
}

impl ClassBean {
    pub fn new(qualified_name: &str) -> Self {
        let (package, simple_name) = split_qualified(qualified_name);
        Self {
            qualified_name: qualified_name.to_string(),
            simple_name: simple_name.to_string(),
            package: package.to_string(),
        }
    }
}

/// Reference to another node, to keep beans acyclic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRef {
    pub name: String,
    pub class: ClassBean,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeBean {
    /// Unprefixed grammar name for nodes designated through the grammar,
    /// simple class name otherwise.
    pub name: String,
    pub class: ClassBean,
    pub super_node: Option<NodeRef>,
    pub sub_nodes: Vec<NodeRef>,
    /// No production declares the node.
    pub external: bool,
    pub is_root: bool,
}

/// Everything templates know about the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarBean {
    /// Name of the grammar file, without extension.
    pub name: String,
    pub parser: ClassBean,
    pub tree_state: ClassBean,
    pub node_prefix: String,
    pub node_package: String,
    pub root_node: NodeRef,
    /// All nodes of the hierarchy, in pre-order.
    pub type_hierarchy: Vec<NodeBean>,
    /// Ids of the grammar nodes, as used by the woven parser.
    pub node_constants: Vec<NodeConstantBean>,
}

/// One `JJT<NAME>` constant of `<Parser>TreeConstants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConstantBean {
    pub name: String,
    pub constant: String,
    pub value: usize,
}

/// Converts a resolved hierarchy into beans, in pre-order.
pub fn node_beans(tree: &TypeHierarchyTree, node_prefix: &str) -> Vec<NodeBean> {
    let refs = |id: NodeId| node_ref(tree, id, node_prefix);
    tree.attached()
        .into_iter()
        .map(|id| {
            let node = tree.node(id);
            NodeBean {
                name: bean_name(tree, id, node_prefix),
                class: ClassBean::new(&node.name),
                super_node: node.parent().map(refs),
                sub_nodes: node.children().iter().map(|&c| refs(c)).collect(),
                external: node.external,
                is_root: id == tree.root(),
            }
        })
        .collect()
}

pub fn grammar_bean(
    name: &str,
    options: &GrammarOptions,
    tree: &TypeHierarchyTree,
    nodes: &GrammarNodes,
) -> GrammarBean {
    let node_constants = nodes
        .raw_names()
        .into_iter()
        .enumerate()
        .map(|(value, name)| NodeConstantBean {
            name: name.to_string(),
            constant: node_constant(name),
            value,
        })
        .collect();
    GrammarBean {
        name: name.to_string(),
        parser: ClassBean::new(&options.parser_qualified_name()),
        tree_state: ClassBean::new(&parser_state_qname(options)),
        node_prefix: options.node_prefix.clone(),
        node_package: options.node_package.clone(),
        root_node: node_ref(tree, tree.root(), &options.node_prefix),
        type_hierarchy: node_beans(tree, &options.node_prefix),
        node_constants,
    }
}

fn node_ref(tree: &TypeHierarchyTree, id: NodeId, node_prefix: &str) -> NodeRef {
    NodeRef {
        name: bean_name(tree, id, node_prefix),
        class: ClassBean::new(&tree.node(id).name),
    }
}

fn bean_name(tree: &TypeHierarchyTree, id: NodeId, node_prefix: &str) -> String {
    let node = tree.node(id);
    let (_, simple) = split_qualified(&node.name);
    if node.specificity.is_grammar_derived() {
        simple.strip_prefix(node_prefix).unwrap_or(simple).to_string()
    } else {
        simple.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::GrammarNodes;
    use crate::reporting::{DataPath, NoopCollector};

    #[test]
    fn test_node_beans() {
        let grammar = GrammarNodes::from_names("AST", "p", &["Expr", "Lit", "Orphan"]);
        let value: serde_yaml::Value = serde_yaml::from_str("Node: [ {Expr: [Lit]}, '%Custom' ]").unwrap();
        let tree = TypeHierarchyTree::from_data(Some(&value), &DataPath::root(), &NoopCollector)
            .process(&grammar, &NoopCollector);
        let beans = node_beans(&tree, "AST");

        let names: Vec<&str> = beans.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["ASTNode", "Expr", "Lit", "Custom", "Orphan"]);

        let expr = &beans[1];
        assert_eq!(expr.class.qualified_name, "p.ASTExpr");
        assert_eq!(expr.class.package, "p");
        assert_eq!(expr.super_node.as_ref().unwrap().name, "ASTNode");
        assert_eq!(expr.sub_nodes[0].class.simple_name, "ASTLit");
        assert!(beans[0].is_root);
        assert!(beans[0].external);
        assert!(beans[3].external);
        assert!(!beans[4].external);
    }

    #[test]
    fn test_node_constants_follow_declaration_order() {
        let grammar = GrammarNodes::from_names("AST", "p", &["Expr", "Lit", "Expr", "a.B"]);
        let tree = TypeHierarchyTree::from_data(None, &DataPath::root(), &NoopCollector)
            .process(&grammar, &NoopCollector);
        let options = GrammarOptions {
            parser_name: "Calc".into(),
            parser_package: "p".into(),
            node_package: "p.ast".into(),
            ..GrammarOptions::default()
        };
        let bean = grammar_bean("Calc", &options, &tree, &grammar);

        let constants: Vec<(&str, usize)> = bean
            .node_constants
            .iter()
            .map(|c| (c.constant.as_str(), c.value))
            .collect();
        assert_eq!(constants, vec![("JJTEXPR", 0), ("JJTLIT", 1), ("JJTA_B", 2)]);
        assert_eq!(bean.tree_state.qualified_name, "p.ast.JJTCalcState");
        assert_eq!(bean.parser.qualified_name, "p.Calc");
    }

    #[test]
    fn test_bean_serialization_is_camel_case() {
        let bean = ClassBean::new("a.b.C");
        let json = serde_json::to_value(&bean).unwrap();
        assert_eq!(json["qualifiedName"], "a.b.C");
        assert_eq!(json["simpleName"], "C");
    }
}
