//! Per-scope node variables.

use crate::grammar::{Expansion, NodeDescriptor, Production};

/// The construct that opened a node scope.
#[derive(Debug, Clone, Copy)]
pub enum ScopeOwner<'g> {
    Production(&'g Production),
    /// An expansion unit annotated with `#Name`.
    Unit {
        expansion: &'g Expansion,
        node: &'g NodeDescriptor,
    },
}

impl<'g> ScopeOwner<'g> {
    pub fn descriptor(&self) -> Option<&'g NodeDescriptor> {
        match self {
            ScopeOwner::Production(p) => p.descriptor.as_ref(),
            ScopeOwner::Unit { node, .. } => Some(node),
        }
    }

    /// Raw name of the opened node, `None` for void constructs.
    pub fn node_name(&self, default_void: bool) -> Option<&'g str> {
        match self {
            ScopeOwner::Production(p) => p.node_name(default_void),
            ScopeOwner::Unit { node, .. } if node.is_void() => None,
            ScopeOwner::Unit { node, .. } => Some(&node.name),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, ScopeOwner::Production(_))
    }
}

/// One open node scope. Lives on the weaving stack between push and pop.
#[derive(Debug, Clone)]
pub struct NodeVar<'g> {
    pub owner: ScopeOwner<'g>,
    pub var_name: String,
    pub closed_var: String,
    pub exception_var: String,
    pub node_name: String,
    pub node_qname: String,
    /// Declared type of the node variable.
    pub node_ref_type: String,
    pub depth: usize,
}

/// `jjtn`/`jjtc`/`jjte` followed by the zero-padded depth.
pub fn jjtree_var_names(depth: usize) -> (String, String, String) {
    let num = format!("{:03}", depth);
    let num = &num[num.len() - 3..];
    (
        format!("jjtn{}", num),
        format!("jjtc{}", num),
        format!("jjte{}", num),
    )
}

/// Names derived from the node name: `expr`, `exprNeedsClose`, `exprException`
/// at depth 0, `expr1`... below.
pub fn descriptive_var_names(node_name: &str, depth: usize) -> (String, String, String) {
    let simple = node_name.rsplit('.').next().unwrap_or(node_name);
    let mut chars = simple.chars();
    let mut base: String = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::from("node"),
    };
    if depth > 0 {
        base.push_str(&depth.to_string());
    }
    (
        base.clone(),
        format!("{}NeedsClose", base),
        format!("{}Exception", base),
    )
}
