//! Builder strategies
//!
//! A builder renders every node-specific fragment the weaving pass emits:
//! node construction, scope calls, hooks, token tracking. Fragments that are
//! disabled by the grammar options come back as `None` and are omitted.

use super::compat::CompatOptions;
use super::node_var::{descriptive_var_names, jjtree_var_names, NodeVar, ScopeOwner};
use crate::grammar::options::qualify;
use crate::grammar::GrammarOptions;
use once_cell::sync::Lazy;
use regex::Regex;

static JJT_THIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bjjtThis\b").expect("jjtThis regex is valid"));

pub trait BuilderStrategy {
    /// Allocates the variable of a scope opened at `depth`, or `None` if the
    /// owner is void.
    fn make_node_var<'g>(&self, owner: ScopeOwner<'g>, depth: usize) -> Option<NodeVar<'g>>;

    fn parser_implements(&self) -> Vec<String>;
    fn parser_imports(&self) -> Vec<String>;
    fn parser_declarations(&self) -> String;

    fn create_node(&self, var: &NodeVar) -> String;
    fn open_node_hook(&self, var: &NodeVar) -> Option<String>;
    fn close_node_hook(&self, var: &NodeVar) -> Option<String>;
    fn open_node_scope(&self, var: &NodeVar) -> String;
    fn close_node_scope(&self, var: &NodeVar) -> String;
    fn clear_node_scope(&self, var: &NodeVar) -> String;
    fn pop_node(&self, var: &NodeVar) -> String;
    fn set_first_token(&self, var: &NodeVar) -> Option<String>;
    fn set_last_token(&self, var: &NodeVar) -> Option<String>;

    /// Replaces `jjtThis` in a Java fragment with the node variable.
    fn escape_jjt_this(&self, var: &NodeVar, expression: &str) -> String;
}

/// Renders the same code JJTree would.
#[derive(Debug, Clone)]
pub struct VanillaJjtreeBuilder {
    options: GrammarOptions,
    compat: CompatOptions,
}

impl VanillaJjtreeBuilder {
    pub fn new(options: GrammarOptions, compat: CompatOptions) -> Self {
        Self { options, compat }
    }

    fn node_id(var: &NodeVar) -> String {
        node_constant(&var.node_name)
    }

    fn parser_state_name(&self) -> String {
        format!("JJT{}State", self.options.parser_name)
    }

    fn condition_text(&self, var: &NodeVar, text: &str) -> String {
        if self.compat.fix_jjt_this_condition_scope {
            self.escape_jjt_this(var, text)
        } else {
            text.to_string()
        }
    }
}

impl BuilderStrategy for VanillaJjtreeBuilder {
    fn make_node_var<'g>(&self, owner: ScopeOwner<'g>, depth: usize) -> Option<NodeVar<'g>> {
        let node_name = owner.node_name(self.options.node_default_void)?;

        let (var_name, closed_var, exception_var) = if self.compat.descriptive_variable_names {
            descriptive_var_names(node_name, depth)
        } else {
            jjtree_var_names(depth)
        };

        let node_ref_type = if !self.options.node_class.is_empty() && !self.options.multi {
            self.options.node_class.clone()
        } else {
            self.options.node_simple_name(node_name)
        };

        Some(NodeVar {
            owner,
            var_name,
            closed_var,
            exception_var,
            node_name: node_name.to_string(),
            node_qname: self.options.node_qualified_name(node_name),
            node_ref_type,
            depth,
        })
    }

    fn parser_implements(&self) -> Vec<String> {
        if self.compat.implement_node_constants {
            vec![format!("{}TreeConstants", self.options.parser_name)]
        } else {
            Vec::new()
        }
    }

    fn parser_imports(&self) -> Vec<String> {
        let mut imports = Vec::new();
        if !self.options.node_package.is_empty()
            && self.options.node_package != self.options.parser_package
        {
            imports.push(format!("{}.*", self.options.node_package));
        }
        if !self.compat.implement_node_constants {
            imports.push(format!(
                "static {}TreeConstants.*",
                self.options.parser_qualified_name()
            ));
        }
        imports.sort();
        imports
    }

    fn parser_declarations(&self) -> String {
        let state = self.parser_state_name();
        format!("protected {} jjtree = new {}();", state, state)
    }

    fn create_node(&self, var: &NodeVar) -> String {
        let nc = &var.node_ref_type;
        let args = if self.options.node_uses_parser {
            format!("(this, {})", Self::node_id(var))
        } else {
            format!("({})", Self::node_id(var))
        };

        match self.options.node_factory.as_str() {
            "" => format!("new {}{}", nc, args),
            "*" => format!("({}) {}.jjtCreate{}", nc, nc, args),
            factory => format!("({}) {}.jjtCreate{}", nc, factory, args),
        }
    }

    fn open_node_hook(&self, var: &NodeVar) -> Option<String> {
        self.options
            .node_scope_hook
            .then(|| format!("jjtOpenNodeScope({});", var.var_name))
    }

    fn close_node_hook(&self, var: &NodeVar) -> Option<String> {
        self.options.node_scope_hook.then(|| {
            format!(
                "if (jjtree.nodeCreated()) jjtCloseNodeScope({});",
                var.var_name
            )
        })
    }

    fn open_node_scope(&self, var: &NodeVar) -> String {
        format!("jjtree.openNodeScope({});", var.var_name)
    }

    fn close_node_scope(&self, var: &NodeVar) -> String {
        let n = &var.var_name;
        match var.owner.descriptor().and_then(|d| d.condition.as_ref()) {
            None => format!("jjtree.closeNodeScope({}, true);", n),
            Some(cond) if cond.is_gt => format!(
                "jjtree.closeNodeScope({}, jjtree.nodeArity() > {});",
                n,
                self.condition_text(var, &cond.text)
            ),
            Some(cond) => format!(
                "jjtree.closeNodeScope({}, {});",
                n,
                self.condition_text(var, &cond.text)
            ),
        }
    }

    fn clear_node_scope(&self, var: &NodeVar) -> String {
        format!("jjtree.clearNodeScope({});", var.var_name)
    }

    fn pop_node(&self, _var: &NodeVar) -> String {
        "jjtree.popNode();".to_string()
    }

    fn set_first_token(&self, var: &NodeVar) -> Option<String> {
        self.options
            .track_tokens
            .then(|| format!("{}.jjtSetFirstToken(getToken(1));", var.var_name))
    }

    fn set_last_token(&self, var: &NodeVar) -> Option<String> {
        self.options
            .track_tokens
            .then(|| format!("{}.jjtSetLastToken(getToken(0));", var.var_name))
    }

    fn escape_jjt_this(&self, var: &NodeVar, expression: &str) -> String {
        JJT_THIS
            .replace_all(expression, var.var_name.as_str())
            .into_owned()
    }
}

/// Fully qualified name of the tree state class JJTree generates next to
/// the nodes.
/// Name of the `<Parser>TreeConstants` field holding the id of a node.
pub fn node_constant(node_name: &str) -> String {
    format!("JJT{}", node_name.to_uppercase().replace('.', "_"))
}

pub fn parser_state_qname(options: &GrammarOptions) -> String {
    qualify(
        &options.node_package,
        &format!("JJT{}State", options.parser_name),
    )
}
