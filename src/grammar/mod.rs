//! The grammar model.
//!
//! A read-only tree describing a JJTree grammar file: its option block, the
//! parser compilation unit, verbatim items (token declarations and the like)
//! and the productions with their expansion trees. The weaving pass and the
//! hierarchy resolver only ever read this model; [`parser`] is one way to
//! produce it.

use std::collections::HashSet;
use std::fmt;

pub mod options;
pub mod parser;

pub use options::GrammarOptions;
pub use parser::parse_grammar;

// ============================================================================
// FILE STRUCTURE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GrammarFile {
    /// Display name of the file, used in positions.
    pub name: String,
    pub items: Vec<GrammarItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GrammarItem {
    Options(Vec<OptionEntry>),
    Parser(ParserDecl),
    /// Token declarations, token manager declarations: copied unchanged.
    Verbatim(String),
    Production(Production),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionEntry {
    pub key: String,
    pub value: OptionValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    /// The unquoted string value.
    Str(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParserDecl {
    pub name: String,
    /// The compilation unit between `PARSER_BEGIN(..)` and `PARSER_END(..)`.
    pub body: String,
}

// ============================================================================
// PRODUCTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    pub name: String,
    /// Access modifier, result type, name and parameter list, as written.
    pub header: String,
    pub throws: Vec<String>,
    pub descriptor: Option<NodeDescriptor>,
    pub kind: ProductionKind,
    /// Byte offset of the production in the grammar file.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProductionKind {
    Bnf {
        /// Contents of the declaration block, without the braces.
        declarations: String,
        expansion: Expansion,
    },
    Javacode {
        body: String,
    },
}

impl Production {
    pub fn is_javacode(&self) -> bool {
        matches!(self.kind, ProductionKind::Javacode { .. })
    }

    /// Name of the node this production opens, if any.
    pub fn node_name(&self, default_void: bool) -> Option<&str> {
        match &self.descriptor {
            Some(d) if d.is_void() => None,
            Some(d) => Some(&d.name),
            None if default_void => None,
            None => Some(&self.name),
        }
    }

    pub fn expansion(&self) -> Option<&Expansion> {
        match &self.kind {
            ProductionKind::Bnf { expansion, .. } => Some(expansion),
            ProductionKind::Javacode { .. } => None,
        }
    }
}

/// A `#Name` or `#Name(cond)` annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescriptor {
    pub name: String,
    pub condition: Option<NodeCondition>,
}

impl NodeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: None,
        }
    }

    pub fn is_void(&self) -> bool {
        self.name == "void"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeCondition {
    /// Expression text; for `#N(>k)` this is `k`.
    pub text: String,
    /// True for the `#N(>k)` arity form.
    pub is_gt: bool,
}

// ============================================================================
// EXPANSIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Occurrence {
    pub fn symbol(self) -> &'static str {
        match self {
            Occurrence::ZeroOrOne => "?",
            Occurrence::ZeroOrMore => "*",
            Occurrence::OneOrMore => "+",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub parameter: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
    Sequence(Vec<Expansion>),
    Choice(Vec<Expansion>),
    /// A full `LOOKAHEAD(..)` marker.
    Lookahead(String),
    /// Parser action; the text between the braces.
    Action(String),
    NonTerminal {
        lhs: Option<String>,
        name: String,
        args: String,
    },
    /// `"literal"` or `<TOKEN>` reference.
    Terminal {
        lhs: Option<String>,
        text: String,
    },
    Paren {
        inner: Box<Expansion>,
        occurrence: Option<Occurrence>,
    },
    /// `[ ... ]`
    Optional(Box<Expansion>),
    Scoped {
        inner: Box<Expansion>,
        node: NodeDescriptor,
    },
    TryCatch {
        inner: Box<Expansion>,
        catches: Vec<CatchClause>,
        finally: Option<String>,
    },
}

impl Expansion {
    /// Calls `f` on this expansion and every descendant, in pre-order.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Expansion)) {
        f(self);
        match self {
            Expansion::Sequence(units) | Expansion::Choice(units) => {
                for unit in units {
                    unit.walk(f);
                }
            }
            Expansion::Paren { inner, .. }
            | Expansion::Optional(inner)
            | Expansion::Scoped { inner, .. }
            | Expansion::TryCatch { inner, .. } => inner.walk(f),
            Expansion::Lookahead(_)
            | Expansion::Action(_)
            | Expansion::NonTerminal { .. }
            | Expansion::Terminal { .. } => {}
        }
    }
}

// ============================================================================
// QUERIES
// ============================================================================

impl GrammarFile {
    pub fn productions(&self) -> impl Iterator<Item = &Production> {
        self.items.iter().filter_map(|item| match item {
            GrammarItem::Production(p) => Some(p),
            _ => None,
        })
    }

    pub fn production(&self, name: &str) -> Option<&Production> {
        self.productions().find(|p| p.name == name)
    }

    pub fn parser_decl(&self) -> Option<&ParserDecl> {
        self.items.iter().find_map(|item| match item {
            GrammarItem::Parser(p) => Some(p),
            _ => None,
        })
    }

    pub fn options(&self) -> impl Iterator<Item = &OptionEntry> {
        self.items
            .iter()
            .filter_map(|item| match item {
                GrammarItem::Options(entries) => Some(entries.iter()),
                _ => None,
            })
            .flatten()
    }

    /// Every construct that opens a node, in declaration order: non-void
    /// productions and the `#Name` units inside them.
    pub fn node_owners(&self, default_void: bool) -> Vec<NodeOwner<'_>> {
        let mut owners = Vec::new();
        for production in self.productions() {
            if let Some(name) = production.node_name(default_void) {
                owners.push(NodeOwner { name, production });
            }
            if let Some(expansion) = production.expansion() {
                expansion.walk(&mut |e| {
                    if let Expansion::Scoped { node, .. } = e {
                        if !node.is_void() {
                            owners.push(NodeOwner {
                                name: &node.name,
                                production,
                            });
                        }
                    }
                });
            }
        }
        owners
    }

    /// Declared node names, in declaration order, without duplicates.
    pub fn node_names(&self, default_void: bool) -> Vec<String> {
        let mut seen = HashSet::new();
        self.node_owners(default_void)
            .into_iter()
            .filter(|owner| seen.insert(owner.name))
            .map(|owner| owner.name.to_string())
            .collect()
    }
}

/// A node-opening construct: the raw node name and the production it
/// appears in.
#[derive(Debug, Clone, Copy)]
pub struct NodeOwner<'g> {
    pub name: &'g str,
    pub production: &'g Production,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production(name: &str, descriptor: Option<NodeDescriptor>, expansion: Expansion) -> Production {
        Production {
            name: name.into(),
            header: format!("void {}()", name),
            throws: vec![],
            descriptor,
            kind: ProductionKind::Bnf {
                declarations: String::new(),
                expansion,
            },
            offset: 0,
        }
    }

    #[test]
    fn test_node_names_in_declaration_order() {
        let scoped = Expansion::Scoped {
            inner: Box::new(Expansion::Terminal {
                lhs: None,
                text: "<ID>".into(),
            }),
            node: NodeDescriptor::new("Name"),
        };
        let grammar = GrammarFile {
            name: "g.jjt".into(),
            items: vec![
                GrammarItem::Production(production("Expr", None, Expansion::Sequence(vec![scoped]))),
                GrammarItem::Production(production(
                    "Helper",
                    Some(NodeDescriptor::new("void")),
                    Expansion::Sequence(vec![]),
                )),
                GrammarItem::Production(production(
                    "Other",
                    Some(NodeDescriptor::new("Name")),
                    Expansion::Sequence(vec![]),
                )),
            ],
        };
        assert_eq!(grammar.node_names(false), vec!["Expr", "Name"]);
        assert_eq!(grammar.node_names(true), vec!["Name"]);
    }

    #[test]
    fn test_production_node_name() {
        let p = production("Foo", None, Expansion::Sequence(vec![]));
        assert_eq!(p.node_name(false), Some("Foo"));
        assert_eq!(p.node_name(true), None);
    }
}
