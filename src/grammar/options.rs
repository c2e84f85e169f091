//! Resolved JJTree options of a grammar.

use super::{GrammarFile, OptionValue};
use once_cell::sync::Lazy;
use regex::Regex;

static PACKAGE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").expect("package regex is valid")
});

/// Options consumed only by JJTree. They are removed from the woven grammar
/// since the grammar compiler would reject them.
const JJTREE_OPTIONS: &[&str] = &[
    "MULTI",
    "NODE_DEFAULT_VOID",
    "NODE_CLASS",
    "NODE_FACTORY",
    "NODE_PACKAGE",
    "NODE_EXTENDS",
    "NODE_PREFIX",
    "NODE_SCOPE_HOOK",
    "NODE_USES_PARSER",
    "BUILD_NODE_FILES",
    "TRACK_TOKENS",
    "VISITOR",
    "VISITOR_DATA_TYPE",
    "VISITOR_RETURN_TYPE",
    "VISITOR_EXCEPTION",
    "VISITOR_METHOD_NAME_INCLUDES_TYPE_NAME",
    "JJTREE_OUTPUT_DIRECTORY",
];

pub fn is_jjtree_option(key: &str) -> bool {
    JJTREE_OPTIONS.iter().any(|o| o.eq_ignore_ascii_case(key))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarOptions {
    pub parser_name: String,
    pub parser_package: String,
    pub node_prefix: String,
    pub node_package: String,
    /// `NODE_CLASS`: shared node type when not in multi mode.
    pub node_class: String,
    /// `NODE_FACTORY`: empty, `*`, or a factory class name.
    pub node_factory: String,
    pub multi: bool,
    pub node_default_void: bool,
    pub node_uses_parser: bool,
    pub node_scope_hook: bool,
    pub track_tokens: bool,
}

impl Default for GrammarOptions {
    fn default() -> Self {
        Self {
            parser_name: "Parser".into(),
            parser_package: String::new(),
            node_prefix: "AST".into(),
            node_package: String::new(),
            node_class: String::new(),
            node_factory: String::new(),
            multi: false,
            node_default_void: false,
            node_uses_parser: false,
            node_scope_hook: false,
            track_tokens: false,
        }
    }
}

impl GrammarOptions {
    /// Reads the options block and parser declaration of a grammar.
    pub fn from_grammar(grammar: &GrammarFile) -> Self {
        let mut options = GrammarOptions::default();
        let mut explicit_node_package = None;

        if let Some(parser) = grammar.parser_decl() {
            options.parser_name = parser.name.clone();
            if let Some(caps) = PACKAGE_DECL.captures(&parser.body) {
                options.parser_package = caps[1].to_string();
            }
        }

        for entry in grammar.options() {
            let key = entry.key.to_ascii_uppercase();
            match (key.as_str(), &entry.value) {
                ("MULTI", OptionValue::Bool(b)) => options.multi = *b,
                ("NODE_DEFAULT_VOID", OptionValue::Bool(b)) => options.node_default_void = *b,
                ("NODE_USES_PARSER", OptionValue::Bool(b)) => options.node_uses_parser = *b,
                ("NODE_SCOPE_HOOK", OptionValue::Bool(b)) => options.node_scope_hook = *b,
                ("TRACK_TOKENS", OptionValue::Bool(b)) => options.track_tokens = *b,
                ("NODE_PREFIX", OptionValue::Str(s)) => options.node_prefix = s.clone(),
                ("NODE_CLASS", OptionValue::Str(s)) => options.node_class = s.clone(),
                ("NODE_FACTORY", OptionValue::Str(s)) => options.node_factory = s.clone(),
                // JJTree also accepts a boolean here, meaning "use the node's own factory"
                ("NODE_FACTORY", OptionValue::Bool(true)) => options.node_factory = "*".into(),
                ("NODE_PACKAGE", OptionValue::Str(s)) => explicit_node_package = Some(s.clone()),
                _ => {}
            }
        }

        options.node_package =
            explicit_node_package.unwrap_or_else(|| options.parser_package.clone());
        options
    }

    /// Applies configuration overrides, which take precedence over the grammar.
    pub fn with_overrides(mut self, prefix: Option<&str>, package: Option<&str>) -> Self {
        if let Some(prefix) = prefix {
            self.node_prefix = prefix.to_string();
        }
        if let Some(package) = package {
            self.node_package = package.to_string();
        }
        self
    }

    pub fn node_simple_name(&self, raw_name: &str) -> String {
        format!("{}{}", self.node_prefix, raw_name)
    }

    pub fn node_qualified_name(&self, raw_name: &str) -> String {
        qualify(&self.node_package, &self.node_simple_name(raw_name))
    }

    pub fn parser_qualified_name(&self) -> String {
        qualify(&self.parser_package, &self.parser_name)
    }
}

/// Joins a package and a simple name; the empty package is the default one.
pub fn qualify(package: &str, simple_name: &str) -> String {
    if package.is_empty() {
        simple_name.to_string()
    } else {
        format!("{}.{}", package, simple_name)
    }
}

/// Splits a qualified name into its package and simple name.
pub fn split_qualified(qname: &str) -> (&str, &str) {
    match qname.rfind('.') {
        Some(dot) => (&qname[..dot], &qname[dot + 1..]),
        None => ("", qname),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarItem, OptionEntry, ParserDecl};

    fn grammar(options: Vec<OptionEntry>, body: &str) -> GrammarFile {
        GrammarFile {
            name: "g.jjt".into(),
            items: vec![
                GrammarItem::Options(options),
                GrammarItem::Parser(ParserDecl {
                    name: "Calc".into(),
                    body: body.into(),
                }),
            ],
        }
    }

    #[test]
    fn test_defaults_follow_parser_package() {
        let g = grammar(vec![], "package com.g;\npublic class Calc {}\n");
        let opts = GrammarOptions::from_grammar(&g);
        assert_eq!(opts.parser_package, "com.g");
        assert_eq!(opts.node_package, "com.g");
        assert_eq!(opts.node_prefix, "AST");
        assert_eq!(opts.node_qualified_name("Foo"), "com.g.ASTFoo");
        assert_eq!(opts.parser_qualified_name(), "com.g.Calc");
    }

    #[test]
    fn test_explicit_options_and_overrides() {
        let g = grammar(
            vec![
                OptionEntry {
                    key: "node_prefix".into(),
                    value: OptionValue::Str("".into()),
                },
                OptionEntry {
                    key: "NODE_PACKAGE".into(),
                    value: OptionValue::Str("com.g.ast".into()),
                },
                OptionEntry {
                    key: "TRACK_TOKENS".into(),
                    value: OptionValue::Bool(true),
                },
            ],
            "public class Calc {}",
        );
        let opts = GrammarOptions::from_grammar(&g);
        assert_eq!(opts.node_qualified_name("Foo"), "com.g.ast.Foo");
        assert!(opts.track_tokens);

        let overridden = opts.with_overrides(Some("My"), None);
        assert_eq!(overridden.node_qualified_name("Foo"), "com.g.ast.MyFoo");
    }

    #[test]
    fn test_qualify_and_split() {
        assert_eq!(qualify("", "ASTFoo"), "ASTFoo");
        assert_eq!(split_qualified("com.g.ASTFoo"), ("com.g", "ASTFoo"));
        assert_eq!(split_qualified("ASTFoo"), ("", "ASTFoo"));
        assert!(is_jjtree_option("node_prefix"));
        assert!(!is_jjtree_option("LOOKAHEAD"));
    }
}
