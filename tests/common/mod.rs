//! Shared fixtures for the jjtx integration tests.

#![allow(dead_code)]

use jjtx::grammar::{parse_grammar, GrammarFile, GrammarOptions};
use jjtx::weave::{weave, CompatOptions};
use jjtx::SourceContext;

/// Parser declaration prepended to grammar snippets.
pub const HEADER: &str = "PARSER_BEGIN(Calc)\npackage com.calc;\n\npublic class Calc {}\nPARSER_END(Calc)\n\n";

/// A small but complete grammar.
pub const CALC: &str = r#"options {
  STATIC = false;
  NODE_DEFAULT_VOID = false;
}

PARSER_BEGIN(Calc)
package com.calc;

public class Calc {}
PARSER_END(Calc)

SKIP : { " " | "\t" | "\n" }
TOKEN : { <NUM: (["0"-"9"])+> | <PLUS: "+"> | <TIMES: "*"> }

void Start() #void : {} { Sum() <EOF> }

void Sum() : {} { Product() ( <PLUS> Product() #Add(2) )* }

void Product() #void : {} { Atom() ( <TIMES> Atom() #Mul(2) )* }

void Atom() : { Token t; } { t = <NUM> { jjtThis.setImage(t.image); } }
"#;

pub fn parse(text: &str) -> GrammarFile {
    parse_grammar(text, SourceContext::from_file("Calc.jjt", text)).unwrap()
}

/// Parses `HEADER` followed by `productions`.
pub fn parse_snippet(productions: &str) -> GrammarFile {
    parse(&format!("{}{}", HEADER, productions))
}

pub fn weave_text(text: &str, compat: &CompatOptions) -> String {
    let grammar = parse(text);
    let options = GrammarOptions::from_grammar(&grammar);
    weave(&grammar, &options, compat)
}

pub fn weave_snippet(productions: &str) -> String {
    weave_text(&format!("{}{}", HEADER, productions), &CompatOptions::default())
}

/// Writes `files` (relative path, content) under `dir`.
pub fn write_files(dir: &std::path::Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let path = dir.join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}
