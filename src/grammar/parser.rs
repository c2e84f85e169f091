//! JJTree grammar reader
//!
//! Converts grammar text into the [`GrammarFile`] model. Java fragments
//! (declaration blocks, actions, parameter lists) are captured verbatim; only
//! the expansion structure and the node annotations are interpreted.

use super::{
    CatchClause, Expansion, GrammarFile, GrammarItem, NodeCondition, NodeDescriptor, Occurrence,
    OptionEntry, OptionValue, ParserDecl, Production, ProductionKind,
};
use crate::errors::{to_source_span, ErrorReporting, JjtxError, PhaseContext, SourceContext};
use pest::{error::Error, iterators::Pair, Parser};
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grammar/grammar.pest"]
struct JjtreeParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses a JJTree grammar.
pub fn parse_grammar(source_text: &str, source: SourceContext) -> Result<GrammarFile, JjtxError> {
    let ctx = PhaseContext::new(source, "parse");
    let mut pairs =
        JjtreeParser::parse(Rule::file, source_text).map_err(|e| convert_parse_error(e, &ctx))?;

    let file = pairs
        .next()
        .ok_or_else(|| ctx.missing_element("grammar file", to_source_span(0, 0)))?;

    let mut items = Vec::new();
    for pair in file.into_inner() {
        match pair.as_rule() {
            Rule::options_decl => items.push(GrammarItem::Options(build_options(pair, &ctx)?)),
            Rule::parser_decl => items.push(GrammarItem::Parser(build_parser_decl(pair, &ctx)?)),
            Rule::token_manager_decls | Rule::regexpr_production => {
                items.push(GrammarItem::Verbatim(pair.as_str().to_string()))
            }
            Rule::bnf_production | Rule::javacode_production => {
                items.push(GrammarItem::Production(build_production(pair, &ctx)?))
            }
            Rule::EOI => {}
            rule => return Err(unexpected(rule, &pair, &ctx)),
        }
    }

    Ok(GrammarFile {
        name: ctx.source.name.clone(),
        items,
    })
}

// ============================================================================
// FILE STRUCTURE
// ============================================================================

fn build_options(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Vec<OptionEntry>, JjtxError> {
    pair.into_inner()
        .map(|entry| {
            let span = span_of(&entry);
            let mut inner = entry.into_inner();
            let key = next_pair(&mut inner, "option name", span, ctx)?.as_str().to_string();
            let value_pair = next_pair(&mut inner, "option value", span, ctx)?;
            let text = value_pair.as_str();
            let value = match value_pair.as_rule() {
                Rule::bool_value => OptionValue::Bool(text == "true"),
                Rule::int_value => OptionValue::Int(text.parse().map_err(|_| {
                    ctx.syntax_error(&format!("invalid integer '{}'", text), span)
                })?),
                _ => OptionValue::Str(unquote(text)),
            };
            Ok(OptionEntry { key, value })
        })
        .collect()
}

fn build_parser_decl(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<ParserDecl, JjtxError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let begin = next_pair(&mut inner, "parser name", span, ctx)?;
    let body = next_pair(&mut inner, "parser body", span, ctx)?;
    let end = next_pair(&mut inner, "parser name", span, ctx)?;

    if begin.as_str() != end.as_str() {
        return Err(ctx
            .syntax_error(
                &format!(
                    "PARSER_END({}) does not match PARSER_BEGIN({})",
                    end.as_str(),
                    begin.as_str()
                ),
                span_of(&end),
            )
            .with_help(format!("rename it PARSER_END({})", begin.as_str())));
    }

    Ok(ParserDecl {
        name: begin.as_str().to_string(),
        body: body.as_str().trim_end().to_string(),
    })
}

// ============================================================================
// PRODUCTIONS
// ============================================================================

fn build_production(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Production, JjtxError> {
    let span = span_of(&pair);
    let offset = pair.as_span().start();
    let is_javacode = pair.as_rule() == Rule::javacode_production;
    let mut inner = pair.into_inner().peekable();

    let header_pair = next_pair(&mut inner, "production header", span, ctx)?;
    let (header, name, throws) = build_header(header_pair, ctx)?;

    let descriptor = match inner.peek() {
        Some(p) if p.as_rule() == Rule::node_descriptor => {
            let p = next_pair(&mut inner, "node descriptor", span, ctx)?;
            Some(build_descriptor(p, ctx)?)
        }
        _ => None,
    };

    let block = next_pair(&mut inner, "java block", span, ctx)?;
    let block = block_text(block);

    let kind = if is_javacode {
        ProductionKind::Javacode { body: block }
    } else {
        let choices = next_pair(&mut inner, "expansion", span, ctx)?;
        ProductionKind::Bnf {
            declarations: block,
            expansion: build_choices(choices, ctx)?,
        }
    };

    Ok(Production {
        name,
        header,
        throws,
        descriptor,
        kind,
        offset,
    })
}

fn build_header(
    pair: Pair<Rule>,
    ctx: &PhaseContext,
) -> Result<(String, String, Vec<String>), JjtxError> {
    let span = span_of(&pair);
    let mut header = String::new();
    let mut name = None;
    let mut throws = Vec::new();

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::access_modifier | Rule::result_type => {
                header.push_str(part.as_str());
                header.push(' ');
            }
            Rule::identifier => {
                name = Some(part.as_str().to_string());
                header.push_str(part.as_str());
            }
            Rule::paren_content => {
                header.push('(');
                header.push_str(part.as_str().trim());
                header.push(')');
            }
            Rule::throws_clause => {
                throws = part.into_inner().map(|t| t.as_str().to_string()).collect();
            }
            rule => return Err(unexpected(rule, &part, ctx)),
        }
    }

    let name = name.ok_or_else(|| ctx.missing_element("production name", span))?;
    Ok((header, name, throws))
}

fn build_descriptor(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<NodeDescriptor, JjtxError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let name = next_pair(&mut inner, "node name", span, ctx)?.as_str().to_string();

    let condition = match inner.next() {
        None => None,
        Some(cond) => {
            let body = cond
                .into_inner()
                .next()
                .ok_or_else(|| ctx.missing_element("node condition", span))?;
            match body.as_rule() {
                Rule::gt_condition => Some(NodeCondition {
                    text: body
                        .into_inner()
                        .next()
                        .map(|arity| arity.as_str().trim().to_string())
                        .unwrap_or_default(),
                    is_gt: true,
                }),
                _ => Some(NodeCondition {
                    text: body.as_str().trim().to_string(),
                    is_gt: false,
                }),
            }
        }
    };

    Ok(NodeDescriptor { name, condition })
}

// ============================================================================
// EXPANSIONS
// ============================================================================

fn build_choices(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expansion, JjtxError> {
    let mut alternatives = pair
        .into_inner()
        .map(|seq| build_sequence(seq, ctx))
        .collect::<Result<Vec<_>, _>>()?;

    if alternatives.len() == 1 {
        Ok(alternatives.remove(0))
    } else {
        Ok(Expansion::Choice(alternatives))
    }
}

fn build_sequence(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expansion, JjtxError> {
    let mut units = pair
        .into_inner()
        .map(|unit| build_scoped_unit(unit, ctx))
        .collect::<Result<Vec<_>, _>>()?;

    if units.len() == 1 {
        Ok(units.remove(0))
    } else {
        Ok(Expansion::Sequence(units))
    }
}

fn build_scoped_unit(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expansion, JjtxError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let unit = build_unit(next_pair(&mut inner, "expansion unit", span, ctx)?, ctx)?;

    match inner.next() {
        Some(descriptor) => Ok(Expansion::Scoped {
            inner: Box::new(unit),
            node: build_descriptor(descriptor, ctx)?,
        }),
        None => Ok(unit),
    }
}

fn build_unit(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expansion, JjtxError> {
    let span = span_of(&pair);

    match pair.as_rule() {
        Rule::local_lookahead => Ok(Expansion::Lookahead(pair.as_str().to_string())),

        Rule::action => {
            let block = next_pair(&mut pair.into_inner(), "action block", span, ctx)?;
            Ok(Expansion::Action(block_text(block)))
        }

        Rule::paren_unit => {
            let mut inner = pair.into_inner();
            let choices = build_choices(next_pair(&mut inner, "expansion", span, ctx)?, ctx)?;
            let occurrence = match inner.next().map(|o| o.as_str()) {
                Some("?") => Some(Occurrence::ZeroOrOne),
                Some("*") => Some(Occurrence::ZeroOrMore),
                Some("+") => Some(Occurrence::OneOrMore),
                _ => None,
            };
            Ok(Expansion::Paren {
                inner: Box::new(choices),
                occurrence,
            })
        }

        Rule::optional_unit => {
            let choices = next_pair(&mut pair.into_inner(), "expansion", span, ctx)?;
            Ok(Expansion::Optional(Box::new(build_choices(choices, ctx)?)))
        }

        Rule::try_unit => build_try(pair, ctx),

        Rule::assigned_unit => {
            let mut lhs = None;
            let mut result = None;
            for part in pair.into_inner() {
                match part.as_rule() {
                    Rule::lhs => lhs = Some(part.as_str().to_string()),
                    Rule::terminal => {
                        result = Some(Expansion::Terminal {
                            lhs: lhs.take(),
                            text: part.as_str().to_string(),
                        })
                    }
                    Rule::nonterminal => {
                        let mut inner = part.into_inner();
                        let name = next_pair(&mut inner, "production name", span, ctx)?;
                        let args = next_pair(&mut inner, "arguments", span, ctx)?;
                        result = Some(Expansion::NonTerminal {
                            lhs: lhs.take(),
                            name: name.as_str().to_string(),
                            args: args.as_str().trim().to_string(),
                        })
                    }
                    rule => return Err(unexpected(rule, &part, ctx)),
                }
            }
            result.ok_or_else(|| ctx.missing_element("terminal or nonterminal", span))
        }

        rule => Err(unexpected(rule, &pair, ctx)),
    }
}

fn build_try(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<Expansion, JjtxError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let body = build_choices(next_pair(&mut inner, "try body", span, ctx)?, ctx)?;

    let mut catches = Vec::new();
    let mut finally = None;
    for clause in inner {
        match clause.as_rule() {
            Rule::catch_clause => {
                let clause_span = span_of(&clause);
                let mut parts = clause.into_inner();
                let parameter = next_pair(&mut parts, "catch parameter", clause_span, ctx)?;
                let block = next_pair(&mut parts, "catch block", clause_span, ctx)?;
                catches.push(CatchClause {
                    parameter: parameter.as_str().trim().to_string(),
                    body: block_text(block),
                });
            }
            Rule::finally_clause => {
                let clause_span = span_of(&clause);
                let block = next_pair(&mut clause.into_inner(), "finally block", clause_span, ctx)?;
                finally = Some(block_text(block));
            }
            rule => return Err(unexpected(rule, &clause, ctx)),
        }
    }

    Ok(Expansion::TryCatch {
        inner: Box::new(body),
        catches,
        finally,
    })
}

// ============================================================================
// UTILITIES
// ============================================================================

fn span_of(pair: &Pair<Rule>) -> miette::SourceSpan {
    to_source_span(pair.as_span().start(), pair.as_span().end())
}

fn next_pair<'i>(
    pairs: &mut impl Iterator<Item = Pair<'i, Rule>>,
    element: &str,
    span: miette::SourceSpan,
    ctx: &PhaseContext,
) -> Result<Pair<'i, Rule>, JjtxError> {
    pairs.next().ok_or_else(|| ctx.missing_element(element, span))
}

/// Text between the braces of a `java_block` pair.
fn block_text(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|content| content.as_str().to_string())
        .unwrap_or_default()
}

fn unquote(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

fn unexpected(rule: Rule, pair: &Pair<Rule>, ctx: &PhaseContext) -> JjtxError {
    ctx.unsupported(&format!("construct {:?}", rule), span_of(pair))
}

fn convert_parse_error(error: Error<Rule>, ctx: &PhaseContext) -> JjtxError {
    let span = match error.location {
        pest::error::InputLocation::Pos(pos) => to_source_span(pos, pos),
        pest::error::InputLocation::Span((start, end)) => to_source_span(start, end),
    };

    let message = match &error.variant {
        pest::error::ErrorVariant::ParsingError { positives, .. } => {
            if positives.contains(&Rule::parser_decl) {
                "expected PARSER_BEGIN(...) declaration".to_string()
            } else if positives.contains(&Rule::node_name) {
                "expected a node name after '#'".to_string()
            } else if positives.is_empty() {
                "unexpected input".to_string()
            } else {
                let expected: Vec<String> = positives.iter().map(|r| format!("{:?}", r)).collect();
                format!("expected one of {}", expected.join(", "))
            }
        }
        pest::error::ErrorVariant::CustomError { message } => message.clone(),
    };

    ctx.syntax_error(&message, span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> GrammarFile {
        parse_grammar(text, SourceContext::from_file("test.jjt", text)).unwrap()
    }

    const HEADER: &str = "PARSER_BEGIN(Calc)\npackage com.g;\npublic class Calc {}\nPARSER_END(Calc)\n";

    #[test]
    fn test_parse_options_and_parser() {
        let g = parse(&format!(
            "options {{ MULTI = true; NODE_PREFIX = \"Node\"; LOOKAHEAD = 2; }}\n{}",
            HEADER
        ));
        let opts: Vec<_> = g.options().collect();
        assert_eq!(opts.len(), 3);
        assert_eq!(opts[0].value, OptionValue::Bool(true));
        assert_eq!(opts[1].value, OptionValue::Str("Node".into()));
        assert_eq!(opts[2].value, OptionValue::Int(2));
        let parser = g.parser_decl().unwrap();
        assert_eq!(parser.name, "Calc");
        assert!(parser.body.contains("package com.g;"));
    }

    #[test]
    fn test_parse_bnf_production_with_descriptor() {
        let g = parse(&format!(
            "{}void Expr() throws FooException #Expression(>1) : {{ int i; }} {{ Term() ( \"+\" Term() )* }}",
            HEADER
        ));
        let p = g.production("Expr").unwrap();
        assert_eq!(p.header, "void Expr()");
        assert_eq!(p.throws, vec!["FooException"]);
        let d = p.descriptor.as_ref().unwrap();
        assert_eq!(d.name, "Expression");
        let cond = d.condition.as_ref().unwrap();
        assert!(cond.is_gt);
        assert_eq!(cond.text, "1");
        match &p.kind {
            ProductionKind::Bnf {
                declarations,
                expansion: Expansion::Sequence(units),
            } => {
                assert_eq!(declarations.trim(), "int i;");
                assert_eq!(units.len(), 2);
                assert!(matches!(&units[1], Expansion::Paren { occurrence: Some(Occurrence::ZeroOrMore), .. }));
            }
            other => panic!("unexpected production kind {:?}", other),
        }
    }

    #[test]
    fn test_parse_scoped_units_and_actions() {
        let g = parse(&format!(
            "{}void A() : {{}} {{ ( {{ a(); }} X() {{ b(); }} ) #N [ t=<ID> #Leaf ] }}",
            HEADER
        ));
        let expansion = g.production("A").unwrap().expansion().unwrap();
        let Expansion::Sequence(units) = expansion else {
            panic!("expected a sequence, got {:?}", expansion);
        };
        match &units[0] {
            Expansion::Scoped { node, inner } => {
                assert_eq!(node.name, "N");
                assert!(matches!(**inner, Expansion::Paren { occurrence: None, .. }));
            }
            other => panic!("expected a scoped unit, got {:?}", other),
        }
        assert_eq!(g.node_names(false), vec!["A", "N", "Leaf"]);
    }

    #[test]
    fn test_parse_javacode_and_tokens() {
        let g = parse(&format!(
            "{}TOKEN : {{ <ID: ([\"a\"-\"z\"])+> }}\nJAVACODE void skip() #Skipped {{ getNextToken(); }}",
            HEADER
        ));
        assert!(g
            .items
            .iter()
            .any(|i| matches!(i, GrammarItem::Verbatim(t) if t.starts_with("TOKEN"))));
        let p = g.production("skip").unwrap();
        assert!(p.is_javacode());
        assert_eq!(p.descriptor.as_ref().unwrap().name, "Skipped");
    }

    #[test]
    fn test_braces_in_strings_do_not_close_blocks() {
        let g = parse(&format!(
            "{}void A() : {{ String s = \"}}\"; }} {{ {{ s = \"{{\"; }} }}",
            HEADER
        ));
        let p = g.production("A").unwrap();
        assert!(matches!(p.expansion(), Some(Expansion::Action(a)) if a.contains("\"{\"")));
    }

    #[test]
    fn test_mismatched_parser_end_is_an_error() {
        let text = "PARSER_BEGIN(A) class A {} PARSER_END(B)";
        let err = parse_grammar(text, SourceContext::from_file("bad.jjt", text)).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_syntax_error_has_span() {
        let text = format!("{}void A() : {{}} {{ ( X() }}", HEADER);
        let err = parse_grammar(&text, SourceContext::from_file("bad.jjt", text.clone())).unwrap_err();
        assert_eq!(err.diagnostic_info.error_code, "jjtx::parse::syntax");
    }
}
