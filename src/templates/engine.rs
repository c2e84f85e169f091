//! A minimal placeholder template language.
//!
//! - `{{path.to.value}}` inserts a value of the context
//! - `{{#each path}} ... {{/each}}` repeats its body for every element of a
//!   list; inside, `this` is the element and unqualified names are looked up
//!   in the element first
//! - `{{#if path}} ... {{/if}}` and `{{#unless path}} ... {{/unless}}`
//!   render their body depending on the truthiness of a value
//!
//! Missing values are errors, not empty strings.

use serde_json::Value;
use thiserror::Error;

/// Renders templates against a JSON context.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String, TemplateError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed tag at offset {0}")]
    UnclosedTag(usize),
    #[error("block '{0}' is never closed")]
    UnclosedBlock(String),
    #[error("unexpected closing tag '{0}' at offset {1}")]
    UnexpectedClose(String, usize),
    #[error("unknown block kind '{0}'")]
    UnknownBlock(String),
    #[error("no value for '{0}'")]
    UnknownVariable(String),
    #[error("'{0}' is not a list")]
    NotAList(String),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderEngine;

impl TemplateEngine for PlaceholderEngine {
    fn render(&self, template: &str, context: &Value) -> Result<String, TemplateError> {
        let nodes = parse(template)?;
        let mut out = String::with_capacity(template.len());
        render_nodes(&nodes, &mut vec![context], &mut out)?;
        Ok(out)
    }
}

// ============================================================================
// PARSING
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(String),
    Block {
        kind: BlockKind,
        path: String,
        body: Vec<Node>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Each,
    If,
    Unless,
}

impl BlockKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "each" => Some(BlockKind::Each),
            "if" => Some(BlockKind::If),
            "unless" => Some(BlockKind::Unless),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            BlockKind::Each => "each",
            BlockKind::If => "if",
            BlockKind::Unless => "unless",
        }
    }
}

struct OpenBlock {
    kind: BlockKind,
    path: String,
    body: Vec<Node>,
}

fn parse(template: &str) -> Result<Vec<Node>, TemplateError> {
    let mut stack: Vec<OpenBlock> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            current.push(Node::Text(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or(TemplateError::UnclosedTag(offset + start))?;
        let tag = after[..end].trim();

        if let Some(open) = tag.strip_prefix('#') {
            let (kind, path) = open.split_once(char::is_whitespace).unwrap_or((open, ""));
            let kind =
                BlockKind::from_name(kind).ok_or_else(|| TemplateError::UnknownBlock(kind.to_string()))?;
            stack.push(OpenBlock {
                kind,
                path: path.trim().to_string(),
                body: std::mem::take(&mut current),
            });
        } else if let Some(close) = tag.strip_prefix('/') {
            let close = close.trim();
            match stack.pop() {
                Some(open) if open.kind.name() == close => {
                    let body = std::mem::replace(&mut current, open.body);
                    current.push(Node::Block {
                        kind: open.kind,
                        path: open.path,
                        body,
                    });
                }
                _ => return Err(TemplateError::UnexpectedClose(close.to_string(), offset + start)),
            }
        } else {
            current.push(Node::Var(tag.to_string()));
        }

        let consumed = start + 2 + end + 2;
        rest = &rest[consumed..];
        offset += consumed;
    }
    if !rest.is_empty() {
        current.push(Node::Text(rest.to_string()));
    }

    match stack.pop() {
        Some(open) => Err(TemplateError::UnclosedBlock(open.kind.name().to_string())),
        None => Ok(current),
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn render_nodes<'v>(
    nodes: &[Node],
    scopes: &mut Vec<&'v Value>,
    out: &mut String,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => out.push_str(&display(lookup(scopes, path)?)),
            Node::Block { kind, path, body } => {
                let value = lookup(scopes, path)?;
                match kind {
                    BlockKind::Each => {
                        let Value::Array(items) = value else {
                            return Err(TemplateError::NotAList(path.clone()));
                        };
                        for item in items {
                            scopes.push(item);
                            let result = render_nodes(body, scopes, out);
                            scopes.pop();
                            result?;
                        }
                    }
                    BlockKind::If if truthy(value) => render_nodes(body, scopes, out)?,
                    BlockKind::Unless if !truthy(value) => render_nodes(body, scopes, out)?,
                    BlockKind::If | BlockKind::Unless => {}
                }
            }
        }
    }
    Ok(())
}

/// Resolves a dotted path, innermost scope first.
fn lookup<'v>(scopes: &[&'v Value], path: &str) -> Result<&'v Value, TemplateError> {
    let unknown = || TemplateError::UnknownVariable(path.to_string());
    let mut segments = path.split('.');
    let first = segments.next().ok_or_else(unknown)?;

    let start = if first == "this" {
        scopes.last().copied()
    } else {
        scopes.iter().rev().find_map(|&scope| scope.get(first))
    };
    let mut value = start.ok_or_else(unknown)?;
    for segment in segments {
        value = match value {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            other => other.get(segment),
        }
        .ok_or_else(unknown)?;
    }
    Ok(value)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(_) => true,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(template: &str, context: Value) -> Result<String, TemplateError> {
        PlaceholderEngine.render(template, &context)
    }

    #[test]
    fn test_variables() {
        let out = render(
            "package {{grammar.package}};\nclass {{ name }} {}",
            json!({"grammar": {"package": "a.b"}, "name": "X"}),
        )
        .unwrap();
        assert_eq!(out, "package a.b;\nclass X {}");
    }

    #[test]
    fn test_each_and_conditionals() {
        let context = json!({
            "prefix": "AST",
            "nodes": [
                {"name": "A", "external": false},
                {"name": "B", "external": true}
            ]
        });
        let out = render(
            "{{#each nodes}}{{prefix}}{{name}}{{#if external}}!{{/if}}{{#unless external}}.{{/unless}} {{/each}}",
            context,
        )
        .unwrap();
        assert_eq!(out, "ASTA. ASTB! ");
    }

    #[test]
    fn test_this_and_indices() {
        let out = render(
            "{{#each xs}}[{{this}}]{{/each}} {{xs.1}}",
            json!({"xs": ["a", "b"]}),
        )
        .unwrap();
        assert_eq!(out, "[a][b] b");
    }

    #[test]
    fn test_errors() {
        assert_eq!(render("{{x}}", json!({})), Err(TemplateError::UnknownVariable("x".into())));
        assert_eq!(render("a {{x", json!({})), Err(TemplateError::UnclosedTag(2)));
        assert_eq!(
            render("{{#each xs}}", json!({"xs": []})),
            Err(TemplateError::UnclosedBlock("each".into()))
        );
        assert!(matches!(
            render("{{#if x}}{{/each}}", json!({"x": true})),
            Err(TemplateError::UnexpectedClose(..))
        ));
        assert_eq!(
            render("{{#each x}}{{/each}}", json!({"x": 1})),
            Err(TemplateError::NotAList("x".into()))
        );
    }
}
